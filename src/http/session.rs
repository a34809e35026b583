//! `/session/*` routes (spec.md §6).

use axum::extract::State;
use serde::Deserialize;

use crate::db::entities::Session;
use crate::services::session as session_service;
use crate::state::AppState;

use super::envelope::{AppJson, Envelope, HttpResult};

#[derive(Debug, Deserialize)]
pub struct OpenRequest {
    pub sender_id: String,
    pub receiver_id: String,
    pub receiver_display_name: String,
    #[serde(default)]
    pub avatar: String,
}

pub async fn open(State(state): State<AppState>, AppJson(req): AppJson<OpenRequest>) -> HttpResult<Session> {
    let session = session_service::open(
        &state.services,
        &req.sender_id,
        &req.receiver_id,
        &req.receiver_display_name,
        &req.avatar,
    )
    .await?;
    Ok(Envelope::success(session))
}

#[derive(Debug, Deserialize)]
pub struct CheckAllowedRequest {
    pub src: String,
    pub dst: String,
}

pub async fn check_allowed(State(state): State<AppState>, AppJson(req): AppJson<CheckAllowedRequest>) -> HttpResult<bool> {
    let allowed = session_service::check_open_allowed(&state.services, &req.src, &req.dst).await?;
    Ok(Envelope::success(allowed))
}

#[derive(Debug, Deserialize)]
pub struct UidRequest {
    pub uid: String,
}

pub async fn user_list(State(state): State<AppState>, AppJson(req): AppJson<UidRequest>) -> HttpResult<Vec<Session>> {
    let sessions = session_service::list_direct(&state.services, &req.uid).await?;
    Ok(Envelope::success(sessions))
}

pub async fn group_list(State(state): State<AppState>, AppJson(req): AppJson<UidRequest>) -> HttpResult<Vec<Session>> {
    let sessions = session_service::list_group(&state.services, &req.uid).await?;
    Ok(Envelope::success(sessions))
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub uid: String,
    pub peer: String,
}

pub async fn delete(State(state): State<AppState>, AppJson(req): AppJson<DeleteRequest>) -> HttpResult<()> {
    session_service::delete(&state.services, &req.uid, &req.peer).await?;
    Ok(Envelope::success(()))
}

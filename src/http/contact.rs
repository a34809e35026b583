//! `/contact/*` routes (spec.md §6).

use axum::extract::State;
use serde::Deserialize;

use crate::db::entities::{ContactApply, UserContact};
use crate::services::contact as contact_service;
use crate::state::AppState;

use super::envelope::{AppJson, Envelope, HttpResult};

#[derive(Debug, Deserialize)]
pub struct UidRequest {
    pub uid: String,
}

pub async fn list(State(state): State<AppState>, AppJson(req): AppJson<UidRequest>) -> HttpResult<Vec<UserContact>> {
    let contacts = contact_service::list(&state.services, &req.uid).await?;
    Ok(Envelope::success(contacts))
}

#[derive(Debug, Deserialize)]
pub struct IdRequest {
    pub id: String,
}

pub async fn info(State(state): State<AppState>, AppJson(req): AppJson<IdRequest>) -> HttpResult<serde_json::Value> {
    let info = contact_service::get_contact_info(&state.services, &req.id).await?;
    Ok(Envelope::success(info))
}

#[derive(Debug, Deserialize)]
pub struct UidCidRequest {
    pub uid: String,
    pub cid: String,
}

pub async fn delete(State(state): State<AppState>, AppJson(req): AppJson<UidCidRequest>) -> HttpResult<()> {
    contact_service::delete(&state.services, &req.uid, &req.cid).await?;
    Ok(Envelope::success(()))
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub uid: String,
    pub cid: String,
    pub message: Option<String>,
}

pub async fn apply(State(state): State<AppState>, AppJson(req): AppJson<ApplyRequest>) -> HttpResult<ContactApply> {
    let apply = contact_service::apply(&state.services, &req.uid, &req.cid, req.message.as_deref()).await?;
    Ok(Envelope::success(apply))
}

pub async fn new_list(State(state): State<AppState>, AppJson(req): AppJson<UidRequest>) -> HttpResult<Vec<ContactApply>> {
    let applies = contact_service::pending_incoming(&state.services, &req.uid).await?;
    Ok(Envelope::success(applies))
}

#[derive(Debug, Deserialize)]
pub struct GidRequest {
    pub gid: String,
}

pub async fn add_group_list(
    State(state): State<AppState>,
    AppJson(req): AppJson<GidRequest>,
) -> HttpResult<Vec<ContactApply>> {
    let applies = contact_service::pending_group(&state.services, &req.gid).await?;
    Ok(Envelope::success(applies))
}

#[derive(Debug, Deserialize)]
pub struct OwnerApplicantRequest {
    pub owner_id: String,
    pub applicant_id: String,
}

pub async fn pass_apply(State(state): State<AppState>, AppJson(req): AppJson<OwnerApplicantRequest>) -> HttpResult<()> {
    contact_service::pass(&state.services, &req.owner_id, &req.applicant_id).await?;
    Ok(Envelope::success(()))
}

pub async fn refuse_apply(State(state): State<AppState>, AppJson(req): AppJson<OwnerApplicantRequest>) -> HttpResult<()> {
    contact_service::refuse(&state.services, &req.owner_id, &req.applicant_id).await?;
    Ok(Envelope::success(()))
}

pub async fn black_apply(State(state): State<AppState>, AppJson(req): AppJson<OwnerApplicantRequest>) -> HttpResult<()> {
    contact_service::black_apply(&state.services, &req.owner_id, &req.applicant_id).await?;
    Ok(Envelope::success(()))
}

pub async fn black(State(state): State<AppState>, AppJson(req): AppJson<UidCidRequest>) -> HttpResult<()> {
    contact_service::black_contact(&state.services, &req.uid, &req.cid).await?;
    Ok(Envelope::success(()))
}

pub async fn cancel_black(State(state): State<AppState>, AppJson(req): AppJson<UidCidRequest>) -> HttpResult<()> {
    contact_service::unblack_contact(&state.services, &req.uid, &req.cid).await?;
    Ok(Envelope::success(()))
}

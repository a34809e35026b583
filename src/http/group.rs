//! `/group/*` routes (spec.md §6).

use axum::extract::State;
use serde::Deserialize;

use crate::db::entities::{AddMode, Group, GroupMember, GroupStatus};
use crate::services::contact as contact_service;
use crate::services::group as group_service;
use crate::state::AppState;

use super::envelope::{AppJson, Envelope, HttpResult};

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub name: String,
    pub notice: Option<String>,
    pub owner_user_id: String,
    #[serde(default = "default_add_mode")]
    pub add_mode: AddMode,
    #[serde(default)]
    pub avatar: String,
}

fn default_add_mode() -> AddMode {
    AddMode::Direct
}

pub async fn create(State(state): State<AppState>, AppJson(req): AppJson<CreateRequest>) -> HttpResult<Group> {
    let group = group_service::create(
        &state.services,
        &req.name,
        req.notice.as_deref(),
        &req.owner_user_id,
        req.add_mode,
        &req.avatar,
    )
    .await?;
    Ok(Envelope::success(group))
}

#[derive(Debug, Deserialize)]
pub struct UidRequest {
    pub uid: String,
}

pub async fn load_my(State(state): State<AppState>, AppJson(req): AppJson<UidRequest>) -> HttpResult<Vec<Group>> {
    let groups = group_service::load_owned(&state.services, &req.uid).await?;
    Ok(Envelope::success(groups))
}

pub async fn load_joined(State(state): State<AppState>, AppJson(req): AppJson<UidRequest>) -> HttpResult<Vec<String>> {
    let ids = contact_service::joined_groups(&state.services, &req.uid).await?;
    Ok(Envelope::success(ids))
}

#[derive(Debug, Deserialize)]
pub struct GidRequest {
    pub gid: String,
}

pub async fn check_add_mode(State(state): State<AppState>, AppJson(req): AppJson<GidRequest>) -> HttpResult<AddMode> {
    let mode = group_service::check_add_mode(&state.services, &req.gid).await?;
    Ok(Envelope::success(mode))
}

#[derive(Debug, Deserialize)]
pub struct GidUidRequest {
    pub gid: String,
    pub uid: String,
}

pub async fn enter(State(state): State<AppState>, AppJson(req): AppJson<GidUidRequest>) -> HttpResult<()> {
    group_service::enter_directly(&state.services, &req.gid, &req.uid).await?;
    Ok(Envelope::success(()))
}

pub async fn leave(State(state): State<AppState>, AppJson(req): AppJson<GidUidRequest>) -> HttpResult<()> {
    group_service::leave(&state.services, &req.uid, &req.gid).await?;
    Ok(Envelope::success(()))
}

pub async fn dismiss(State(state): State<AppState>, AppJson(req): AppJson<GidUidRequest>) -> HttpResult<()> {
    group_service::dismiss(&state.services, &req.uid, &req.gid).await?;
    Ok(Envelope::success(()))
}

pub async fn info(State(state): State<AppState>, AppJson(req): AppJson<GidRequest>) -> HttpResult<Group> {
    let group = group_service::info(&state.services, &req.gid).await?;
    Ok(Envelope::success(group))
}

pub async fn info_list(State(state): State<AppState>) -> HttpResult<Vec<Group>> {
    let groups = group_service::info_list(&state.services).await?;
    Ok(Envelope::success(groups))
}

#[derive(Debug, Deserialize)]
pub struct GidsRequest {
    pub gids: Vec<String>,
}

pub async fn delete(State(state): State<AppState>, AppJson(req): AppJson<GidsRequest>) -> HttpResult<()> {
    group_service::delete_bulk(&state.services, &req.gids).await?;
    Ok(Envelope::success(()))
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub gids: Vec<String>,
    pub status: GroupStatus,
}

pub async fn set_status(State(state): State<AppState>, AppJson(req): AppJson<SetStatusRequest>) -> HttpResult<()> {
    group_service::set_status(&state.services, &req.gids, req.status).await?;
    Ok(Envelope::success(()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub gid: String,
    pub name: Option<String>,
    pub notice: Option<String>,
    pub avatar: Option<String>,
    pub add_mode: Option<AddMode>,
}

pub async fn update(State(state): State<AppState>, AppJson(req): AppJson<UpdateRequest>) -> HttpResult<()> {
    group_service::update(
        &state.services,
        &req.gid,
        req.name.as_deref(),
        req.notice.as_deref(),
        req.avatar.as_deref(),
        req.add_mode,
    )
    .await?;
    Ok(Envelope::success(()))
}

pub async fn members(State(state): State<AppState>, AppJson(req): AppJson<GidRequest>) -> HttpResult<Vec<GroupMember>> {
    let members = group_service::member_list(&state.services, &req.gid).await?;
    Ok(Envelope::success(members))
}

#[derive(Debug, Deserialize)]
pub struct RemoveMembersRequest {
    pub gid: String,
    pub uids: Vec<String>,
}

pub async fn remove_members(State(state): State<AppState>, AppJson(req): AppJson<RemoveMembersRequest>) -> HttpResult<()> {
    group_service::remove_members(&state.services, &req.gid, &req.uids).await?;
    Ok(Envelope::success(()))
}

//! `/user/*` routes (spec.md §6).

use axum::extract::State;
use serde::Deserialize;

use crate::db::entities::UserStatus;
use crate::services::user as user_service;
use crate::state::AppState;

use super::envelope::{AppJson, Envelope, HttpResult};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub telephone: String,
    pub password: String,
    pub nickname: String,
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> HttpResult<serde_json::Value> {
    let (user, revived) =
        user_service::register(&state.services, &req.telephone, &req.password, &req.nickname).await?;
    let message = if revived { "恢复历史账号".to_string() } else { "注册成功".to_string() };
    Ok(Envelope { code: 200, message, data: Some(serde_json::to_value(user).unwrap_or_default()) })
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub telephone: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> HttpResult<crate::db::entities::User> {
    let user = user_service::login(&state.services, &req.telephone, &req.password).await?;
    Ok(Envelope::success(user))
}

#[derive(Debug, Deserialize)]
pub struct UidsRequest {
    pub uids: Vec<String>,
}

pub async fn delete(State(state): State<AppState>, AppJson(req): AppJson<UidsRequest>) -> HttpResult<()> {
    user_service::delete(&state.services, &req.uids).await?;
    Ok(Envelope::success(()))
}

#[derive(Debug, Deserialize)]
pub struct GetRequest {
    pub uid: String,
}

pub async fn get(
    State(state): State<AppState>,
    AppJson(req): AppJson<GetRequest>,
) -> HttpResult<crate::db::entities::User> {
    let user = user_service::get(&state.services, &req.uid).await?;
    Ok(Envelope::success(user))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub uid: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub email: Option<String>,
    pub gender: Option<i32>,
    pub birthday: Option<String>,
    pub signature: Option<String>,
}

pub async fn update(State(state): State<AppState>, AppJson(req): AppJson<UpdateRequest>) -> HttpResult<()> {
    user_service::update(
        &state.services,
        &req.uid,
        req.nickname.as_deref(),
        req.avatar.as_deref(),
        req.email.as_deref(),
        req.gender,
        req.birthday.as_deref(),
        req.signature.as_deref(),
    )
    .await?;
    Ok(Envelope::success(()))
}

pub async fn list(
    State(state): State<AppState>,
    AppJson(req): AppJson<GetRequest>,
) -> HttpResult<Vec<crate::db::entities::User>> {
    let users = user_service::list_excluding(&state.services, &req.uid).await?;
    Ok(Envelope::success(users))
}

pub async fn enable(State(state): State<AppState>, AppJson(req): AppJson<UidsRequest>) -> HttpResult<()> {
    user_service::set_status(&state.services, &req.uids, UserStatus::Normal).await?;
    Ok(Envelope::success(()))
}

pub async fn disable(State(state): State<AppState>, AppJson(req): AppJson<UidsRequest>) -> HttpResult<()> {
    user_service::set_status(&state.services, &req.uids, UserStatus::Disabled).await?;
    Ok(Envelope::success(()))
}

#[derive(Debug, Deserialize)]
pub struct SetAdminRequest {
    pub uids: Vec<String>,
    pub flag: bool,
}

pub async fn set_admin(State(state): State<AppState>, AppJson(req): AppJson<SetAdminRequest>) -> HttpResult<()> {
    user_service::set_admin(&state.services, &req.uids, req.flag).await?;
    Ok(Envelope::success(()))
}

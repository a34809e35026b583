//! `/message/*` routes (spec.md §6).

use axum::extract::{Multipart, State};
use serde::Deserialize;

use crate::db::entities::Message;
use crate::error::{AppError, AppResult};
use crate::services::history as history_service;
use crate::state::AppState;

use super::envelope::{AppJson, Envelope, HttpResult};

#[derive(Debug, Deserialize)]
pub struct DirectRequest {
    pub u1: String,
    pub u2: String,
}

pub async fn list(State(state): State<AppState>, AppJson(req): AppJson<DirectRequest>) -> HttpResult<Vec<Message>> {
    let messages = history_service::direct(&state.services, &req.u1, &req.u2).await?;
    Ok(Envelope::success(messages))
}

#[derive(Debug, Deserialize)]
pub struct GidRequest {
    pub gid: String,
}

pub async fn group_list(State(state): State<AppState>, AppJson(req): AppJson<GidRequest>) -> HttpResult<Vec<Message>> {
    let messages = history_service::group(&state.services, &req.gid).await?;
    Ok(Envelope::success(messages))
}

/// Pulls the first `file` field and its extension out of a multipart upload
/// (spec.md §6 `uploadAvatar`/`uploadFile`).
async fn extract_file(multipart: &mut Multipart) -> AppResult<(Vec<u8>, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::invalid(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let extension = field
            .file_name()
            .and_then(|name| name.rsplit('.').next())
            .unwrap_or("bin")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::invalid(format!("failed to read uploaded file: {e}")))?;
        return Ok((bytes.to_vec(), extension));
    }
    Err(AppError::invalid("missing file field"))
}

pub async fn upload_avatar(State(state): State<AppState>, mut multipart: Multipart) -> HttpResult<String> {
    let (bytes, extension) = extract_file(&mut multipart).await?;
    let url = history_service::upload_avatar(&state.config.static_src.avatar_path, &bytes, &extension).await?;
    Ok(Envelope::success(url))
}

pub async fn upload_file(State(state): State<AppState>, mut multipart: Multipart) -> HttpResult<String> {
    let (bytes, extension) = extract_file(&mut multipart).await?;
    let url = history_service::upload_file(&state.config.static_src.file_path, &bytes, &extension).await?;
    Ok(Envelope::success(url))
}

//! History service (spec.md §4.G).

use std::path::Path;

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::cache::keys;
use crate::db::entities::Message;
use crate::error::{AppError, AppResult};
use crate::ids::{Kind, new_id};

use super::ServiceContext;

/// `direct(u1,u2)` — ordered ascending by created-at (spec.md §8).
pub async fn direct(ctx: &ServiceContext, u1: &str, u2: &str) -> AppResult<Vec<Message>> {
    ctx.db.messages().direct_history(u1, u2).await
}

/// `group(gid)` — cached, ascending (spec.md §4.G).
pub async fn group(ctx: &ServiceContext, gid: &str) -> AppResult<Vec<Message>> {
    let key = keys::group_messagelist(gid);
    if let Some(messages) = ctx.cache.get_json(&key).await {
        return Ok(messages);
    }
    let messages = ctx.db.messages().group_history(gid).await?;
    ctx.cache.set_json(&key, &messages).await;
    Ok(messages)
}

/// `uploadAvatar(req)` — writes bytes under the configured avatar root and
/// returns a host-independent `/static/avatars/...` path, the same shape
/// the pipeline's avatar normalization expects on ingress (spec.md §4.F
/// step 3).
pub async fn upload_avatar(avatar_root: &str, bytes: &[u8], extension: &str) -> AppResult<String> {
    write_static_file(avatar_root, "avatars", bytes, extension).await
}

/// `uploadFile(req)` — writes bytes under the configured file root.
pub async fn upload_file(file_root: &str, bytes: &[u8], extension: &str) -> AppResult<String> {
    write_static_file(file_root, "files", bytes, extension).await
}

async fn write_static_file(root: &str, mount: &str, bytes: &[u8], extension: &str) -> AppResult<String> {
    let filename = format!("{}.{}", new_id(Kind::Message), extension.trim_start_matches('.'));
    let path = Path::new(root).join(&filename);
    fs::create_dir_all(root)
        .await
        .map_err(|e| AppError::system(format!("failed to create static directory: {e}")))?;
    let mut file = fs::File::create(&path)
        .await
        .map_err(|e| AppError::system(format!("failed to create file: {e}")))?;
    file.write_all(bytes)
        .await
        .map_err(|e| AppError::system(format!("failed to write file: {e}")))?;
    Ok(format!("/static/{mount}/{filename}"))
}

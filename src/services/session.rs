//! Session (conversation) service (spec.md §4.G).

use crate::cache::keys;
use crate::db::entities::Session;
use crate::error::{AppError, AppResult};
use crate::ids::{ReceiverKind, classify_receiver};

use super::ServiceContext;

/// `create(req)` — self-to-self is `Invalid` (spec.md §4.G).
pub async fn create(
    ctx: &ServiceContext,
    sender_id: &str,
    receiver_id: &str,
    receiver_display_name: &str,
    avatar: &str,
) -> AppResult<Session> {
    if sender_id == receiver_id {
        return Err(AppError::invalid("不能与自己创建会话"));
    }

    let session = ctx
        .db
        .sessions()
        .insert(sender_id, receiver_id, receiver_display_name, avatar)
        .await?;

    ctx.cache.delete(&keys::session_list(sender_id)).await;
    ctx.cache
        .delete(&keys::session(sender_id, receiver_id))
        .await;
    Ok(session)
}

/// `checkOpenAllowed(src,dst)` — blocked contacts and nonexistent groups may
/// not open a session.
pub async fn check_open_allowed(ctx: &ServiceContext, src: &str, dst: &str) -> AppResult<bool> {
    if src == dst {
        return Ok(false);
    }
    match classify_receiver(dst) {
        Some(ReceiverKind::User) => {
            if let Some(contact) = ctx.db.contacts().find(src, dst).await? {
                return Ok(contact.status != crate::db::entities::ContactStatus::Black);
            }
            Ok(true)
        }
        Some(ReceiverKind::Group) => Ok(ctx.db.groups().find_by_id(dst).await?.is_some()),
        None => Ok(false),
    }
}

/// `open(req)` — falls through to `create` on NotFound (spec.md §4.G).
pub async fn open(
    ctx: &ServiceContext,
    sender_id: &str,
    receiver_id: &str,
    receiver_display_name: &str,
    avatar: &str,
) -> AppResult<Session> {
    if let Some(existing) = ctx.db.sessions().find(sender_id, receiver_id).await? {
        return Ok(existing);
    }
    create(ctx, sender_id, receiver_id, receiver_display_name, avatar).await
}

pub async fn list_direct(ctx: &ServiceContext, uid: &str) -> AppResult<Vec<Session>> {
    let key = keys::session_list(uid);
    if let Some(sessions) = ctx.cache.get_json(&key).await {
        return Ok(sessions);
    }
    let sessions = ctx.db.sessions().list_direct(uid).await?;
    ctx.cache.set_json(&key, &sessions).await;
    Ok(sessions)
}

pub async fn list_group(ctx: &ServiceContext, uid: &str) -> AppResult<Vec<Session>> {
    let key = keys::group_session_list(uid);
    if let Some(sessions) = ctx.cache.get_json(&key).await {
        return Ok(sessions);
    }
    let sessions = ctx.db.sessions().list_group(uid).await?;
    ctx.cache.set_json(&key, &sessions).await;
    Ok(sessions)
}

/// `delete(uid,peer,sid)` — idempotent: a nonexistent session is `Invalid`,
/// never a fatal error (spec.md §8 idempotence).
pub async fn delete(ctx: &ServiceContext, uid: &str, peer: &str) -> AppResult<()> {
    let affected = ctx.db.sessions().soft_delete(uid, peer).await?;
    if affected == 0 {
        return Err(AppError::invalid("会话不存在或无权限"));
    }

    ctx.cache.delete(&keys::session_list(uid)).await;
    ctx.cache.delete(&keys::group_session_list(uid)).await;
    ctx.cache.delete(&keys::session(uid, peer)).await;
    Ok(())
}

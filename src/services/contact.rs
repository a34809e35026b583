//! Contact service (spec.md §4.G).

use crate::cache::keys;
use crate::db::ContactRepository;
use crate::db::entities::{ApplyStatus, ContactApply, ContactStatus, ContactType, User};
use crate::error::{AppError, AppResult};
use crate::ids::{Kind, classify_receiver};

use super::ServiceContext;

pub async fn list(ctx: &ServiceContext, uid: &str) -> AppResult<Vec<crate::db::entities::UserContact>> {
    let key = keys::contact_user_list(uid);
    if let Some(contacts) = ctx.cache.get_json(&key).await {
        return Ok(contacts);
    }
    let contacts = ctx.db.contacts().list(uid).await?;
    ctx.cache.set_json(&key, &contacts).await;
    Ok(contacts)
}

pub async fn joined_groups(ctx: &ServiceContext, uid: &str) -> AppResult<Vec<String>> {
    let key = keys::my_joined_group_list(uid);
    if let Some(ids) = ctx.cache.get_json(&key).await {
        return Ok(ids);
    }
    let ids = ctx.db.group_members().joined_group_ids(uid).await?;
    ctx.cache.set_json(&key, &ids).await;
    Ok(ids)
}

/// `getContactInfo(id)` — a peer view that may resolve to either a user or a
/// group depending on the id's kind prefix (spec.md §3 "Identity prefixing").
pub async fn get_contact_info(ctx: &ServiceContext, id: &str) -> AppResult<serde_json::Value> {
    let key = keys::contact_info(id);
    if let Some(value) = ctx.cache.get_json::<serde_json::Value>(&key).await {
        return Ok(value);
    }

    let value = match classify_receiver(id) {
        Some(crate::ids::ReceiverKind::User) => {
            let user: User = ctx
                .db
                .users()
                .find_by_id(id)
                .await?
                .ok_or_else(|| AppError::invalid("联系人不存在"))?;
            serde_json::to_value(user)?
        }
        Some(crate::ids::ReceiverKind::Group) => {
            let group = ctx
                .db
                .groups()
                .find_by_id(id)
                .await?
                .ok_or_else(|| AppError::invalid("联系人不存在"))?;
            serde_json::to_value(group)?
        }
        None => return Err(AppError::invalid("无效的联系人标识")),
    };
    ctx.cache.set_json(&key, &value).await;
    Ok(value)
}

/// `delete(uid,cid)` — removes the symmetric pair (spec.md §3 invariant 2).
pub async fn delete(ctx: &ServiceContext, uid: &str, cid: &str) -> AppResult<()> {
    let mut tx = ctx.db.pool().begin().await?;
    ContactRepository::soft_delete_pair(&mut tx, uid, cid).await?;
    crate::db::SessionRepository::soft_delete_pair(&mut tx, uid, cid).await?;
    tx.commit().await?;

    invalidate_contact_pair(ctx, uid, cid).await;
    Ok(())
}

/// `apply(uid,cid,msg)` — PENDING reset unless BLACK (spec.md §4.G state
/// machine); applying to a group targets the group's owner implicitly via
/// the group's pending-applications queue.
pub async fn apply(ctx: &ServiceContext, uid: &str, cid: &str, message: Option<&str>) -> AppResult<ContactApply> {
    if uid == cid {
        return Err(AppError::invalid("不能添加自己为联系人"));
    }
    let contact_type = match classify_receiver(cid) {
        Some(crate::ids::ReceiverKind::User) => ContactType::User,
        Some(crate::ids::ReceiverKind::Group) => ContactType::Group,
        None => return Err(AppError::invalid("无效的联系人标识")),
    };
    ctx.db.contact_applies().upsert_pending(uid, cid, contact_type, message).await
}

pub async fn pending_incoming(ctx: &ServiceContext, uid: &str) -> AppResult<Vec<ContactApply>> {
    ctx.db.contact_applies().pending_incoming(uid).await
}

pub async fn pending_group(ctx: &ServiceContext, gid: &str) -> AppResult<Vec<ContactApply>> {
    ctx.db.contact_applies().pending_for_group(gid).await
}

/// `pass(ownerId,applicantId)` — AGREE; materializes the symmetric contact
/// pair (or group membership, when the target is a group).
pub async fn pass(ctx: &ServiceContext, owner_id: &str, applicant_id: &str) -> AppResult<()> {
    let apply = ctx
        .db
        .contact_applies()
        .find_pair(applicant_id, owner_id)
        .await?
        .ok_or_else(|| AppError::invalid("申请不存在"))?;
    if apply.status != ApplyStatus::Pending {
        return Err(AppError::invalid("该申请已处理"));
    }

    super::support::catch_panic(async {
        let mut tx = ctx.db.pool().begin().await?;
        ctx.db
            .contact_applies()
            .set_status(&mut tx, applicant_id, owner_id, ApplyStatus::Agree)
            .await?;

        match apply.contact_type {
            ContactType::User => {
                ContactRepository::upsert(&mut tx, owner_id, applicant_id, ContactType::User, ContactStatus::Normal).await?;
                ContactRepository::upsert(&mut tx, applicant_id, owner_id, ContactType::User, ContactStatus::Normal).await?;
            }
            ContactType::Group => {
                if !crate::db::GroupMemberRepository::exists(&mut tx, owner_id, applicant_id).await? {
                    crate::db::GroupMemberRepository::insert(&mut tx, owner_id, applicant_id).await?;
                    crate::db::GroupRepository::increment_member_count(&mut tx, owner_id, 1).await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    })
    .await?;

    invalidate_contact_pair(ctx, owner_id, applicant_id).await;
    Ok(())
}

pub async fn refuse(ctx: &ServiceContext, owner_id: &str, applicant_id: &str) -> AppResult<()> {
    let mut tx = ctx.db.pool().begin().await?;
    ctx.db
        .contact_applies()
        .set_status(&mut tx, applicant_id, owner_id, ApplyStatus::Refuse)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// `blackContact(uid,cid)` — NORMAL -> BLACK with mirrored BE_BLACK on the
/// peer, and deletes both direction sessions (spec.md §4.G state machine).
pub async fn black_contact(ctx: &ServiceContext, uid: &str, cid: &str) -> AppResult<()> {
    let mut tx = ctx.db.pool().begin().await?;
    ContactRepository::set_status_pair(&mut tx, uid, cid, ContactStatus::Black, ContactStatus::BeBlack).await?;
    crate::db::SessionRepository::soft_delete_pair(&mut tx, uid, cid).await?;
    tx.commit().await?;

    invalidate_contact_pair(ctx, uid, cid).await;
    Ok(())
}

/// `unblackContact(uid,cid)` — BLACK -> NORMAL; does not recreate sessions.
pub async fn unblack_contact(ctx: &ServiceContext, uid: &str, cid: &str) -> AppResult<()> {
    let mut tx = ctx.db.pool().begin().await?;
    ContactRepository::set_status_pair(&mut tx, uid, cid, ContactStatus::Normal, ContactStatus::Normal).await?;
    tx.commit().await?;

    invalidate_contact_pair(ctx, uid, cid).await;
    Ok(())
}

pub async fn black_apply(ctx: &ServiceContext, owner_id: &str, applicant_id: &str) -> AppResult<()> {
    let mut tx = ctx.db.pool().begin().await?;
    ctx.db
        .contact_applies()
        .set_status(&mut tx, applicant_id, owner_id, ApplyStatus::Black)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Invalidates the symmetric pair's own caches, plus — when either side is
/// a group id — the membership caches on both the group and the user side,
/// the way `group.rs`'s `invalidate_membership_change` does. `pass()` calls
/// this with `(owner_id, applicant_id)`, and for a group apply the group id
/// is `owner_id` (first), not always the second argument, so both sides
/// must be checked rather than assuming a fixed position.
async fn invalidate_contact_pair(ctx: &ServiceContext, a: &str, b: &str) {
    ctx.cache.delete(&keys::contact_user_list(a)).await;
    ctx.cache.delete(&keys::contact_user_list(b)).await;
    ctx.cache.delete(&keys::session_list(a)).await;
    ctx.cache.delete(&keys::session_list(b)).await;
    ctx.cache.delete(&keys::session(a, b)).await;
    ctx.cache.delete(&keys::session(b, a)).await;

    let group_and_user = if crate::ids::is_kind(a, Kind::Group) {
        Some((a, b))
    } else if crate::ids::is_kind(b, Kind::Group) {
        Some((b, a))
    } else {
        None
    };
    if let Some((gid, uid)) = group_and_user {
        ctx.cache.delete(&keys::my_joined_group_list(uid)).await;
        ctx.cache.delete(&keys::group_memberlist(gid)).await;
        ctx.cache.delete(&keys::group_info(gid)).await;
    }
}

//! Group service (spec.md §4.G).

use crate::cache::keys;
use crate::db::entities::{AddMode, Group, GroupMember, GroupStatus};
use crate::db::GroupRepository;
use crate::db::GroupMemberRepository;
use crate::error::{AppError, AppResult};

use super::ServiceContext;

pub async fn create(
    ctx: &ServiceContext,
    name: &str,
    notice: Option<&str>,
    owner_user_id: &str,
    add_mode: AddMode,
    avatar: &str,
) -> AppResult<Group> {
    let group = ctx
        .db
        .groups()
        .insert(name, notice, owner_user_id, add_mode, avatar)
        .await?;

    let mut tx = ctx.db.pool().begin().await?;
    GroupMemberRepository::insert(&mut tx, &group.uuid, owner_user_id).await?;
    tx.commit().await?;

    ctx.cache.delete(&keys::contact_mygroup_list(owner_user_id)).await;
    ctx.cache.delete(&keys::my_joined_group_list(owner_user_id)).await;
    Ok(group)
}

/// `loadOwned(uid)` — groups a user owns.
pub async fn load_owned(ctx: &ServiceContext, uid: &str) -> AppResult<Vec<Group>> {
    let key = keys::contact_mygroup_list(uid);
    if let Some(groups) = ctx.cache.get_json::<Vec<Group>>(&key).await {
        return Ok(groups);
    }
    let ids = ctx.db.users().owned_group_ids(uid).await?;
    let mut groups = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(group) = ctx.db.groups().find_by_id(&id).await? {
            groups.push(group);
        }
    }
    ctx.cache.set_json(&key, &groups).await;
    Ok(groups)
}

/// `info(gid)` — read-through.
pub async fn info(ctx: &ServiceContext, gid: &str) -> AppResult<Group> {
    let key = keys::group_info(gid);
    if let Some(group) = ctx.cache.get_json::<Group>(&key).await {
        return Ok(group);
    }
    let group = ctx
        .db
        .groups()
        .find_by_id(gid)
        .await?
        .ok_or_else(|| AppError::invalid("群组不存在"))?;
    ctx.cache.set_json(&key, &group).await;
    Ok(group)
}

/// `infoList()` — admin surface, uncached per spec.md §4.G.
pub async fn info_list(ctx: &ServiceContext) -> AppResult<Vec<Group>> {
    ctx.db.groups().list_all().await
}

/// `leave(uid,gid)` — owner cannot leave (spec.md §4.G).
pub async fn leave(ctx: &ServiceContext, uid: &str, gid: &str) -> AppResult<()> {
    let group = ctx
        .db
        .groups()
        .find_by_id(gid)
        .await?
        .ok_or_else(|| AppError::invalid("群组不存在"))?;
    if group.owner_user_id == uid {
        return Err(AppError::invalid("群主不能退出群聊"));
    }

    let mut tx = ctx.db.pool().begin().await?;
    if !GroupMemberRepository::exists(&mut tx, gid, uid).await? {
        return Err(AppError::invalid("你不是该群成员"));
    }
    GroupMemberRepository::remove(&mut tx, gid, uid).await?;
    GroupRepository::increment_member_count(&mut tx, gid, -1).await?;
    tx.commit().await?;

    invalidate_membership_change(ctx, gid, &[uid.to_string()]).await;
    Ok(())
}

/// `dismiss(ownerId,gid)` — owner only; cascades member/session/contact/apply
/// rows for the group (spec.md §8 scenario 5).
pub async fn dismiss(ctx: &ServiceContext, owner_id: &str, gid: &str) -> AppResult<()> {
    let group = ctx
        .db
        .groups()
        .find_by_id(gid)
        .await?
        .ok_or_else(|| AppError::invalid("群组不存在"))?;
    if group.owner_user_id != owner_id {
        return Err(AppError::invalid("只有群主可以解散群聊"));
    }
    dismiss_internal(ctx, gid).await
}

/// Shared cascade used by `dismiss` and by `user::delete` when a deleted
/// user owned groups.
pub(super) async fn dismiss_internal(ctx: &ServiceContext, gid: &str) -> AppResult<()> {
    let member_ids = ctx.db.group_members().member_ids(gid).await?;

    super::support::catch_panic(async {
        let mut tx = ctx.db.pool().begin().await?;
        GroupRepository::find_for_update(&mut tx, gid)
            .await?
            .ok_or_else(|| AppError::invalid("群组不存在"))?;
        GroupRepository::soft_delete(&mut tx, gid).await?;
        GroupMemberRepository::remove_all(&mut tx, gid).await?;
        crate::db::SessionRepository::soft_delete_by_receiver(&mut tx, gid).await?;
        crate::db::ContactRepository::soft_delete_by_group(&mut tx, gid).await?;
        ctx.db.contact_applies().soft_delete_by_group(&mut tx, gid).await?;
        crate::db::MessageRepository::delete_by_group(&mut tx, gid).await?;
        tx.commit().await?;
        Ok(())
    })
    .await?;

    ctx.cache.delete(&keys::group_info(gid)).await;
    ctx.cache.delete(&keys::contact_info(gid)).await;
    ctx.cache.delete(&keys::group_memberlist(gid)).await;
    ctx.cache.delete(&keys::group_messagelist(gid)).await;
    ctx.cache.delete_by_pattern(&format!("session_*_{gid}")).await;
    for uid in &member_ids {
        ctx.cache.delete(&keys::contact_mygroup_list(uid)).await;
        ctx.cache.delete(&keys::my_joined_group_list(uid)).await;
        ctx.cache.delete(&keys::group_session_list(uid)).await;
    }
    Ok(())
}

/// `deleteBulk(gids[])` — admin hard-removal via the same cascade.
pub async fn delete_bulk(ctx: &ServiceContext, gids: &[String]) -> AppResult<()> {
    for gid in gids {
        dismiss_internal(ctx, gid).await?;
    }
    Ok(())
}

pub async fn check_add_mode(ctx: &ServiceContext, gid: &str) -> AppResult<AddMode> {
    let group = info(ctx, gid).await?;
    Ok(group.add_mode)
}

/// `enterDirectly(gid,uid)` — only valid when the group's add-mode is
/// DIRECT (spec.md §4.G); APPROVAL groups route through ContactApply.
pub async fn enter_directly(ctx: &ServiceContext, gid: &str, uid: &str) -> AppResult<()> {
    let group = ctx
        .db
        .groups()
        .find_by_id(gid)
        .await?
        .ok_or_else(|| AppError::invalid("群组不存在"))?;
    if group.add_mode != AddMode::Direct {
        return Err(AppError::invalid("该群需要审核后才能加入"));
    }

    let mut tx = ctx.db.pool().begin().await?;
    if GroupMemberRepository::exists(&mut tx, gid, uid).await? {
        return Err(AppError::invalid("你已经是该群成员"));
    }
    GroupMemberRepository::insert(&mut tx, gid, uid).await?;
    GroupRepository::increment_member_count(&mut tx, gid, 1).await?;
    tx.commit().await?;

    invalidate_membership_change(ctx, gid, &[uid.to_string()]).await;
    Ok(())
}

pub async fn set_status(ctx: &ServiceContext, gids: &[String], status: GroupStatus) -> AppResult<()> {
    ctx.db.groups().set_status(gids, status).await?;
    for gid in gids {
        ctx.cache.delete(&keys::group_info(gid)).await;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn update(
    ctx: &ServiceContext,
    gid: &str,
    name: Option<&str>,
    notice: Option<&str>,
    avatar: Option<&str>,
    add_mode: Option<AddMode>,
) -> AppResult<()> {
    ctx.db.groups().update_profile(gid, name, notice, avatar, add_mode).await?;
    ctx.cache.delete(&keys::group_info(gid)).await;
    ctx.cache.delete(&keys::contact_info(gid)).await;

    if let (Some(name), Some(avatar)) = (name, avatar) {
        ctx.db.sessions().refresh_receiver_display(gid, name, avatar).await?;
        let member_ids = ctx.db.group_members().member_ids(gid).await?;
        for uid in member_ids {
            ctx.cache.delete(&keys::group_session_list(&uid)).await;
        }
    }
    Ok(())
}

pub async fn member_list(ctx: &ServiceContext, gid: &str) -> AppResult<Vec<GroupMember>> {
    let key = keys::group_memberlist(gid);
    if let Some(members) = ctx.cache.get_json::<Vec<GroupMember>>(&key).await {
        return Ok(members);
    }
    let members = ctx.db.group_members().list(gid).await?;
    ctx.cache.set_json(&key, &members).await;
    Ok(members)
}

/// `removeMembers(req)` — owner cannot be removed (spec.md §4.G).
pub async fn remove_members(ctx: &ServiceContext, gid: &str, uids: &[String]) -> AppResult<()> {
    let group = ctx
        .db
        .groups()
        .find_by_id(gid)
        .await?
        .ok_or_else(|| AppError::invalid("群组不存在"))?;
    if uids.iter().any(|uid| uid == &group.owner_user_id) {
        return Err(AppError::invalid("不能移除群主"));
    }

    let mut tx = ctx.db.pool().begin().await?;
    GroupMemberRepository::remove_many(&mut tx, gid, uids).await?;
    GroupRepository::increment_member_count(&mut tx, gid, -(uids.len() as i64)).await?;
    tx.commit().await?;

    invalidate_membership_change(ctx, gid, uids).await;
    Ok(())
}

async fn invalidate_membership_change(ctx: &ServiceContext, gid: &str, affected: &[String]) {
    ctx.cache.delete(&keys::group_info(gid)).await;
    ctx.cache.delete(&keys::group_memberlist(gid)).await;
    for uid in affected {
        ctx.cache.delete(&keys::my_joined_group_list(uid)).await;
        ctx.cache.delete(&keys::group_session_list(uid)).await;
    }
}

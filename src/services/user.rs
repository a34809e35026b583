//! User service (spec.md §4.G).

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng};
use argon2::Argon2;

use crate::cache::keys;
use crate::db::entities::{User, UserStatus};
use crate::db::UserRepository;
use crate::error::{AppError, AppResult};

use super::ServiceContext;

fn hash_password(raw: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::system(format!("password hash failed: {e}")))
}

fn verify_password(raw: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(raw.as_bytes(), &parsed)
        .is_ok()
}

/// `register(tel, pwd, nick)` — revives a soft-deleted row with the same
/// telephone, or creates a new one. Duplicate active telephone is
/// `Invalid("该电话已经存在")` (spec.md §4.G).
///
/// The existence check and revival decision run inside one transaction
/// guarded by `SELECT ... FOR UPDATE` on the (possibly soft-deleted) row,
/// per the Go original's register flow — a race between two concurrent
/// registrations for the same phone number cannot create two live rows.
pub async fn register(ctx: &ServiceContext, telephone: &str, password: &str, nickname: &str) -> AppResult<(User, bool)> {
    let hash = hash_password(password)?;

    super::support::catch_panic(async {
        let mut tx = ctx.db.pool().begin().await?;

        if UserRepository::find_active_by_telephone_for_update(&mut tx, telephone).await?.is_some() {
            return Err(AppError::invalid("该电话已经存在"));
        }

        let existing_deleted = UserRepository::find_deleted_by_telephone_for_update(&mut tx, telephone).await?;
        let (user, revived) = if let Some(deleted) = existing_deleted {
            let user = UserRepository::revive(&mut tx, &deleted.uuid, &hash, nickname).await?;
            (user, true)
        } else {
            let user = UserRepository::insert(&mut tx, telephone, &hash, nickname).await?;
            (user, false)
        };

        tx.commit().await?;
        Ok((user, revived))
    })
    .await
}

/// `login(tel, pwd)` — distinguishes "user does not exist", "disabled",
/// and "wrong password" as separate `Invalid` messages (spec.md §7).
pub async fn login(ctx: &ServiceContext, telephone: &str, password: &str) -> AppResult<User> {
    let user = ctx
        .db
        .users()
        .find_active_by_telephone(telephone)
        .await?
        .ok_or_else(|| AppError::invalid("用户不存在"))?;

    if user.status == UserStatus::Disabled {
        return Err(AppError::invalid("该用户已被禁用"));
    }

    if !verify_password(password, &user.password_hash) {
        return Err(AppError::invalid("密码错误"));
    }

    ctx.cache.set_json(&keys::user_info(&user.uuid), &user).await;
    Ok(user)
}

/// `get(uid)` — read-through (spec.md §4.G).
pub async fn get(ctx: &ServiceContext, uid: &str) -> AppResult<User> {
    let key = keys::user_info(uid);
    if let Some(user) = ctx.cache.get_json::<User>(&key).await {
        return Ok(user);
    }

    let user = ctx
        .db
        .users()
        .find_by_id(uid)
        .await?
        .ok_or_else(|| AppError::invalid("用户不存在"))?;
    ctx.cache.set_json(&key, &user).await;
    Ok(user)
}

#[allow(clippy::too_many_arguments)]
pub async fn update(
    ctx: &ServiceContext,
    uid: &str,
    nickname: Option<&str>,
    avatar: Option<&str>,
    email: Option<&str>,
    gender: Option<i32>,
    birthday: Option<&str>,
    signature: Option<&str>,
) -> AppResult<()> {
    ctx.db
        .users()
        .update_profile(uid, nickname, avatar, email, gender, birthday, signature)
        .await?;
    ctx.cache.delete(&keys::user_info(uid)).await;
    Ok(())
}

/// `delete(uids[])` — cross-entity cascade: soft-delete the user and
/// everything that references them, dismissing any groups they own
/// (spec.md §3 "Lifecycle").
pub async fn delete(ctx: &ServiceContext, uids: &[String]) -> AppResult<()> {
    for uid in uids {
        let owned_groups = ctx.db.users().owned_group_ids(uid).await?;
        for gid in &owned_groups {
            super::group::dismiss_internal(ctx, gid).await?;
        }

        let mut tx = ctx.db.pool().begin().await?;
        crate::db::SessionRepository::soft_delete_by_participant(&mut tx, uid).await?;
        crate::db::ContactRepository::soft_delete_by_user(&mut tx, uid).await?;
        ctx.db.contact_applies().soft_delete_by_user(&mut tx, uid).await?;
        crate::db::MessageRepository::delete_by_user(&mut tx, uid).await?;
        tx.commit().await?;

        ctx.db.users().soft_delete(std::slice::from_ref(uid)).await?;
    }

    ctx.cache.delete_for_ids("user_info", uids).await;
    for uid in uids {
        ctx.cache.delete_by_prefix(&keys::contact_user_list(uid)).await;
        ctx.cache.delete(&keys::contact_mygroup_list(uid)).await;
        ctx.cache.delete(&keys::my_joined_group_list(uid)).await;
        ctx.cache.delete(&keys::session_list(uid)).await;
        ctx.cache.delete(&keys::group_session_list(uid)).await;
    }
    Ok(())
}

pub async fn list_excluding(ctx: &ServiceContext, uid: &str) -> AppResult<Vec<User>> {
    ctx.db.users().list_excluding(uid).await
}

/// `enable`/`disable` — broad invalidation: a status flip can affect every
/// cached contact list containing this user, so invalidate by prefix
/// rather than enumerate (spec.md §4.G).
pub async fn set_status(ctx: &ServiceContext, uids: &[String], status: UserStatus) -> AppResult<()> {
    ctx.db.users().set_status(uids, status).await?;
    ctx.cache.delete_for_ids("user_info", uids).await;
    ctx.cache.delete_by_prefix("contact_user_list").await;
    Ok(())
}

pub async fn set_admin(ctx: &ServiceContext, uids: &[String], is_admin: bool) -> AppResult<()> {
    ctx.db.users().set_admin(uids, is_admin).await?;
    ctx.cache.delete_for_ids("user_info", uids).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trips_through_argon2() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong", &hash));
    }
}

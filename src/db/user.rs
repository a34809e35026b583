//! User repository (spec.md §3, §4.G).

use chrono::Utc;
use sqlx::{MySql, MySqlPool, Transaction};

use super::entities::{User, UserStatus};
use crate::error::AppError;
use crate::ids::{Kind, new_id};

pub struct UserRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, uid: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE uuid = ? AND deleted_at IS NULL",
        )
        .bind(uid)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Active (non-deleted) row for a telephone number, used to enforce uniqueness.
    pub async fn find_active_by_telephone(&self, telephone: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE telephone = ? AND deleted_at IS NULL",
        )
        .bind(telephone)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Row-locked lookup of the active row for a telephone number, run
    /// inside `register`'s existence-check transaction so a concurrent
    /// registration for the same number can't race past it.
    pub async fn find_active_by_telephone_for_update(
        tx: &mut Transaction<'_, MySql>,
        telephone: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE telephone = ? AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(telephone)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(user)
    }

    /// Row-locked lookup of the most recent soft-deleted row for a
    /// telephone number, used by `register` to revive a previously
    /// deleted account rather than creating a new uuid.
    pub async fn find_deleted_by_telephone_for_update(
        tx: &mut Transaction<'_, MySql>,
        telephone: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE telephone = ? AND deleted_at IS NOT NULL \
             ORDER BY deleted_at DESC LIMIT 1 FOR UPDATE",
        )
        .bind(telephone)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(user)
    }

    pub async fn insert(
        tx: &mut Transaction<'_, MySql>,
        telephone: &str,
        password_hash: &str,
        nickname: &str,
    ) -> Result<User, AppError> {
        let uuid = new_id(Kind::User);
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (uuid, telephone, password_hash, nickname, avatar, \
             created_at, is_admin, status) VALUES (?, ?, ?, ?, '', ?, FALSE, 'NORMAL')",
        )
        .bind(&uuid)
        .bind(telephone)
        .bind(password_hash)
        .bind(nickname)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        sqlx::query_as::<_, User>("SELECT * FROM users WHERE uuid = ?")
            .bind(&uuid)
            .fetch_one(&mut **tx)
            .await
            .map_err(Into::into)
    }

    /// Revive a soft-deleted row in place, reusing its uuid.
    pub async fn revive(
        tx: &mut Transaction<'_, MySql>,
        uuid: &str,
        password_hash: &str,
        nickname: &str,
    ) -> Result<User, AppError> {
        sqlx::query(
            "UPDATE users SET password_hash = ?, nickname = ?, avatar = '', \
             status = 'NORMAL', deleted_at = NULL WHERE uuid = ?",
        )
        .bind(password_hash)
        .bind(nickname)
        .bind(uuid)
        .execute(&mut **tx)
        .await?;

        sqlx::query_as::<_, User>("SELECT * FROM users WHERE uuid = ?")
            .bind(uuid)
            .fetch_one(&mut **tx)
            .await
            .map_err(Into::into)
    }

    pub async fn update_profile(
        &self,
        uid: &str,
        nickname: Option<&str>,
        avatar: Option<&str>,
        email: Option<&str>,
        gender: Option<i32>,
        birthday: Option<&str>,
        signature: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET \
             nickname = COALESCE(?, nickname), \
             avatar = COALESCE(?, avatar), \
             email = COALESCE(?, email), \
             gender = COALESCE(?, gender), \
             birthday = COALESCE(?, birthday), \
             signature = COALESCE(?, signature) \
             WHERE uuid = ? AND deleted_at IS NULL",
        )
        .bind(nickname)
        .bind(avatar)
        .bind(email)
        .bind(gender)
        .bind(birthday)
        .bind(signature)
        .bind(uid)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_excluding(&self, uid: &str) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE uuid != ? AND deleted_at IS NULL ORDER BY created_at",
        )
        .bind(uid)
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }

    pub async fn set_status(&self, uids: &[String], status: UserStatus) -> Result<(), AppError> {
        if uids.is_empty() {
            return Ok(());
        }
        let placeholders = vec!["?"; uids.len()].join(",");
        let sql = format!(
            "UPDATE users SET status = ? WHERE uuid IN ({placeholders}) AND deleted_at IS NULL"
        );
        let mut query = sqlx::query(&sql).bind(status);
        for uid in uids {
            query = query.bind(uid);
        }
        query.execute(self.pool).await?;
        Ok(())
    }

    pub async fn set_admin(&self, uids: &[String], is_admin: bool) -> Result<(), AppError> {
        if uids.is_empty() {
            return Ok(());
        }
        let placeholders = vec!["?"; uids.len()].join(",");
        let sql = format!(
            "UPDATE users SET is_admin = ? WHERE uuid IN ({placeholders}) AND deleted_at IS NULL"
        );
        let mut query = sqlx::query(&sql).bind(is_admin);
        for uid in uids {
            query = query.bind(uid);
        }
        query.execute(self.pool).await?;
        Ok(())
    }

    pub async fn soft_delete(&self, uids: &[String]) -> Result<(), AppError> {
        if uids.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        let placeholders = vec!["?"; uids.len()].join(",");
        let sql = format!(
            "UPDATE users SET deleted_at = ? WHERE uuid IN ({placeholders}) AND deleted_at IS NULL"
        );
        let mut query = sqlx::query(&sql).bind(now);
        for uid in uids {
            query = query.bind(uid);
        }
        query.execute(self.pool).await?;
        Ok(())
    }

    pub async fn owned_group_ids(&self, uid: &str) -> Result<Vec<String>, AppError> {
        let ids: Vec<(String,)> = sqlx::query_as(
            "SELECT uuid FROM groups WHERE owner_user_id = ? AND deleted_at IS NULL",
        )
        .bind(uid)
        .fetch_all(self.pool)
        .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}

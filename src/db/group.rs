//! Group repository (spec.md §3, §4.B, §4.G).

use chrono::Utc;
use sqlx::{MySql, MySqlPool, Transaction};

use super::entities::{AddMode, Group, GroupStatus};
use crate::error::AppError;
use crate::ids::{Kind, new_id};

pub struct GroupRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> GroupRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, gid: &str) -> Result<Option<Group>, AppError> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT * FROM groups WHERE uuid = ? AND deleted_at IS NULL",
        )
        .bind(gid)
        .fetch_optional(self.pool)
        .await?;
        Ok(group)
    }

    /// Row-lock a group for the duration of a transaction (spec.md §4.B).
    pub async fn find_for_update(
        tx: &mut Transaction<'_, MySql>,
        gid: &str,
    ) -> Result<Option<Group>, AppError> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT * FROM groups WHERE uuid = ? AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(gid)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(group)
    }

    pub async fn insert(
        &self,
        name: &str,
        notice: Option<&str>,
        owner_user_id: &str,
        add_mode: AddMode,
        avatar: &str,
    ) -> Result<Group, AppError> {
        let uuid = new_id(Kind::Group);
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO groups (uuid, name, notice, owner_user_id, member_count, \
             add_mode, avatar, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, 1, ?, ?, 'NORMAL', ?, ?)",
        )
        .bind(&uuid)
        .bind(name)
        .bind(notice)
        .bind(owner_user_id)
        .bind(add_mode)
        .bind(avatar)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        self.find_by_id(&uuid)
            .await?
            .ok_or_else(|| AppError::system("group vanished immediately after insert"))
    }

    pub async fn increment_member_count(
        tx: &mut Transaction<'_, MySql>,
        gid: &str,
        delta: i64,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE groups SET member_count = member_count + ?, updated_at = ? WHERE uuid = ?")
            .bind(delta)
            .bind(Utc::now())
            .bind(gid)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn update_profile(
        &self,
        gid: &str,
        name: Option<&str>,
        notice: Option<&str>,
        avatar: Option<&str>,
        add_mode: Option<AddMode>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE groups SET \
             name = COALESCE(?, name), \
             notice = COALESCE(?, notice), \
             avatar = COALESCE(?, avatar), \
             add_mode = COALESCE(?, add_mode), \
             updated_at = ? \
             WHERE uuid = ? AND deleted_at IS NULL",
        )
        .bind(name)
        .bind(notice)
        .bind(avatar)
        .bind(add_mode)
        .bind(Utc::now())
        .bind(gid)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_status(&self, gids: &[String], status: GroupStatus) -> Result<(), AppError> {
        if gids.is_empty() {
            return Ok(());
        }
        let placeholders = vec!["?"; gids.len()].join(",");
        let sql = format!(
            "UPDATE groups SET status = ?, updated_at = ? WHERE uuid IN ({placeholders}) AND deleted_at IS NULL"
        );
        let mut query = sqlx::query(&sql).bind(status).bind(Utc::now());
        for gid in gids {
            query = query.bind(gid);
        }
        query.execute(self.pool).await?;
        Ok(())
    }

    pub async fn soft_delete(
        tx: &mut Transaction<'_, MySql>,
        gid: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE groups SET deleted_at = ? WHERE uuid = ?")
            .bind(Utc::now())
            .bind(gid)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<Group>, AppError> {
        let groups = sqlx::query_as::<_, Group>("SELECT * FROM groups ORDER BY created_at")
            .fetch_all(self.pool)
            .await?;
        Ok(groups)
    }
}

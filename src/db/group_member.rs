//! Group membership repository. Hard-delete only (spec.md §3 invariant 1).

use chrono::Utc;
use sqlx::{MySql, MySqlPool, Transaction};

use super::entities::GroupMember;
use crate::error::AppError;

pub struct GroupMemberRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> GroupMemberRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, gid: &str) -> Result<Vec<GroupMember>, AppError> {
        let members = sqlx::query_as::<_, GroupMember>(
            "SELECT * FROM group_members WHERE group_id = ? ORDER BY joined_at",
        )
        .bind(gid)
        .fetch_all(self.pool)
        .await?;
        Ok(members)
    }

    pub async fn member_ids(&self, gid: &str) -> Result<Vec<String>, AppError> {
        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT user_id FROM group_members WHERE group_id = ?")
                .bind(gid)
                .fetch_all(self.pool)
                .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    pub async fn exists(
        tx: &mut Transaction<'_, MySql>,
        gid: &str,
        uid: &str,
    ) -> Result<bool, AppError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM group_members WHERE group_id = ? AND user_id = ? FOR UPDATE",
        )
        .bind(gid)
        .bind(uid)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.is_some())
    }

    pub async fn insert(
        tx: &mut Transaction<'_, MySql>,
        gid: &str,
        uid: &str,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO group_members (group_id, user_id, joined_at) VALUES (?, ?, ?)")
            .bind(gid)
            .bind(uid)
            .bind(Utc::now())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn remove(
        tx: &mut Transaction<'_, MySql>,
        gid: &str,
        uid: &str,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM group_members WHERE group_id = ? AND user_id = ?")
            .bind(gid)
            .bind(uid)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn remove_many(
        tx: &mut Transaction<'_, MySql>,
        gid: &str,
        uids: &[String],
    ) -> Result<(), AppError> {
        if uids.is_empty() {
            return Ok(());
        }
        let placeholders = vec!["?"; uids.len()].join(",");
        let sql = format!(
            "DELETE FROM group_members WHERE group_id = ? AND user_id IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql).bind(gid);
        for uid in uids {
            query = query.bind(uid);
        }
        query.execute(&mut **tx).await?;
        Ok(())
    }

    pub async fn remove_all(
        tx: &mut Transaction<'_, MySql>,
        gid: &str,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM group_members WHERE group_id = ?")
            .bind(gid)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn joined_group_ids(&self, uid: &str) -> Result<Vec<String>, AppError> {
        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT group_id FROM group_members WHERE user_id = ?")
                .bind(uid)
                .fetch_all(self.pool)
                .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}

//! Session (conversation) repository (spec.md §3 invariant 4).

use chrono::Utc;
use sqlx::{MySql, MySqlPool, Transaction};

use super::entities::Session;
use crate::error::AppError;
use crate::ids::{Kind, new_id};

pub struct SessionRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> SessionRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, sender_id: &str, receiver_id: &str) -> Result<Option<Session>, AppError> {
        let row = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE sender_id = ? AND receiver_id = ? \
             AND deleted_at IS NULL",
        )
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_by_id(&self, sid: &str) -> Result<Option<Session>, AppError> {
        let row = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE uuid = ? AND deleted_at IS NULL",
        )
        .bind(sid)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn insert(
        &self,
        sender_id: &str,
        receiver_id: &str,
        receiver_display_name: &str,
        avatar: &str,
    ) -> Result<Session, AppError> {
        let uuid = new_id(Kind::Session);
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO sessions (uuid, sender_id, receiver_id, receiver_display_name, \
             avatar, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&uuid)
        .bind(sender_id)
        .bind(receiver_id)
        .bind(receiver_display_name)
        .bind(avatar)
        .bind(now)
        .execute(self.pool)
        .await?;

        self.find_by_id(&uuid)
            .await?
            .ok_or_else(|| AppError::system("session vanished immediately after insert"))
    }

    pub async fn touch_last_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        last_message: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE sessions SET last_message = ?, last_message_at = ? \
             WHERE sender_id = ? AND receiver_id = ? AND deleted_at IS NULL",
        )
        .bind(last_message)
        .bind(Utc::now())
        .bind(sender_id)
        .bind(receiver_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_direct(&self, uid: &str) -> Result<Vec<Session>, AppError> {
        let rows = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE sender_id = ? AND receiver_id LIKE 'U%' \
             AND deleted_at IS NULL ORDER BY COALESCE(last_message_at, created_at) DESC",
        )
        .bind(uid)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_group(&self, uid: &str) -> Result<Vec<Session>, AppError> {
        let rows = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE sender_id = ? AND receiver_id LIKE 'G%' \
             AND deleted_at IS NULL ORDER BY COALESCE(last_message_at, created_at) DESC",
        )
        .bind(uid)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn soft_delete(&self, sender_id: &str, receiver_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE sessions SET deleted_at = ? WHERE sender_id = ? AND receiver_id = ? \
             AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(sender_id)
        .bind(receiver_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn soft_delete_pair(
        tx: &mut Transaction<'_, MySql>,
        a: &str,
        b: &str,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE sessions SET deleted_at = ? \
             WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)",
        )
        .bind(now)
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn soft_delete_by_receiver(
        tx: &mut Transaction<'_, MySql>,
        receiver_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE sessions SET deleted_at = ? WHERE receiver_id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(receiver_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn soft_delete_by_participant(
        tx: &mut Transaction<'_, MySql>,
        uid: &str,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE sessions SET deleted_at = ? \
             WHERE (sender_id = ? OR receiver_id = ?) AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(uid)
        .bind(uid)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn refresh_receiver_display(
        &self,
        receiver_id: &str,
        display_name: &str,
        avatar: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE sessions SET receiver_display_name = ?, avatar = ? \
             WHERE receiver_id = ? AND deleted_at IS NULL",
        )
        .bind(display_name)
        .bind(avatar)
        .bind(receiver_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

//! Message repository (spec.md §4.F, §4.G History service).

use chrono::Utc;
use sqlx::{MySql, MySqlPool, Transaction};

use super::entities::{Message, MessageStatus, MessageType};
use crate::error::AppError;
use crate::ids::{Kind, new_id};

pub struct MessageRepository<'a> {
    pool: &'a MySqlPool,
}

#[allow(clippy::too_many_arguments)]
pub struct NewMessage<'a> {
    pub session_id: &'a str,
    pub message_type: MessageType,
    pub content: Option<&'a str>,
    pub url: Option<&'a str>,
    pub sender_id: &'a str,
    pub sender_name: &'a str,
    pub sender_avatar: &'a str,
    pub receiver_id: &'a str,
    pub file_size: Option<i64>,
    pub file_type: Option<&'a str>,
    pub file_name: Option<&'a str>,
    pub av_data: Option<&'a str>,
}

impl<'a> MessageRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, msg: NewMessage<'_>) -> Result<Message, AppError> {
        let uuid = new_id(Kind::Message);
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO messages (uuid, session_id, type, content, url, sender_id, \
             sender_name, sender_avatar, receiver_id, file_size, file_type, file_name, \
             status, av_data, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'UNSENT', ?, ?)",
        )
        .bind(&uuid)
        .bind(msg.session_id)
        .bind(msg.message_type)
        .bind(msg.content)
        .bind(msg.url)
        .bind(msg.sender_id)
        .bind(msg.sender_name)
        .bind(msg.sender_avatar)
        .bind(msg.receiver_id)
        .bind(msg.file_size)
        .bind(msg.file_type)
        .bind(msg.file_name)
        .bind(msg.av_data)
        .bind(now)
        .execute(self.pool)
        .await?;

        self.find_by_id(&uuid)
            .await?
            .ok_or_else(|| AppError::system("message vanished immediately after insert"))
    }

    pub async fn find_by_id(&self, mid: &str) -> Result<Option<Message>, AppError> {
        let row = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE uuid = ?")
            .bind(mid)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Best-effort status update made by the write loop after a successful
    /// egress send (spec.md §4.E). Errors are logged by the caller, never fatal.
    pub async fn mark_sent(&self, mid: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE messages SET status = ? WHERE uuid = ?")
            .bind(MessageStatus::Sent)
            .bind(mid)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Direct message history between two users, ordered ascending (spec.md §8).
    pub async fn direct_history(&self, u1: &str, u2: &str) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages \
             WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?) \
             ORDER BY created_at ASC",
        )
        .bind(u1)
        .bind(u2)
        .bind(u2)
        .bind(u1)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn group_history(&self, gid: &str) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE receiver_id = ? ORDER BY created_at ASC",
        )
        .bind(gid)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn delete_by_group(
        tx: &mut Transaction<'_, MySql>,
        gid: &str,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM messages WHERE receiver_id = ?")
            .bind(gid)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn delete_by_user(
        tx: &mut Transaction<'_, MySql>,
        uid: &str,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM messages WHERE sender_id = ? OR receiver_id = ?")
            .bind(uid)
            .bind(uid)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

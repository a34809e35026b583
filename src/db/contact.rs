//! UserContact repository. Symmetric rows for user↔user contacts (spec.md §3 invariant 2).

use chrono::Utc;
use sqlx::{MySql, MySqlPool, Transaction};

use super::entities::{ContactStatus, ContactType, UserContact};
use crate::error::AppError;

pub struct ContactRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> ContactRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, uid: &str) -> Result<Vec<UserContact>, AppError> {
        let rows = sqlx::query_as::<_, UserContact>(
            "SELECT * FROM user_contacts WHERE user_id = ? AND deleted_at IS NULL \
             ORDER BY created_at",
        )
        .bind(uid)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find(&self, uid: &str, cid: &str) -> Result<Option<UserContact>, AppError> {
        let row = sqlx::query_as::<_, UserContact>(
            "SELECT * FROM user_contacts WHERE user_id = ? AND contact_id = ? \
             AND deleted_at IS NULL",
        )
        .bind(uid)
        .bind(cid)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Insert or resurrect one direction of a contact relation.
    pub async fn upsert(
        tx: &mut Transaction<'_, MySql>,
        uid: &str,
        cid: &str,
        contact_type: ContactType,
        status: ContactStatus,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO user_contacts (user_id, contact_id, contact_type, status, \
             created_at, updated_at, deleted_at) VALUES (?, ?, ?, ?, ?, ?, NULL) \
             ON DUPLICATE KEY UPDATE contact_type = VALUES(contact_type), \
             status = VALUES(status), updated_at = VALUES(updated_at), deleted_at = NULL",
        )
        .bind(uid)
        .bind(cid)
        .bind(contact_type)
        .bind(status)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn set_status_pair(
        tx: &mut Transaction<'_, MySql>,
        uid: &str,
        cid: &str,
        uid_status: ContactStatus,
        cid_status: ContactStatus,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE user_contacts SET status = ?, updated_at = ? \
             WHERE user_id = ? AND contact_id = ? AND deleted_at IS NULL",
        )
        .bind(uid_status)
        .bind(now)
        .bind(uid)
        .bind(cid)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            "UPDATE user_contacts SET status = ?, updated_at = ? \
             WHERE user_id = ? AND contact_id = ? AND deleted_at IS NULL",
        )
        .bind(cid_status)
        .bind(now)
        .bind(cid)
        .bind(uid)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn soft_delete_pair(
        tx: &mut Transaction<'_, MySql>,
        uid: &str,
        cid: &str,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE user_contacts SET deleted_at = ? \
             WHERE (user_id = ? AND contact_id = ?) OR (user_id = ? AND contact_id = ?)",
        )
        .bind(now)
        .bind(uid)
        .bind(cid)
        .bind(cid)
        .bind(uid)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Soft-delete every contact row (either direction) referencing a group,
    /// used during group dismissal.
    pub async fn soft_delete_by_group(
        tx: &mut Transaction<'_, MySql>,
        gid: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE user_contacts SET deleted_at = ? WHERE contact_id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(gid)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn soft_delete_by_user(
        tx: &mut Transaction<'_, MySql>,
        uid: &str,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE user_contacts SET deleted_at = ? \
             WHERE (user_id = ? OR contact_id = ?) AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(uid)
        .bind(uid)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

//! ContactApply repository (spec.md §4.G state machine).

use chrono::Utc;
use sqlx::{MySql, MySqlPool, Transaction};

use super::entities::{ApplyStatus, ContactApply, ContactType};
use crate::error::AppError;
use crate::ids::{Kind, new_id};

pub struct ContactApplyRepository<'a> {
    pool: &'a MySqlPool,
}

impl<'a> ContactApplyRepository<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn find_pair(
        &self,
        applicant: &str,
        target: &str,
    ) -> Result<Option<ContactApply>, AppError> {
        let row = sqlx::query_as::<_, ContactApply>(
            "SELECT * FROM contact_applies WHERE applicant_user_id = ? AND target_id = ?",
        )
        .bind(applicant)
        .bind(target)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Create a new application, or reset an existing one to PENDING, unless
    /// it is currently BLACK (spec.md §4.G ContactApply state machine).
    pub async fn upsert_pending(
        &self,
        applicant: &str,
        target: &str,
        contact_type: ContactType,
        message: Option<&str>,
    ) -> Result<ContactApply, AppError> {
        if let Some(existing) = self.find_pair(applicant, target).await? {
            if existing.status == ApplyStatus::Black {
                return Err(AppError::invalid("对方已将你拉黑"));
            }
            sqlx::query(
                "UPDATE contact_applies SET status = 'PENDING', message = ?, last_apply_at = ? \
                 WHERE uuid = ?",
            )
            .bind(message)
            .bind(Utc::now())
            .bind(&existing.uuid)
            .execute(self.pool)
            .await?;
            return self
                .find_pair(applicant, target)
                .await?
                .ok_or_else(|| AppError::system("apply vanished after update"));
        }

        let uuid = new_id(Kind::ContactApply);
        sqlx::query(
            "INSERT INTO contact_applies (uuid, applicant_user_id, target_id, contact_type, \
             status, message, last_apply_at) VALUES (?, ?, ?, ?, 'PENDING', ?, ?)",
        )
        .bind(&uuid)
        .bind(applicant)
        .bind(target)
        .bind(contact_type)
        .bind(message)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;

        self.find_pair(applicant, target)
            .await?
            .ok_or_else(|| AppError::system("apply vanished after insert"))
    }

    pub async fn pending_incoming(&self, uid: &str) -> Result<Vec<ContactApply>, AppError> {
        let rows = sqlx::query_as::<_, ContactApply>(
            "SELECT * FROM contact_applies WHERE target_id = ? AND status = 'PENDING' \
             ORDER BY last_apply_at DESC",
        )
        .bind(uid)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn pending_for_group(&self, gid: &str) -> Result<Vec<ContactApply>, AppError> {
        let rows = sqlx::query_as::<_, ContactApply>(
            "SELECT * FROM contact_applies WHERE target_id = ? AND status = 'PENDING' \
             ORDER BY last_apply_at DESC",
        )
        .bind(gid)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn set_status(
        &self,
        tx: &mut Transaction<'_, MySql>,
        applicant: &str,
        target: &str,
        status: ApplyStatus,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE contact_applies SET status = ? WHERE applicant_user_id = ? AND target_id = ?",
        )
        .bind(status)
        .bind(applicant)
        .bind(target)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn soft_delete_by_group(
        &self,
        tx: &mut Transaction<'_, MySql>,
        gid: &str,
    ) -> Result<(), AppError> {
        // ContactApply has no deleted_at column; a dismissed group's applies
        // are moved out of PENDING so they no longer surface to owners.
        sqlx::query("UPDATE contact_applies SET status = 'REFUSE' WHERE target_id = ?")
            .bind(gid)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn soft_delete_by_user(
        &self,
        tx: &mut Transaction<'_, MySql>,
        uid: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE contact_applies SET status = 'REFUSE' \
             WHERE applicant_user_id = ? OR target_id = ?",
        )
        .bind(uid)
        .bind(uid)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

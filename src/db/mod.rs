//! Authoritative relational store.
//!
//! Wraps a MySQL connection pool and exposes one repository per entity
//! (spec.md §3). Transactional operations borrow a live
//! `sqlx::Transaction` and rely on Rust's drop glue to roll back on any
//! non-commit exit path, mirroring the teacher's boot-time migration
//! pattern with a tracked-migrations table instead of ad hoc existence
//! checks.

pub mod entities;

mod contact;
mod contact_apply;
mod group;
mod group_member;
mod message;
mod session;
mod user;

pub use contact::ContactRepository;
pub use contact_apply::ContactApplyRepository;
pub use group::GroupRepository;
pub use group_member::GroupMemberRepository;
pub use message::{MessageRepository, NewMessage};
pub use session::SessionRepository;
pub use user::UserRepository;

use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, MySqlPool, Transaction};
use std::time::Duration;
use tracing::info;

use crate::error::AppError;

#[cfg(all(test, feature = "database-tests"))]
mod integration_tests;

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: MySqlPool,
}

impl Database {
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connect and run any pending migrations under `migrations/`.
    pub async fn new(dsn: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .idle_timeout(Some(Self::IDLE_TIMEOUT))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .map_err(|e| AppError::system(format!("mysql connect failed: {e}")))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::system(format!("migration failed: {e}")))?;

        info!("database connected and migrated");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Start a transaction. Dropping the returned handle without calling
    /// `commit` rolls it back.
    pub async fn begin_tx(&self) -> Result<Transaction<'_, MySql>, AppError> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::system(format!("begin transaction failed: {e}")))
    }

    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool)
    }

    pub fn groups(&self) -> GroupRepository<'_> {
        GroupRepository::new(&self.pool)
    }

    pub fn group_members(&self) -> GroupMemberRepository<'_> {
        GroupMemberRepository::new(&self.pool)
    }

    pub fn contacts(&self) -> ContactRepository<'_> {
        ContactRepository::new(&self.pool)
    }

    pub fn contact_applies(&self) -> ContactApplyRepository<'_> {
        ContactApplyRepository::new(&self.pool)
    }

    pub fn sessions(&self) -> SessionRepository<'_> {
        SessionRepository::new(&self.pool)
    }

    pub fn messages(&self) -> MessageRepository<'_> {
        MessageRepository::new(&self.pool)
    }
}

//! Cache-coherent services (spec.md §4.G).
//!
//! Every operation here follows one of four patterns named in the spec:
//! read-through, mutation-with-prewrite, mutation-with-broad-invalidation,
//! cross-entity-cascade. Cache errors are swallowed by `Cache` itself and
//! never abort a service call; store transaction errors always do.

pub mod contact;
pub mod group;
pub mod history;
pub mod session;
pub mod support;
pub mod user;

use std::sync::Arc;

use crate::cache::Cache;
use crate::db::Database;

/// Shared handle threaded into every service, replacing the module-level
/// globals the spec's source used (spec.md §9 "Global state").
#[derive(Clone)]
pub struct ServiceContext {
    pub db: Database,
    pub cache: Arc<Cache>,
}

impl ServiceContext {
    pub fn new(db: Database, cache: Cache) -> Self {
        Self { db, cache: Arc::new(cache) }
    }
}

//! Panic recovery for service transactions (spec.md §7).
//!
//! A panic inside a transaction body must not unwind through the axum
//! handler and take the connection down with it: it recovers, the
//! transaction rolls back via its own `Drop` impl, and the caller gets
//! back an ordinary `AppError::System`.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::error;

use crate::error::{AppError, AppResult};

/// Runs `fut` under `catch_unwind`, converting a panic into
/// `AppError::System` instead of letting it propagate.
pub async fn catch_panic<F, T>(fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(&panic);
            error!(panic = %message, "service transaction panicked, rolled back");
            Err(AppError::system(format!("panic in service transaction: {message}")))
        }
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Maps a `tokio::spawn` join failure to `AppError::System`, for futures a
/// library boundary requires to be spawned rather than polled in place
/// (where `catch_panic`'s `UnwindSafe` bound can't be satisfied).
pub async fn catch_panic_spawned<T>(handle: tokio::task::JoinHandle<T>) -> AppResult<T> {
    handle.await.map_err(|e| {
        error!(error = %e, "spawned service task panicked or was cancelled");
        AppError::system(format!("spawned task failed: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn catch_panic_recovers_and_returns_system_error() {
        let result: AppResult<()> = catch_panic(async { panic!("boom") }).await;
        match result {
            Err(AppError::System(msg)) => assert!(msg.contains("boom")),
            other => panic!("expected System error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn catch_panic_passes_through_ok() {
        let result: AppResult<i32> = catch_panic(async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn catch_panic_passes_through_err() {
        let result: AppResult<()> = catch_panic(async { Err(AppError::invalid("bad")) }).await;
        assert!(matches!(result, Err(AppError::Invalid(_))));
    }

    #[tokio::test]
    async fn catch_panic_spawned_maps_join_error() {
        let handle = tokio::spawn(async { panic!("spawned boom") });
        let result: AppResult<()> = catch_panic_spawned(handle).await;
        assert!(matches!(result, Err(AppError::System(_))));
    }
}

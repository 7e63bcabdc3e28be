//! Process-wide handle to the application state.
//!
//! Initialization happens at most once at a time; concurrent callers wait for
//! the first one and share its result. `shutdown` closes the pools and clears
//! the handle so a later call can initialize again.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;

use super::error::InitializationError;
use super::AppState;

static APP_STATE: OnceLock<Mutex<Option<Arc<AppState>>>> = OnceLock::new();

fn slot() -> &'static Mutex<Option<Arc<AppState>>> {
    APP_STATE.get_or_init(|| Mutex::new(None))
}

/// Returns the shared state, running `init` if nothing is installed yet.
/// A failed `init` leaves the handle empty.
pub async fn get_or_try_init<F, Fut>(init: F) -> Result<Arc<AppState>, InitializationError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Arc<AppState>, InitializationError>>,
{
    let mut guard = slot().lock().await;
    if let Some(state) = guard.as_ref() {
        return Ok(state.clone());
    }

    let state = init().await?;
    *guard = Some(state.clone());
    Ok(state)
}

pub async fn get() -> Option<Arc<AppState>> {
    slot().lock().await.clone()
}

/// Closes database pools and clears the handle. Returns whether anything
/// was installed.
pub async fn shutdown() -> bool {
    let taken = slot().lock().await.take();
    match taken {
        Some(state) => {
            state.close().await;
            tracing::info!("Application state shut down");
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::RagError;
    use crate::state::tests::settings_in;
    use crate::test_support::MockProvider;

    #[tokio::test]
    async fn initializes_once_and_shuts_down() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::new());

        let failed = get_or_try_init(|| async {
            Err::<Arc<AppState>, _>(InitializationError::Pipeline(RagError::Configuration(
                "first attempt fails".into(),
            )))
        })
        .await;
        assert!(failed.is_err());
        assert!(get().await.is_none());

        let first = get_or_try_init(|| {
            AppState::with_provider(settings_in(tmp.path()), provider.clone())
        })
        .await
        .unwrap();
        let second = get_or_try_init(|| async {
            Err::<Arc<AppState>, _>(InitializationError::Pipeline(RagError::Configuration(
                "must not run once installed".into(),
            )))
        })
        .await
        .unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        drop(first);
        drop(second);
        assert!(shutdown().await);
        assert!(get().await.is_none());
        assert!(!shutdown().await);
    }
}

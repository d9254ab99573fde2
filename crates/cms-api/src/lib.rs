pub mod auth;
pub mod complaints;
pub mod error;
pub mod middleware;
pub mod router;

pub use auth::{AppState, AppStateInner};
pub use error::Error;
pub use router::router;

use tracing::error;

/// Runs blocking work (SQLite queries, password hashing) off the async
/// runtime against the shared state.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, Error>
where
    F: FnOnce(&AppStateInner) -> Result<T, Error> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            Error::Internal(e.into())
        })?
}

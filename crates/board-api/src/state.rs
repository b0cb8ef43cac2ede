use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;

use board_badges::Activity;
use board_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub activity: Activity,
    pub upload_dir: PathBuf,
    pub max_image_bytes: usize,
}

impl AppStateInner {
    pub fn db(&self) -> &Database {
        self.activity.db()
    }
}

/// Run store and hashing work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
}

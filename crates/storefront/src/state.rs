//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::Repository;
use crate::services::MediaStorage;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; the repository is a trait object so the
/// same router runs against `PostgreSQL` or the in-memory store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    repo: Arc<dyn Repository>,
    media: MediaStorage,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, repo: Arc<dyn Repository>) -> Self {
        let media = MediaStorage::new(config.media_root.clone(), config.max_upload_bytes);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                repo,
                media,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The data store behind every handler.
    #[must_use]
    pub fn repo(&self) -> &dyn Repository {
        self.inner.repo.as_ref()
    }

    /// Upload storage rooted at `MEDIA_ROOT`.
    #[must_use]
    pub fn media(&self) -> &MediaStorage {
        &self.inner.media
    }
}

//! Per-page context shared by every rendered template: the navigation
//! bar's user and the pending flash messages.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use super::flash::{FlashMessage, take_flashes};
use crate::models::CurrentUser;
use crate::models::session::keys;

#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<FlashMessage>,
}

impl PageContext {
    /// Read the user and consume the flash messages.
    ///
    /// Call this only when a page is about to be rendered; messages taken
    /// here are gone from the session.
    pub async fn load(session: &Session) -> Self {
        let user = session
            .get::<CurrentUser>(keys::CURRENT_USER)
            .await
            .ok()
            .flatten();
        let flashes = take_flashes(session).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not read flash messages");
            Vec::new()
        });
        Self { user, flashes }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn can_manage(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::can_manage)
    }

    /// Name for the navigation bar; empty for guests.
    #[must_use]
    pub fn username(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.username.as_str())
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(match parts.extensions.get::<Session>() {
            Some(session) => Self::load(session).await,
            None => Self::default(),
        })
    }
}

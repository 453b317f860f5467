//! Authentication extractors.
//!
//! Handlers declare what they need by taking [`RequireAuth`],
//! [`RequireManager`], or [`OptionalAuth`]. The current user lives in the
//! session under [`keys::CURRENT_USER`].

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::flash::{FlashLevel, push_flash};
use crate::models::CurrentUser;
use crate::models::session::keys;

/// Login page.
pub const LOGIN_PATH: &str = "/users/login";

/// Extractor that requires a logged-in user.
///
/// If nobody is logged in, HTML requests are redirected to the login page
/// and JSON requests get `401`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a manager or admin.
pub struct RequireManager(pub CurrentUser);

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

/// Why an auth extractor refused the request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page, then back to `next`.
    RedirectToLogin { next: String },
    /// Unauthorized response (for JSON requests).
    Unauthorized,
    /// Logged in without the manager role: back to the product list.
    NotPermitted,
    /// Logged in without the manager role (for JSON requests).
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => Redirect::to(&login_url(&next)).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::NotPermitted => Redirect::to("/").into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

/// `/users/login?next=<path>`, with `next` percent-encoded.
#[must_use]
pub fn login_url(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={encoded}")
}

/// Whether the client expects JSON rather than a page.
fn wants_json(parts: &Parts) -> bool {
    parts.uri.path().starts_with("/favorites/toggle/")
        || parts
            .headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("application/json"))
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

fn login_rejection(parts: &Parts) -> AuthRejection {
    if wants_json(parts) {
        AuthRejection::Unauthorized
    } else {
        let next = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_owned(), ToString::to_string);
        AuthRejection::RedirectToLogin { next }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts)
            .await
            .map(Self)
            .ok_or_else(|| login_rejection(parts))
    }
}

impl<S> FromRequestParts<S> for RequireManager
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts)
            .await
            .ok_or_else(|| login_rejection(parts))?;
        if user.can_manage() {
            return Ok(Self(user));
        }

        tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Manager role required");
        if wants_json(parts) {
            return Err(AuthRejection::Forbidden);
        }
        if let Some(session) = parts.extensions.get::<Session>() {
            // Best effort: the redirect still happens if the message is lost.
            let _ = push_flash(
                session,
                FlashLevel::Error,
                "You do not have permission to access that page.",
            )
            .await;
        }
        Err(AuthRejection::NotPermitted)
    }
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts).await))
    }
}

/// Helper to set the current user in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CurrentUser>(keys::CURRENT_USER).await?;
    session.cycle_id().await
}

//! HTTP middleware and request extractors for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Extractors read the session the layer put in the request extensions.

pub mod auth;
pub mod flash;
pub mod page;
pub mod request_id;
pub mod session;

pub use auth::{
    AuthRejection, OptionalAuth, RequireAuth, RequireManager, clear_current_user,
    set_current_user,
};
pub use flash::{FlashLevel, FlashMessage, push_flash, take_flashes};
pub use page::PageContext;
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, session_layer};

//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration and password login
//! - `catalog` - Listing pipeline and product detail assembly
//! - `cart` - Cart mutations with product availability checks
//! - `categorize` - Keyword category assignment and the category report
//! - `favorites` - Favorite toggling
//! - `media` - Image upload storage

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod categorize;
pub mod favorites;
pub mod media;

pub use auth::{AuthError, AuthService};
pub use cart::CartService;
pub use catalog::{CatalogService, ListingPage, ListingQuery, ProductDetail};
pub use favorites::{FavoriteService, FavoriteState};
pub use media::{ImageKind, MediaError, MediaStorage};

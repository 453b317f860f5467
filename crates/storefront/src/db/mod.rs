//! Persistence for the storefront.
//!
//! # Database: `bazaar`
//!
//! ## Tables
//!
//! - `app_user` - Accounts with an argon2 password hash and a role
//! - `category` - Category forest (`parent_id` may be `NULL`)
//! - `shop` - Physical shops, each owned by one user
//! - `product`, `product_shop`, `product_image` - Catalog
//! - `cart`, `cart_item` - One cart per user, one line per product
//! - `favorite` - Unique (user, product) pairs
//! - `tower_sessions.session` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```
//!
//! Every concern is a trait so that handlers and services work against
//! [`Repository`] and tests can swap [`memory::MemoryStore`] in for
//! [`postgres::PgStore`].

pub mod memory;
pub mod postgres;

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use bazaar_core::cart::Quantity;
use bazaar_core::catalog::{ListingFilter, SortKey};
use bazaar_core::{CartId, CategoryId, ProductId, ShopId, UserId, UserRole};

use crate::models::{
    Cart, CartItem, Category, FavoriteEntry, NewCategory, NewUser, Product, ProductImage,
    ProductInput, Shop, ShopInput, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is invalid or corrupted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested record was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Accounts.
#[async_trait]
pub trait UserStore {
    /// Insert a user.
    ///
    /// # Errors
    ///
    /// `Conflict` when the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// The user and stored password hash for a login name.
    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// `NotFound` when the user does not exist.
    async fn set_role(&self, id: UserId, role: UserRole) -> Result<User, RepositoryError>;
}

/// The category forest.
#[async_trait]
pub trait CategoryStore {
    /// All categories ordered by `(parent_id, name)`.
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError>;

    /// First category with exactly this name.
    async fn find_category_by_name(&self, name: &str)
    -> Result<Option<Category>, RepositoryError>;

    async fn create_category(&self, category: NewCategory) -> Result<Category, RepositoryError>;
}

/// Shops.
#[async_trait]
pub trait ShopStore {
    /// All shops ordered by name.
    async fn list_shops(&self) -> Result<Vec<Shop>, RepositoryError>;

    /// Shops owned by one user, ordered by name.
    async fn list_shops_by_owner(&self, owner: UserId) -> Result<Vec<Shop>, RepositoryError>;

    async fn get_shop(&self, id: ShopId) -> Result<Option<Shop>, RepositoryError>;

    async fn create_shop(&self, owner: UserId, shop: ShopInput) -> Result<Shop, RepositoryError>;

    /// # Errors
    ///
    /// `NotFound` when the shop does not exist.
    async fn update_shop(&self, id: ShopId, shop: ShopInput) -> Result<Shop, RepositoryError>;

    /// Delete a shop and its product links. Returns whether it existed.
    async fn delete_shop(&self, id: ShopId) -> Result<bool, RepositoryError>;
}

/// Products and their gallery images.
#[async_trait]
pub trait ProductStore {
    /// One page of products passing `filter`, in `sort` order.
    async fn search_products(
        &self,
        filter: &ListingFilter,
        sort: SortKey,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Number of products passing `filter`.
    async fn count_products(&self, filter: &ListingFilter) -> Result<u64, RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Insert a product and its shop links.
    async fn create_product(
        &self,
        created_by: UserId,
        product: ProductInput,
        image: Option<String>,
    ) -> Result<Product, RepositoryError>;

    /// Replace a product's fields and shop links. The main image is only
    /// replaced when `image` is `Some`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        product: ProductInput,
        image: Option<String>,
    ) -> Result<Product, RepositoryError>;

    /// Delete a product with its images, cart lines and favorites.
    /// Returns the deleted product, if it existed.
    async fn delete_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Gallery images in display order.
    async fn list_product_images(
        &self,
        id: ProductId,
    ) -> Result<Vec<ProductImage>, RepositoryError>;

    /// Append gallery images after the existing ones.
    async fn add_product_images(
        &self,
        id: ProductId,
        images: Vec<String>,
    ) -> Result<Vec<ProductImage>, RepositoryError>;

    /// Set or clear a product's category.
    async fn set_product_category(
        &self,
        id: ProductId,
        category: Option<CategoryId>,
    ) -> Result<(), RepositoryError>;
}

/// Carts. Quantities are always at least one.
#[async_trait]
pub trait CartStore {
    /// The user's cart, created on first access.
    async fn get_or_create_cart(&self, user: UserId) -> Result<Cart, RepositoryError>;

    /// Lines of a cart, oldest first.
    async fn cart_items(&self, cart: CartId) -> Result<Vec<CartItem>, RepositoryError>;

    /// Add `quantity` of a product, merging into an existing line.
    /// Returns the line's new quantity.
    async fn add_to_cart(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, RepositoryError>;

    /// Overwrite a line's quantity. Returns whether the line existed.
    async fn set_cart_quantity(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError>;

    /// Delete a line. Returns whether it existed.
    async fn remove_from_cart(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<bool, RepositoryError>;
}

/// Favorites. A (user, product) pair is stored at most once.
#[async_trait]
pub trait FavoriteStore {
    /// Newest first.
    async fn list_favorites(&self, user: UserId) -> Result<Vec<FavoriteEntry>, RepositoryError>;

    async fn favorite_product_ids(
        &self,
        user: UserId,
    ) -> Result<BTreeSet<ProductId>, RepositoryError>;

    /// Returns `false` when the pair already existed.
    async fn add_favorite(&self, user: UserId, product: ProductId)
    -> Result<bool, RepositoryError>;

    /// Returns `false` when there was nothing to remove.
    async fn remove_favorite(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError>;

    async fn count_favorites(&self, user: UserId) -> Result<u64, RepositoryError>;
}

/// Everything the storefront persists.
#[async_trait]
pub trait Repository:
    UserStore + CategoryStore + ShopStore + ProductStore + CartStore + FavoriteStore + Send + Sync
{
    /// Cheap connectivity check for the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Map a unique violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

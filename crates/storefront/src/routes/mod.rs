//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET  /                       - Product list (q, category, shop, min_price, max_price, sort, page)
//! GET  /product/{id}           - Product detail
//!
//! # Product management (manager or admin)
//! GET  /manage                 - Product table, inactive included
//! GET  /add                    - New product form
//! POST /add                    - Create product (multipart)
//! GET  /edit/{id}              - Edit product form
//! POST /edit/{id}              - Update product (multipart)
//! POST /delete/{id}            - Delete product
//!
//! # Cart (requires auth)
//! GET  /cart                   - Cart page
//! POST /cart/add/{id}          - Add to cart (quantity, default 1)
//! POST /cart/update/{id}       - Set quantity, 0 removes the line
//! POST /cart/remove/{id}       - Remove from cart
//!
//! # Shops
//! GET  /shops                  - Shop list
//! GET  /nearest-shops          - Shops by distance from lat/lon
//! GET  /shops/manage           - Own shops, all shops for admins (manager)
//! GET  /shops/add              - New shop form (manager)
//! POST /shops/add              - Create shop (manager)
//! GET  /shops/edit/{id}        - Edit shop form (owner or admin)
//! POST /shops/edit/{id}        - Update shop (owner or admin)
//! POST /shops/delete/{id}      - Delete shop (owner or admin)
//!
//! # Favorites (requires auth)
//! GET  /favorites              - Favorite list
//! POST /favorites/add/{id}     - Add favorite
//! POST /favorites/remove/{id}  - Remove favorite (404 when absent)
//! POST /favorites/toggle/{id}  - Toggle, JSON {"is_favorite", "count"}
//!
//! # Users
//! GET  /users/register         - Registration form
//! POST /users/register         - Register and log in
//! GET  /users/login            - Login form
//! POST /users/login            - Login action
//! POST /users/logout           - Logout (requires auth)
//! GET  /users/profile          - Profile (requires auth)
//! ```

pub mod cart;
pub mod favorites;
pub mod products;
pub mod shops;
pub mod users;
pub mod views;

use std::str::FromStr;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::error::AppError;
use crate::state::AppState;

/// Upper bound for a whole multipart product form (main image plus gallery).
const PRODUCT_FORM_BODY_LIMIT: usize = 20 * 1024 * 1024;

/// Create the catalog and product management router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/product/{id}", get(products::show))
        .route("/manage", get(products::manage))
        .route("/add", get(products::add_page).post(products::add))
        .route("/edit/{id}", get(products::edit_page).post(products::edit))
        .route("/delete/{id}", post(products::delete))
        .layer(DefaultBodyLimit::max(PRODUCT_FORM_BODY_LIMIT))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add/{id}", post(cart::add))
        .route("/update/{id}", post(cart::update))
        .route("/remove/{id}", post(cart::remove))
}

/// Create the shop routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shops::index))
        .route("/manage", get(shops::manage))
        .route("/add", get(shops::add_page).post(shops::add))
        .route("/edit/{id}", get(shops::edit_page).post(shops::edit))
        .route("/delete/{id}", post(shops::delete))
}

/// Create the favorites routes router.
pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(favorites::index))
        .route("/add/{id}", post(favorites::add))
        .route("/remove/{id}", post(favorites::remove))
        .route("/toggle/{id}", post(favorites::toggle))
}

/// Create the user account routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(users::register_page).post(users::register))
        .route("/login", get(users::login_page).post(users::login))
        .route("/logout", post(users::logout))
        .route("/profile", get(users::profile))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(product_routes())
        .route("/nearest-shops", get(shops::nearest))
        .nest("/cart", cart_routes())
        .nest("/shops", shop_routes())
        .nest("/favorites", favorite_routes())
        .nest("/users", user_routes())
}

/// Parse a path id. Anything that is not an integer is a missing page.
pub(crate) fn parse_id<T: FromStr>(raw: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("no object with id {raw:?}")))
}

/// A form re-rendered with validation errors.
pub(crate) fn invalid_form(template: impl IntoResponse) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
}

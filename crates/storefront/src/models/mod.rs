//! Domain models for the storefront.
//!
//! These are validated domain objects; database row types live next to the
//! queries in [`crate::db`].

pub mod cart;
pub mod catalog;
pub mod session;
pub mod user;

pub use cart::{Cart, CartContents, CartItem, FavoriteEntry};
pub use catalog::{Category, NewCategory, Product, ProductImage, ProductInput, Shop, ShopInput};
pub use session::CurrentUser;
pub use user::{NewUser, User};

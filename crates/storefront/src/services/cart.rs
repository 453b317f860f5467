//! Cart operations.
//!
//! Carts are created lazily on first access. Only active products can be
//! added; lines for products that were deactivated later stay in the cart.

use bazaar_core::cart::{Quantity, QuantityUpdate};
use bazaar_core::{ProductId, UserId};

use crate::db::{Repository, RepositoryError};
use crate::models::{CartContents, Product};

pub struct CartService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// The user's cart and its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on storage failures.
    pub async fn contents(&self, user: UserId) -> Result<CartContents, RepositoryError> {
        let cart = self.repo.get_or_create_cart(user).await?;
        let items = self.repo.cart_items(cart.id).await?;
        Ok(CartContents { cart, items })
    }

    /// Add a product, merging with an existing line. Returns the product and
    /// the line's new quantity.
    ///
    /// # Errors
    ///
    /// `NotFound` when the product does not exist or is inactive.
    pub async fn add(
        &self,
        user: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<(Product, Quantity), RepositoryError> {
        let product = self
            .repo
            .get_product(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(RepositoryError::NotFound)?;
        let cart = self.repo.get_or_create_cart(user).await?;
        let total = self.repo.add_to_cart(cart.id, product_id, quantity).await?;
        tracing::info!(cart_id = %cart.id, product_id = %product_id, quantity = total.get(), "Added to cart");
        Ok((product, total))
    }

    /// Set a line's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// `NotFound` when the product is not in the cart.
    pub async fn update(
        &self,
        user: UserId,
        product_id: ProductId,
        update: QuantityUpdate,
    ) -> Result<(), RepositoryError> {
        let cart = self.repo.get_or_create_cart(user).await?;
        let found = match update {
            QuantityUpdate::Set(quantity) => {
                self.repo
                    .set_cart_quantity(cart.id, product_id, quantity)
                    .await?
            }
            QuantityUpdate::Remove => self.repo.remove_from_cart(cart.id, product_id).await?,
        };
        if found {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// `NotFound` when the product is not in the cart.
    pub async fn remove(&self, user: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        self.update(user, product_id, QuantityUpdate::Remove).await
    }
}

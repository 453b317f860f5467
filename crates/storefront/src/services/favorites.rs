//! Favorites.

use bazaar_core::{ProductId, UserId};
use serde::Serialize;

use crate::db::{Repository, RepositoryError};

/// Result of a toggle, returned as JSON to the product list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FavoriteState {
    pub is_favorite: bool,
    pub count: u64,
}

pub struct FavoriteService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> FavoriteService<'a> {
    #[must_use]
    pub const fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    async fn require_product(&self, product: ProductId) -> Result<(), RepositoryError> {
        self.repo
            .get_product(product)
            .await?
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    /// Add a favorite. Returns `false` when it was already a favorite.
    ///
    /// # Errors
    ///
    /// `NotFound` when the product does not exist.
    pub async fn add(&self, user: UserId, product: ProductId) -> Result<bool, RepositoryError> {
        self.require_product(product).await?;
        self.repo.add_favorite(user, product).await
    }

    /// Remove a favorite.
    ///
    /// # Errors
    ///
    /// `NotFound` when the product is not a favorite.
    pub async fn remove(&self, user: UserId, product: ProductId) -> Result<(), RepositoryError> {
        if self.repo.remove_favorite(user, product).await? {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    /// Flip the favorite flag and report the new state with the user's total.
    ///
    /// # Errors
    ///
    /// `NotFound` when the product does not exist.
    pub async fn toggle(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<FavoriteState, RepositoryError> {
        self.require_product(product).await?;
        let is_favorite = if self.repo.remove_favorite(user, product).await? {
            false
        } else {
            self.repo.add_favorite(user, product).await?;
            true
        };
        let count = self.repo.count_favorites(user).await?;
        Ok(FavoriteState { is_favorite, count })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::Price;

    use super::*;
    use crate::db::{MemoryStore, ProductStore};
    use crate::models::ProductInput;

    #[tokio::test]
    async fn test_toggle_flips_and_counts() {
        let store = MemoryStore::new();
        let product = store
            .create_product(
                UserId::new(1),
                ProductInput {
                    name: "Cheese".to_owned(),
                    category_id: None,
                    description: String::new(),
                    price: Price::from_cents(500).unwrap(),
                    is_active: true,
                    shop_ids: vec![],
                },
                None,
            )
            .await
            .unwrap();
        let favorites = FavoriteService::new(&store);
        let user = UserId::new(2);

        let on = favorites.toggle(user, product.id).await.unwrap();
        assert_eq!(on, FavoriteState { is_favorite: true, count: 1 });
        let off = favorites.toggle(user, product.id).await.unwrap();
        assert_eq!(off, FavoriteState { is_favorite: false, count: 0 });
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let store = MemoryStore::new();
        let result = FavoriteService::new(&store)
            .remove(UserId::new(2), ProductId::new(99))
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_toggle_unknown_product_is_not_found() {
        let store = MemoryStore::new();
        let result = FavoriteService::new(&store)
            .toggle(UserId::new(2), ProductId::new(99))
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }
}

//! Carts and favorites.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bazaar_core::cart::Quantity;
use bazaar_core::{CartId, CartItemId, FavoriteId, ProductId, UserId};

use super::PgStore;
use super::catalog::{PRODUCT_COLUMNS, ProductRow};
use crate::db::{CartStore, FavoriteStore, RepositoryError};
use crate::models::{Cart, CartItem, FavoriteEntry, Product};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    item_id: CartItemId,
    quantity: i32,
    added_at: DateTime<Utc>,
    #[sqlx(flatten)]
    product: ProductRow,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = quantity_from_db(row.quantity)?;
        Ok(Self {
            id: row.item_id,
            product: Product::from(row.product),
            quantity,
            added_at: row.added_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FavoriteRow {
    favorite_id: FavoriteId,
    favorited_at: DateTime<Utc>,
    #[sqlx(flatten)]
    product: ProductRow,
}

impl From<FavoriteRow> for FavoriteEntry {
    fn from(row: FavoriteRow) -> Self {
        Self {
            id: row.favorite_id,
            product: Product::from(row.product),
            created_at: row.favorited_at,
        }
    }
}

fn quantity_from_db(value: i32) -> Result<Quantity, RepositoryError> {
    u32::try_from(value)
        .ok()
        .and_then(Quantity::new)
        .ok_or_else(|| RepositoryError::DataCorruption(format!("invalid cart quantity {value}")))
}

fn quantity_to_db(quantity: Quantity) -> i32 {
    i32::try_from(quantity.get()).unwrap_or(i32::MAX)
}

impl PgStore {
    async fn touch_cart(&self, cart: CartId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE cart SET updated_at = now() WHERE id = $1")
            .bind(cart)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn get_or_create_cart(&self, user: UserId) -> Result<Cart, RepositoryError> {
        sqlx::query("INSERT INTO cart (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user)
            .execute(self.pool())
            .await?;
        let row: CartRow = sqlx::query_as(
            "SELECT id, user_id, created_at, updated_at FROM cart WHERE user_id = $1",
        )
        .bind(user)
        .fetch_one(self.pool())
        .await?;
        Ok(row.into())
    }

    async fn cart_items(&self, cart: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let sql = format!(
            "SELECT ci.id AS item_id, ci.quantity, ci.added_at, {PRODUCT_COLUMNS} \
             FROM cart_item ci JOIN product p ON p.id = ci.product_id \
             WHERE ci.cart_id = $1 ORDER BY ci.added_at, ci.id"
        );
        let rows: Vec<CartItemRow> = sqlx::query_as(&sql)
            .bind(cart)
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(CartItem::try_from).collect()
    }

    async fn add_to_cart(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, RepositoryError> {
        let (total,): (i32,) = sqlx::query_as(
            "INSERT INTO cart_item (cart_id, product_id, quantity) VALUES ($1, $2, $3) \
             ON CONFLICT (cart_id, product_id) DO UPDATE \
             SET quantity = LEAST(cart_item.quantity::BIGINT + EXCLUDED.quantity, 2147483647)::INTEGER \
             RETURNING quantity",
        )
        .bind(cart)
        .bind(product)
        .bind(quantity_to_db(quantity))
        .fetch_one(self.pool())
        .await?;
        self.touch_cart(cart).await?;
        quantity_from_db(total)
    }

    async fn set_cart_quantity(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let updated = sqlx::query(
            "UPDATE cart_item SET quantity = $3 WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart)
        .bind(product)
        .bind(quantity_to_db(quantity))
        .execute(self.pool())
        .await?;
        let found = updated.rows_affected() > 0;
        if found {
            self.touch_cart(cart).await?;
        }
        Ok(found)
    }

    async fn remove_from_cart(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let deleted = sqlx::query("DELETE FROM cart_item WHERE cart_id = $1 AND product_id = $2")
            .bind(cart)
            .bind(product)
            .execute(self.pool())
            .await?;
        let found = deleted.rows_affected() > 0;
        if found {
            self.touch_cart(cart).await?;
        }
        Ok(found)
    }
}

#[async_trait]
impl FavoriteStore for PgStore {
    async fn list_favorites(&self, user: UserId) -> Result<Vec<FavoriteEntry>, RepositoryError> {
        let sql = format!(
            "SELECT f.id AS favorite_id, f.created_at AS favorited_at, {PRODUCT_COLUMNS} \
             FROM favorite f JOIN product p ON p.id = f.product_id \
             WHERE f.user_id = $1 ORDER BY f.created_at DESC, f.id DESC"
        );
        let rows: Vec<FavoriteRow> = sqlx::query_as(&sql)
            .bind(user)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(FavoriteEntry::from).collect())
    }

    async fn favorite_product_ids(
        &self,
        user: UserId,
    ) -> Result<BTreeSet<ProductId>, RepositoryError> {
        let rows: Vec<(ProductId,)> =
            sqlx::query_as("SELECT product_id FROM favorite WHERE user_id = $1")
                .bind(user)
                .fetch_all(self.pool())
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn add_favorite(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let inserted = sqlx::query(
            "INSERT INTO favorite (user_id, product_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, product_id) DO NOTHING",
        )
        .bind(user)
        .bind(product)
        .execute(self.pool())
        .await?;
        Ok(inserted.rows_affected() > 0)
    }

    async fn remove_favorite(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let deleted = sqlx::query("DELETE FROM favorite WHERE user_id = $1 AND product_id = $2")
            .bind(user)
            .bind(product)
            .execute(self.pool())
            .await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn count_favorites(&self, user: UserId) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM favorite WHERE user_id = $1")
            .bind(user)
            .fetch_one(self.pool())
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

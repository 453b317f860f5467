//! Cart and favorites domain types.

use chrono::{DateTime, Utc};

use bazaar_core::cart::{CartLine, CartSummary, Quantity};
use bazaar_core::{CartId, CartItemId, FavoriteId, UserId};
use rust_decimal::Decimal;

use super::Product;

/// A user's cart. Each user has at most one, created on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One product line in a cart, with the product as it is now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub id: CartItemId,
    pub product: Product,
    pub quantity: Quantity,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    #[must_use]
    pub fn line(&self) -> CartLine {
        CartLine {
            product_id: self.product.id,
            unit_price: self.product.price,
            quantity: self.quantity,
        }
    }

    /// Current price times quantity.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.line().total_price()
    }
}

/// A cart with its lines, oldest line first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartContents {
    pub cart: Cart,
    pub items: Vec<CartItem>,
}

impl CartContents {
    /// Item count and total, from current product prices.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        let lines: Vec<CartLine> = self.items.iter().map(CartItem::line).collect();
        CartSummary::of(&lines)
    }
}

/// A favorited product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteEntry {
    pub id: FavoriteId,
    pub product: Product,
    pub created_at: DateTime<Utc>,
}

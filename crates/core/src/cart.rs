//! Cart aggregation.
//!
//! Totals are recomputed from the lines on every call; nothing is cached.

use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Quantity of a cart line. Never zero: a line at zero is deleted instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// One item.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Largest quantity a single line may hold (fits `INTEGER`).
    pub const MAX: u32 = i32::MAX as u32;

    /// Create a quantity; `None` for zero or for values beyond [`Quantity::MAX`].
    #[must_use]
    pub fn new(value: u32) -> Option<Self> {
        if value > Self::MAX {
            return None;
        }
        NonZeroU32::new(value).map(Self)
    }

    /// The quantity as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Add another quantity, saturating at [`Quantity::MAX`].
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        let sum = self.get().saturating_add(other.get()).min(Self::MAX);
        Self::new(sum).unwrap_or(self)
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

/// Outcome of setting a line to a requested quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUpdate {
    /// Keep the line with this quantity.
    Set(Quantity),
    /// Requested zero: delete the line.
    Remove,
}

impl QuantityUpdate {
    /// Interpret a requested quantity. Values above the maximum are capped.
    #[must_use]
    pub fn from_requested(value: u32) -> Self {
        if value == 0 {
            return Self::Remove;
        }
        Quantity::new(value.min(Quantity::MAX)).map_or(Self::Remove, Self::Set)
    }
}

/// One product in a cart, with the product's current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub unit_price: Price,
    pub quantity: Quantity,
}

impl CartLine {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.unit_price.times(self.quantity.get())
    }
}

/// Cart totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CartSummary {
    /// Sum of line quantities.
    pub total_items: u64,
    /// Sum of line totals.
    pub total_price: Decimal,
}

impl CartSummary {
    /// Aggregate a set of lines.
    pub fn of<'a>(lines: impl IntoIterator<Item = &'a CartLine>) -> Self {
        lines
            .into_iter()
            .fold(Self::default(), |acc, line| Self {
                total_items: acc.total_items + u64::from(line.quantity.get()),
                total_price: acc.total_price + line.total_price(),
            })
    }

    /// Whether the cart has no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_items == 0
    }
}

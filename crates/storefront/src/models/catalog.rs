//! Catalog domain types: categories, shops, products and their images.

use chrono::{DateTime, Utc};

use bazaar_core::catalog::{CategoryNode, FilterFields, SortFields};
use bazaar_core::geo::Coordinates;
use bazaar_core::{CategoryId, Price, ProductId, ProductImageId, ShopId, UserId};

/// A product category. Categories form a forest through `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// The part of the category the tree code needs.
    #[must_use]
    pub fn node(&self) -> CategoryNode {
        CategoryNode::new(self.id, self.parent_id, self.name.clone())
    }
}

/// Data for inserting a category.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub parent_id: Option<CategoryId>,
}

/// A physical shop run by one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Shop {
    pub id: ShopId,
    pub name: String,
    pub address: String,
    /// Empty when not provided.
    pub phone: String,
    /// Free text, e.g. "Mon-Fri 9:00-21:00". Empty when not provided.
    pub opening_hours: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Shop {
    /// Map position, when both coordinates are set.
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_optional(self.latitude, self.longitude)
    }

    /// `name - address`, as shown in shop pickers.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.name, self.address)
    }
}

/// Editable shop fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShopInput {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub opening_hours: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub description: String,
    /// Media-relative path of the main image.
    pub image: Option<String>,
    pub price: Price,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    /// Inactive products are hidden from the public catalog.
    pub is_active: bool,
    /// Shops selling this product, ascending.
    pub shop_ids: Vec<ShopId>,
}

impl Product {
    #[must_use]
    pub fn filter_fields(&self) -> FilterFields<'_> {
        FilterFields {
            name: &self.name,
            description: &self.description,
            category: self.category_id,
            shops: &self.shop_ids,
            price: self.price,
            is_active: self.is_active,
        }
    }

    #[must_use]
    pub fn sort_fields(&self) -> SortFields<'_> {
        SortFields {
            id: self.id.as_i32(),
            name: &self.name,
            price: self.price,
            created_at: self.created_at,
        }
    }
}

/// Editable product fields. The main image is handled separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub description: String,
    pub price: Price,
    pub is_active: bool,
    pub shop_ids: Vec<ShopId>,
}

/// An additional gallery image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    /// Media-relative path.
    pub image: String,
    /// Display position, ascending.
    pub order: i32,
    pub created_at: DateTime<Utc>,
}

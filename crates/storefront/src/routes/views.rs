//! Display data shared by several templates.

use std::collections::BTreeSet;

use bazaar_core::catalog::{CategoryIndex, SortKey};
use bazaar_core::{CategoryId, Price, ProductId, ShopId};

use crate::models::{Product, Shop};
use crate::services::media::media_url;

/// A product tile in lists, the cart, and favorites.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub is_active: bool,
    pub is_favorite: bool,
}

impl ProductCard {
    pub fn new(product: &Product, index: &CategoryIndex, favorites: &BTreeSet<ProductId>) -> Self {
        Self::with_category(
            product,
            product.category_id.and_then(|id| index.display_name(id)),
            favorites.contains(&product.id),
        )
    }

    pub fn with_category(product: &Product, category: Option<String>, is_favorite: bool) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            image_url: product.image.as_deref().map(media_url),
            category,
            is_active: product.is_active,
            is_favorite,
        }
    }
}

/// An `<option>` in a select box.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Category options indented by depth, in sidebar order.
pub fn category_options(index: &CategoryIndex, selected: &[CategoryId]) -> Vec<SelectOption> {
    index
        .flatten()
        .into_iter()
        .map(|(id, depth, name)| SelectOption {
            value: id.to_string(),
            label: format!("{}{name}", "\u{2014} ".repeat(depth)),
            selected: selected.contains(&id),
        })
        .collect()
}

/// Shop options labelled `name - address`.
pub fn shop_options(shops: &[Shop], selected: &[ShopId]) -> Vec<SelectOption> {
    shops
        .iter()
        .map(|shop| SelectOption {
            value: shop.id.to_string(),
            label: shop.display_name(),
            selected: selected.contains(&shop.id),
        })
        .collect()
}

pub fn sort_options(current: SortKey) -> Vec<SelectOption> {
    SortKey::ALL
        .iter()
        .map(|key| SelectOption {
            value: key.as_param().to_owned(),
            label: key.label().to_owned(),
            selected: *key == current,
        })
        .collect()
}

/// A shop row with its distance when known.
#[derive(Debug, Clone)]
pub struct ShopView {
    pub id: ShopId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub opening_hours: String,
    pub coordinates: Option<String>,
    pub distance_km: Option<String>,
    pub can_edit: bool,
}

impl ShopView {
    pub fn new(shop: &Shop) -> Self {
        Self {
            id: shop.id,
            name: shop.name.clone(),
            address: shop.address.clone(),
            phone: shop.phone.clone(),
            opening_hours: shop.opening_hours.clone(),
            coordinates: shop
                .coordinates()
                .map(|c| format!("{:.6}, {:.6}", c.latitude(), c.longitude())),
            distance_km: None,
            can_edit: false,
        }
    }

    #[must_use]
    pub fn with_distance(mut self, km: f64) -> Self {
        self.distance_km = Some(format!("{km:.2}"));
        self
    }

    #[must_use]
    pub const fn editable(mut self, can_edit: bool) -> Self {
        self.can_edit = can_edit;
        self
    }
}

#[cfg(test)]
mod tests {
    use bazaar_core::catalog::CategoryNode;

    use super::*;

    #[test]
    fn test_category_options_indent_children() {
        let index = CategoryIndex::new([
            CategoryNode::new(CategoryId::new(1), None, "Electronics"),
            CategoryNode::new(CategoryId::new(2), Some(CategoryId::new(1)), "Phones"),
        ]);
        let options = category_options(&index, &[CategoryId::new(2)]);
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].label, "Electronics");
        assert!(!options[0].selected);
        assert_eq!(options[1].label, "\u{2014} Phones");
        assert!(options[1].selected);
    }

    #[test]
    fn test_sort_options_mark_current() {
        let options = sort_options(SortKey::parse(Some("price")));
        assert_eq!(options.iter().filter(|o| o.selected).count(), 1);
        assert!(options.iter().any(|o| o.selected && o.value == "price"));
    }
}

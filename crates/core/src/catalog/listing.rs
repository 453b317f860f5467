//! Product listing: text search, filters, sort order, and pagination.
//!
//! The storefront parses query-string parameters into a [`ListingFilter`],
//! a [`SortKey`], and a requested page; the repository applies them.
//! Nothing here ranks results: matching is a plain case-insensitive
//! substring test.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{CategoryId, Price, ShopId};

/// Products per listing page.
pub const PAGE_SIZE: u32 = 6;

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum SortKey {
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
    OldestFirst,
    #[default]
    NewestFirst,
}

impl SortKey {
    /// All sort keys in the order they are offered in the UI.
    pub const ALL: [Self; 6] = [
        Self::NewestFirst,
        Self::OldestFirst,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::NameAsc,
        Self::NameDesc,
    ];

    /// Parse a field name (`price`, `-price`, ...). Unknown values fall back
    /// to newest first.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("name") => Self::NameAsc,
            Some("-name") => Self::NameDesc,
            Some("price") => Self::PriceAsc,
            Some("-price") => Self::PriceDesc,
            Some("created_at") => Self::OldestFirst,
            _ => Self::NewestFirst,
        }
    }

    /// The query-string value for this key.
    #[must_use]
    pub const fn as_param(self) -> &'static str {
        match self {
            Self::NameAsc => "name",
            Self::NameDesc => "-name",
            Self::PriceAsc => "price",
            Self::PriceDesc => "-price",
            Self::OldestFirst => "created_at",
            Self::NewestFirst => "-created_at",
        }
    }

    /// Label for the sort dropdown.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NameAsc => "Name A-Z",
            Self::NameDesc => "Name Z-A",
            Self::PriceAsc => "Price: low to high",
            Self::PriceDesc => "Price: high to low",
            Self::OldestFirst => "Oldest first",
            Self::NewestFirst => "Newest first",
        }
    }

    /// Compare two products under this order. Ties break on id so pages are stable.
    #[must_use]
    pub fn compare(self, a: &SortFields<'_>, b: &SortFields<'_>) -> std::cmp::Ordering {
        let primary = match self {
            Self::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Self::NameDesc => b.name.to_lowercase().cmp(&a.name.to_lowercase()),
            Self::PriceAsc => a.price.cmp(&b.price),
            Self::PriceDesc => b.price.cmp(&a.price),
            Self::OldestFirst => a.created_at.cmp(&b.created_at),
            Self::NewestFirst => b.created_at.cmp(&a.created_at),
        };
        let tie = if matches!(self, Self::NewestFirst | Self::NameDesc | Self::PriceDesc) {
            b.id.cmp(&a.id)
        } else {
            a.id.cmp(&b.id)
        };
        primary.then(tie)
    }
}

/// The fields a [`SortKey`] looks at.
#[derive(Debug, Clone, Copy)]
pub struct SortFields<'a> {
    pub id: i32,
    pub name: &'a str,
    pub price: Price,
    pub created_at: DateTime<Utc>,
}

/// Filters applied to the product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    /// Case-insensitive substring matched against name or description.
    pub text: Option<String>,
    /// Allowed category ids (the selected category and its descendants).
    pub categories: Option<BTreeSet<CategoryId>>,
    /// Only products sold at this shop.
    pub shop: Option<ShopId>,
    /// Inclusive lower price bound.
    pub min_price: Option<Price>,
    /// Inclusive upper price bound.
    pub max_price: Option<Price>,
    /// Include products with `is_active = false` (management pages).
    pub include_inactive: bool,
}

/// The fields a [`ListingFilter`] looks at.
#[derive(Debug, Clone, Copy)]
pub struct FilterFields<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub category: Option<CategoryId>,
    pub shops: &'a [ShopId],
    pub price: Price,
    pub is_active: bool,
}

impl ListingFilter {
    /// Set the search text; blank input clears it.
    #[must_use]
    pub fn with_text(mut self, text: Option<&str>) -> Self {
        self.text = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned);
        self
    }

    /// Whether a product passes every filter.
    #[must_use]
    pub fn matches(&self, product: &FilterFields<'_>) -> bool {
        if !self.include_inactive && !product.is_active {
            return false;
        }
        if let Some(text) = &self.text
            && !(contains_ignore_case(product.name, text)
                || contains_ignore_case(product.description, text))
        {
            return false;
        }
        if let Some(allowed) = &self.categories
            && !product.category.is_some_and(|c| allowed.contains(&c))
        {
            return false;
        }
        if let Some(shop) = self.shop
            && !product.shops.contains(&shop)
        {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        true
    }
}

/// Unicode-aware case-insensitive substring test.
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// A resolved page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// 1-based page number, always within `1..=num_pages`.
    pub page: u32,
    /// Number of pages; at least 1 even for an empty listing.
    pub num_pages: u32,
    /// Total matching items.
    pub total: u64,
    /// Items per page.
    pub per_page: u32,
}

impl Pagination {
    /// Resolve a requested page number against a total count.
    ///
    /// Non-numeric or non-positive input selects page 1; a page past the end
    /// selects the last page.
    #[must_use]
    pub fn resolve(requested: Option<&str>, total: u64, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let pages = total.div_ceil(u64::from(per_page)).max(1);
        let num_pages = u32::try_from(pages).unwrap_or(u32::MAX);
        let wanted = requested
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        Self {
            page: wanted.min(num_pages),
            num_pages,
            total,
            per_page,
        }
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    /// Rows to take.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.per_page
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.num_pages
    }

    #[must_use]
    pub const fn previous_page(&self) -> u32 {
        self.page.saturating_sub(1)
    }

    #[must_use]
    pub const fn next_page(&self) -> u32 {
        self.page.saturating_add(1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn price(cents: i64) -> Price {
        Price::from_cents(cents).unwrap()
    }

    fn facts<'a>(name: &'a str, description: &'a str, shops: &'a [ShopId]) -> FilterFields<'a> {
        FilterFields {
            name,
            description,
            category: Some(CategoryId::new(2)),
            shops,
            price: price(10_000),
            is_active: true,
        }
    }

    #[test]
    fn test_sort_key_roundtrip_and_fallback() {
        for key in SortKey::ALL {
            assert_eq!(SortKey::parse(Some(key.as_param())), key);
        }
        assert_eq!(SortKey::parse(Some("; DROP TABLE")), SortKey::NewestFirst);
        assert_eq!(SortKey::parse(None), SortKey::NewestFirst);
    }

    #[test]
    fn test_sort_compare() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let cheap = SortFields { id: 1, name: "banana", price: price(100), created_at: t1 };
        let dear = SortFields { id: 2, name: "Apple", price: price(900), created_at: t0 };

        let mut rows = [cheap, dear];
        rows.sort_by(|a, b| SortKey::NameAsc.compare(a, b));
        assert_eq!(rows[0].id, 2);
        rows.sort_by(|a, b| SortKey::PriceAsc.compare(a, b));
        assert_eq!(rows[0].id, 1);
        rows.sort_by(|a, b| SortKey::PriceDesc.compare(a, b));
        assert_eq!(rows[0].id, 2);
        rows.sort_by(|a, b| SortKey::NewestFirst.compare(a, b));
        assert_eq!(rows[0].id, 1);
        rows.sort_by(|a, b| SortKey::OldestFirst.compare(a, b));
        assert_eq!(rows[0].id, 2);
    }

    #[test]
    fn test_text_matches_name_or_description_case_insensitive() {
        let filter = ListingFilter::default().with_text(Some("  PHONE "));
        assert!(filter.matches(&facts("Smartphone X", "", &[])));
        assert!(filter.matches(&facts("Gadget", "works as a phone", &[])));
        assert!(!filter.matches(&facts("Gadget", "a tablet", &[])));
    }

    #[test]
    fn test_text_matching_is_unicode_aware() {
        let filter = ListingFilter::default().with_text(Some("МОЛОКО"));
        assert!(filter.matches(&facts("Молоко 3.2%", "", &[])));
    }

    #[test]
    fn test_blank_text_is_ignored() {
        let filter = ListingFilter::default().with_text(Some("   "));
        assert_eq!(filter.text, None);
    }

    #[test]
    fn test_category_filter() {
        let mut filter = ListingFilter {
            categories: Some(BTreeSet::from([CategoryId::new(1), CategoryId::new(2)])),
            ..ListingFilter::default()
        };
        assert!(filter.matches(&facts("a", "", &[])));
        filter.categories = Some(BTreeSet::from([CategoryId::new(3)]));
        assert!(!filter.matches(&facts("a", "", &[])));

        let mut uncategorized = facts("a", "", &[]);
        uncategorized.category = None;
        assert!(!filter.matches(&uncategorized));
    }

    #[test]
    fn test_shop_and_price_bounds_inclusive() {
        let shops = [ShopId::new(4)];
        let filter = ListingFilter {
            shop: Some(ShopId::new(4)),
            min_price: Some(price(10_000)),
            max_price: Some(price(10_000)),
            ..ListingFilter::default()
        };
        assert!(filter.matches(&facts("a", "", &shops)));
        assert!(!filter.matches(&facts("a", "", &[])));

        let too_cheap = ListingFilter {
            min_price: Some(price(10_001)),
            ..ListingFilter::default()
        };
        assert!(!too_cheap.matches(&facts("a", "", &shops)));
    }

    #[test]
    fn test_inactive_hidden_unless_requested() {
        let mut product = facts("a", "", &[]);
        product.is_active = false;
        assert!(!ListingFilter::default().matches(&product));
        let manage = ListingFilter {
            include_inactive: true,
            ..ListingFilter::default()
        };
        assert!(manage.matches(&product));
    }

    #[test]
    fn test_pagination_basic() {
        let page = Pagination::resolve(Some("2"), 13, PAGE_SIZE);
        assert_eq!(page.num_pages, 3);
        assert_eq!(page.page, 2);
        assert_eq!(page.offset(), 6);
        assert_eq!(page.limit(), 6);
        assert!(page.has_previous());
        assert!(page.has_next());
    }

    #[test]
    fn test_pagination_clamps() {
        assert_eq!(Pagination::resolve(Some("99"), 13, PAGE_SIZE).page, 3);
        assert_eq!(Pagination::resolve(Some("0"), 13, PAGE_SIZE).page, 1);
        assert_eq!(Pagination::resolve(Some("-1"), 13, PAGE_SIZE).page, 1);
        assert_eq!(Pagination::resolve(Some("two"), 13, PAGE_SIZE).page, 1);
        assert_eq!(Pagination::resolve(None, 13, PAGE_SIZE).page, 1);
    }

    #[test]
    fn test_pagination_empty_has_one_page() {
        let page = Pagination::resolve(Some("5"), 0, PAGE_SIZE);
        assert_eq!(page.page, 1);
        assert_eq!(page.num_pages, 1);
        assert_eq!(page.offset(), 0);
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn test_pagination_exact_multiple() {
        assert_eq!(Pagination::resolve(None, 12, PAGE_SIZE).num_pages, 2);
    }
}

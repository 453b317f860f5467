//! Catalog listing and product detail.
//!
//! Turns raw query-string values into a [`ListingFilter`], expands the
//! selected category to its whole subtree, counts, clamps the page, and
//! fetches one page from the repository.

use serde::Deserialize;

use bazaar_core::catalog::{CategoryIndex, ListingFilter, PAGE_SIZE, Pagination, SortKey};
use bazaar_core::{CategoryId, Price, ProductId, ShopId};

use crate::db::{Repository, RepositoryError};
use crate::models::{Product, ProductImage, Shop};

/// Query-string parameters of the product list. Everything is optional and
/// malformed values are ignored rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub shop: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

impl ListingQuery {
    /// Selected category, if the parameter is a valid id.
    #[must_use]
    pub fn category_id(&self) -> Option<CategoryId> {
        parse_param(self.category.as_deref())
    }

    /// Selected shop, if the parameter is a valid id.
    #[must_use]
    pub fn shop_id(&self) -> Option<ShopId> {
        parse_param(self.shop.as_deref())
    }

    #[must_use]
    pub fn sort_key(&self) -> SortKey {
        SortKey::parse(self.sort.as_deref())
    }

    /// Build the filter. The category expands to itself plus all descendants;
    /// an id missing from the index matches no product.
    #[must_use]
    pub fn filter(&self, index: &CategoryIndex) -> ListingFilter {
        ListingFilter {
            categories: self.category_id().map(|id| index.descendants_of(id)),
            shop: self.shop_id(),
            min_price: parse_param::<Price>(self.min_price.as_deref()),
            max_price: parse_param::<Price>(self.max_price.as_deref()),
            ..ListingFilter::default()
        }
        .with_text(self.q.as_deref())
    }
}

fn parse_param<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

/// One resolved page of the listing.
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
    pub sort: SortKey,
}

/// Everything the product page shows.
#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub product: Product,
    pub images: Vec<ProductImage>,
    /// `Parent → Child` path of the product's category.
    pub category: Option<String>,
    pub shops: Vec<Shop>,
}

/// Catalog read operations.
pub struct CatalogService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// Load the category forest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the categories cannot be read.
    pub async fn category_index(&self) -> Result<CategoryIndex, RepositoryError> {
        let categories = self.repo.list_categories().await?;
        Ok(CategoryIndex::new(categories.iter().map(|c| c.node())))
    }

    /// Run the listing pipeline.
    ///
    /// `include_inactive` is set for management pages.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on storage failures.
    pub async fn list(
        &self,
        query: &ListingQuery,
        index: &CategoryIndex,
        include_inactive: bool,
    ) -> Result<ListingPage, RepositoryError> {
        let filter = ListingFilter {
            include_inactive,
            ..query.filter(index)
        };
        let sort = query.sort_key();
        let total = self.repo.count_products(&filter).await?;
        let pagination = Pagination::resolve(query.page.as_deref(), total, PAGE_SIZE);
        let products = self
            .repo
            .search_products(&filter, sort, pagination.offset(), pagination.limit())
            .await?;

        tracing::debug!(
            total,
            page = pagination.page,
            num_pages = pagination.num_pages,
            "Product listing resolved"
        );

        Ok(ListingPage {
            products,
            pagination,
            sort,
        })
    }

    /// Product page data. Inactive products are only visible to managers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on storage failures.
    pub async fn detail(
        &self,
        id: ProductId,
        viewer_can_manage: bool,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        let Some(product) = self.repo.get_product(id).await? else {
            return Ok(None);
        };
        if !product.is_active && !viewer_can_manage {
            return Ok(None);
        }

        let images = self.repo.list_product_images(id).await?;
        let category = match product.category_id {
            Some(category_id) => self.category_index().await?.display_name(category_id),
            None => None,
        };
        let mut shops = Vec::with_capacity(product.shop_ids.len());
        for shop_id in &product.shop_ids {
            if let Some(shop) = self.repo.get_shop(*shop_id).await? {
                shops.push(shop);
            }
        }

        Ok(Some(ProductDetail {
            product,
            images,
            category,
            shops,
        }))
    }
}

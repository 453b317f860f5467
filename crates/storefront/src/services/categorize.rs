//! Bulk category maintenance behind `bz-cli categories`.

use bazaar_core::catalog::classify::{FALLBACK_CATEGORY, classify};
use bazaar_core::catalog::{ListingFilter, SortKey};
use bazaar_core::{CategoryId, ProductId};

use crate::db::{CategoryStore, ProductStore, Repository, RepositoryError};
use crate::models::{Category, NewCategory, Product};

/// Outcome of [`assign_categories`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssignmentReport {
    /// `(product name, category name)` for every keyword match.
    pub matched: Vec<(String, String)>,
    /// Products that went to the fallback category.
    pub fallback: usize,
}

impl AssignmentReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.matched.len() + self.fallback
    }
}

/// Every product, newest first, inactive ones included.
///
/// # Errors
///
/// Returns `RepositoryError` on storage failures.
pub async fn all_products(repo: &dyn Repository) -> Result<Vec<Product>, RepositoryError> {
    let filter = ListingFilter {
        include_inactive: true,
        ..ListingFilter::default()
    };
    let total = repo.count_products(&filter).await?;
    let limit = u32::try_from(total).unwrap_or(u32::MAX);
    repo.search_products(&filter, SortKey::default(), 0, limit)
        .await
}

/// File every uncategorized product under the first keyword category that
/// exists, and the rest under the fallback category (created if missing).
///
/// # Errors
///
/// Returns `RepositoryError` on storage failures.
pub async fn assign_categories(repo: &dyn Repository) -> Result<AssignmentReport, RepositoryError> {
    let categories = repo.list_categories().await?;
    let by_name = |name: &str| -> Option<CategoryId> {
        categories.iter().find(|c| c.name == name).map(|c| c.id)
    };

    let mut report = AssignmentReport::default();
    let mut remaining: Vec<ProductId> = Vec::new();

    for product in all_products(repo).await? {
        if product.category_id.is_some() {
            continue;
        }
        let target = classify(&product.name, |name| by_name(name).is_some())
            .and_then(|name| by_name(name).map(|id| (name, id)));
        match target {
            Some((name, id)) => {
                repo.set_product_category(product.id, Some(id)).await?;
                tracing::info!(product = %product.name, category = name, "Category assigned");
                report.matched.push((product.name, name.to_owned()));
            }
            None => remaining.push(product.id),
        }
    }

    if !remaining.is_empty() {
        let fallback = fallback_category(repo).await?;
        for id in &remaining {
            repo.set_product_category(*id, Some(fallback.id)).await?;
        }
        tracing::info!(
            count = remaining.len(),
            category = FALLBACK_CATEGORY,
            "Fallback category assigned"
        );
        report.fallback = remaining.len();
    }

    Ok(report)
}

async fn fallback_category(repo: &dyn Repository) -> Result<Category, RepositoryError> {
    if let Some(existing) = repo.find_category_by_name(FALLBACK_CATEGORY).await? {
        return Ok(existing);
    }
    repo.create_category(NewCategory {
        name: FALLBACK_CATEGORY.to_owned(),
        parent_id: None,
    })
    .await
}

/// Snapshot printed by `bz-cli categories debug`.
#[derive(Debug, Clone)]
pub struct CategoryReport {
    /// Product name with `id:name` of its category, or `None`.
    pub products: Vec<(String, Option<String>)>,
    pub with_category: usize,
    pub without_category: usize,
    pub categories: Vec<Category>,
}

/// Collect the category debug report.
///
/// # Errors
///
/// Returns `RepositoryError` on storage failures.
pub async fn category_report(repo: &dyn Repository) -> Result<CategoryReport, RepositoryError> {
    let categories = repo.list_categories().await?;
    let products = all_products(repo).await?;

    let rows: Vec<(String, Option<String>)> = products
        .iter()
        .map(|p| {
            let category = p.category_id.map(|id| {
                categories
                    .iter()
                    .find(|c| c.id == id)
                    .map_or_else(|| format!("{id}:?"), |c| format!("{id}:{}", c.name))
            });
            (p.name.clone(), category)
        })
        .collect();
    let with_category = rows.iter().filter(|(_, c)| c.is_some()).count();

    Ok(CategoryReport {
        without_category: rows.len() - with_category,
        products: rows,
        with_category,
        categories,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{Price, UserId};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::ProductInput;

    async fn product(store: &MemoryStore, name: &str, category: Option<CategoryId>) -> ProductId {
        store
            .create_product(
                UserId::new(1),
                ProductInput {
                    name: name.to_owned(),
                    category_id: category,
                    description: String::new(),
                    price: Price::from_cents(100).unwrap(),
                    is_active: true,
                    shop_ids: vec![],
                },
                None,
            )
            .await
            .unwrap()
            .id
    }

    async fn category(store: &MemoryStore, name: &str) -> CategoryId {
        store
            .create_category(NewCategory {
                name: name.to_owned(),
                parent_id: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_assign_uses_keywords_then_fallback() {
        let store = MemoryStore::new();
        let electronics = category(&store, "Electronics").await;
        let home = category(&store, "Home goods").await;

        let phone = product(&store, "Samsung Galaxy S24", None).await;
        let sofa = product(&store, "Corner sofa", None).await;
        let mystery = product(&store, "Mystery box", None).await;
        let tyres = product(&store, "Winter tires", None).await;
        let kept = product(&store, "Laptop stand", Some(home)).await;

        let report = assign_categories(&store).await.unwrap();
        assert_eq!(report.matched.len(), 2);
        // Car accessories does not exist, so the tyres fall through.
        assert_eq!(report.fallback, 2);
        assert_eq!(report.total(), 4);

        let category_of = |id| {
            let store = &store;
            async move { store.get_product(id).await.unwrap().unwrap().category_id }
        };
        assert_eq!(category_of(phone).await, Some(electronics));
        assert_eq!(category_of(sofa).await, Some(home));
        assert_eq!(category_of(kept).await, Some(home));

        let fallback = store
            .find_category_by_name(FALLBACK_CATEGORY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(category_of(mystery).await, Some(fallback.id));
        assert_eq!(category_of(tyres).await, Some(fallback.id));
    }

    #[tokio::test]
    async fn test_assign_reuses_existing_fallback() {
        let store = MemoryStore::new();
        let other = category(&store, FALLBACK_CATEGORY).await;
        let id = product(&store, "Mystery box", None).await;

        assign_categories(&store).await.unwrap();
        assert_eq!(
            store.get_product(id).await.unwrap().unwrap().category_id,
            Some(other)
        );
        assert_eq!(store.list_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_category_report_counts() {
        let store = MemoryStore::new();
        let food = category(&store, "Groceries").await;
        product(&store, "Milk", Some(food)).await;
        product(&store, "Thing", None).await;

        let report = category_report(&store).await.unwrap();
        assert_eq!(report.with_category, 1);
        assert_eq!(report.without_category, 1);
        assert_eq!(report.categories.len(), 1);
        assert!(
            report
                .products
                .iter()
                .any(|(name, c)| name == "Milk" && c.as_deref() == Some(&*format!("{food}:Groceries")))
        );
    }
}

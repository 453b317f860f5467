//! Categories, products and gallery images.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use bazaar_core::catalog::{ListingFilter, SortKey};
use bazaar_core::{CategoryId, Price, ProductId, ProductImageId, ShopId, UserId};

use super::PgStore;
use crate::db::{CategoryStore, ProductStore, RepositoryError, conflict_on_unique};
use crate::models::{Category, NewCategory, Product, ProductImage, ProductInput};

/// Product columns, aliased `p`, with the linked shop ids aggregated.
pub(super) const PRODUCT_COLUMNS: &str = "p.id, p.name, p.category_id, p.description, p.image, \
     p.price, p.created_by, p.created_at, p.is_active, \
     ARRAY(SELECT ps.shop_id FROM product_shop ps WHERE ps.product_id = p.id ORDER BY ps.shop_id) \
     AS shop_ids";

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    parent_id: Option<CategoryId>,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            parent_id: row.parent_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct ProductRow {
    id: ProductId,
    name: String,
    category_id: Option<CategoryId>,
    description: String,
    image: Option<String>,
    price: Price,
    created_by: UserId,
    created_at: DateTime<Utc>,
    is_active: bool,
    shop_ids: Vec<i32>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            category_id: row.category_id,
            description: row.description,
            image: row.image.filter(|path| !path.is_empty()),
            price: row.price,
            created_by: row.created_by,
            created_at: row.created_at,
            is_active: row.is_active,
            shop_ids: row.shop_ids.into_iter().map(ShopId::new).collect(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductImageRow {
    id: ProductImageId,
    product_id: ProductId,
    image: String,
    order: i32,
    created_at: DateTime<Utc>,
}

impl From<ProductImageRow> for ProductImage {
    fn from(row: ProductImageRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            image: row.image,
            order: row.order,
            created_at: row.created_at,
        }
    }
}

const IMAGE_COLUMNS: &str = r#"id, product_id, image, "order", created_at"#;

/// Append the `WHERE` clause for a listing filter.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ListingFilter) {
    qb.push(" WHERE TRUE");
    if !filter.include_inactive {
        qb.push(" AND p.is_active");
    }
    if let Some(text) = &filter.text {
        let pattern = format!("%{}%", escape_like(text));
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(categories) = &filter.categories {
        let ids: Vec<i32> = categories.iter().map(|c| c.as_i32()).collect();
        qb.push(" AND p.category_id = ANY(").push_bind(ids).push(")");
    }
    if let Some(shop) = filter.shop {
        qb.push(" AND EXISTS (SELECT 1 FROM product_shop ps WHERE ps.product_id = p.id AND ps.shop_id = ")
            .push_bind(shop)
            .push(")");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
}

/// `ORDER BY` body for a sort key; ties break on id like [`SortKey::compare`].
const fn order_by(sort: SortKey) -> &'static str {
    match sort {
        SortKey::NameAsc => "LOWER(p.name) ASC, p.id ASC",
        SortKey::NameDesc => "LOWER(p.name) DESC, p.id DESC",
        SortKey::PriceAsc => "p.price ASC, p.id ASC",
        SortKey::PriceDesc => "p.price DESC, p.id DESC",
        SortKey::OldestFirst => "p.created_at ASC, p.id ASC",
        SortKey::NewestFirst => "p.created_at DESC, p.id DESC",
    }
}

/// Escape `LIKE` metacharacters so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, name, parent_id, created_at FROM category \
             ORDER BY parent_id NULLS FIRST, name, id",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, name, parent_id, created_at FROM category WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.map(Category::from))
    }

    async fn find_category_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "SELECT id, name, parent_id, created_at FROM category WHERE name = $1 ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Category::from))
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category, RepositoryError> {
        let row: CategoryRow = sqlx::query_as(
            "INSERT INTO category (name, parent_id) VALUES ($1, $2) \
             RETURNING id, name, parent_id, created_at",
        )
        .bind(&category.name)
        .bind(category.parent_id)
        .fetch_one(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "category"))?;
        Ok(row.into())
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn search_products(
        &self,
        filter: &ListingFilter,
        sort: SortKey,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM product p"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY ")
            .push(order_by(sort))
            .push(" LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(offset).unwrap_or(i64::MAX));

        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(self.pool()).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn count_products(&self, filter: &ListingFilter) -> Result<u64, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM product p");
        push_filter(&mut qb, filter);
        let (count,): (i64,) = qb.build_query_as().fetch_one(self.pool()).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product p WHERE p.id = $1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Product::from))
    }

    async fn create_product(
        &self,
        created_by: UserId,
        product: ProductInput,
        image: Option<String>,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let (id,): (ProductId,) = sqlx::query_as(
            "INSERT INTO product (name, category_id, description, image, price, created_by, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(&product.name)
        .bind(product.category_id)
        .bind(&product.description)
        .bind(image)
        .bind(product.price)
        .bind(created_by)
        .bind(product.is_active)
        .fetch_one(&mut *tx)
        .await?;

        link_shops(&mut tx, id, &product.shop_ids).await?;
        tx.commit().await?;

        self.get_product(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn update_product(
        &self,
        id: ProductId,
        product: ProductInput,
        image: Option<String>,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let updated = sqlx::query(
            "UPDATE product SET name = $2, category_id = $3, description = $4, price = $5, \
             is_active = $6, image = COALESCE($7, image) WHERE id = $1",
        )
        .bind(id)
        .bind(&product.name)
        .bind(product.category_id)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.is_active)
        .bind(image)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM product_shop WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_shops(&mut tx, id, &product.shop_ids).await?;
        tx.commit().await?;

        self.get_product(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn delete_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let Some(product) = self.get_product(id).await? else {
            return Ok(None);
        };
        // Images, shop links, cart lines and favorites cascade.
        sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(Some(product))
    }

    async fn list_product_images(
        &self,
        id: ProductId,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let sql = format!(
            r#"SELECT {IMAGE_COLUMNS} FROM product_image WHERE product_id = $1 ORDER BY "order", id"#
        );
        let rows: Vec<ProductImageRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(ProductImage::from).collect())
    }

    async fn add_product_images(
        &self,
        id: ProductId,
        images: Vec<String>,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let mut tx = self.pool().begin().await?;
        let (next,): (i32,) = sqlx::query_as(
            r#"SELECT COALESCE(MAX("order") + 1, 0) FROM product_image WHERE product_id = $1"#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let sql = format!(
            r#"INSERT INTO product_image (product_id, image, "order") VALUES ($1, $2, $3) RETURNING {IMAGE_COLUMNS}"#
        );
        let mut added = Vec::with_capacity(images.len());
        for (position, image) in (next..).zip(images) {
            let row: ProductImageRow = sqlx::query_as(&sql)
                .bind(id)
                .bind(image)
                .bind(position)
                .fetch_one(&mut *tx)
                .await?;
            added.push(row.into());
        }
        tx.commit().await?;
        Ok(added)
    }

    async fn set_product_category(
        &self,
        id: ProductId,
        category: Option<CategoryId>,
    ) -> Result<(), RepositoryError> {
        let updated = sqlx::query("UPDATE product SET category_id = $2 WHERE id = $1")
            .bind(id)
            .bind(category)
            .execute(self.pool())
            .await?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn link_shops(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    product: ProductId,
    shops: &[ShopId],
) -> Result<(), RepositoryError> {
    if shops.is_empty() {
        return Ok(());
    }
    let ids: Vec<i32> = shops.iter().map(|s| s.as_i32()).collect();
    sqlx::query(
        "INSERT INTO product_shop (product_id, shop_id) \
         SELECT $1, s.id FROM shop s WHERE s.id = ANY($2) ON CONFLICT DO NOTHING",
    )
    .bind(product)
    .bind(ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("phone"), "phone");
    }

    #[test]
    fn test_filter_sql_binds_only_set_fields() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM product p");
        push_filter(&mut qb, &ListingFilter::default());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM product p WHERE TRUE AND p.is_active");

        let filter = ListingFilter {
            shop: Some(ShopId::new(3)),
            include_inactive: true,
            ..ListingFilter::default()
        }
        .with_text(Some("milk"));
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM product p");
        push_filter(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("p.name ILIKE $1 OR p.description ILIKE $2"));
        assert!(sql.contains("ps.shop_id = $3"));
        assert!(!sql.contains("is_active"));
    }

    #[test]
    fn test_order_by_covers_every_key() {
        for key in SortKey::ALL {
            assert!(order_by(key).ends_with("p.id ASC") || order_by(key).ends_with("p.id DESC"));
        }
    }
}

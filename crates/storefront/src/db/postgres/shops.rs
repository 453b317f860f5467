//! Shops.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bazaar_core::{ShopId, UserId};

use super::PgStore;
use crate::db::{RepositoryError, ShopStore};
use crate::models::{Shop, ShopInput};

const SHOP_COLUMNS: &str =
    "id, name, address, phone, opening_hours, latitude, longitude, owner_id, created_at";

#[derive(sqlx::FromRow)]
struct ShopRow {
    id: ShopId,
    name: String,
    address: String,
    phone: String,
    opening_hours: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    owner_id: UserId,
    created_at: DateTime<Utc>,
}

impl From<ShopRow> for Shop {
    fn from(row: ShopRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            address: row.address,
            phone: row.phone,
            opening_hours: row.opening_hours,
            latitude: row.latitude,
            longitude: row.longitude,
            owner_id: row.owner_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ShopStore for PgStore {
    async fn list_shops(&self) -> Result<Vec<Shop>, RepositoryError> {
        let sql = format!("SELECT {SHOP_COLUMNS} FROM shop ORDER BY name, id");
        let rows: Vec<ShopRow> = sqlx::query_as(&sql).fetch_all(self.pool()).await?;
        Ok(rows.into_iter().map(Shop::from).collect())
    }

    async fn list_shops_by_owner(&self, owner: UserId) -> Result<Vec<Shop>, RepositoryError> {
        let sql = format!("SELECT {SHOP_COLUMNS} FROM shop WHERE owner_id = $1 ORDER BY name, id");
        let rows: Vec<ShopRow> = sqlx::query_as(&sql)
            .bind(owner)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(Shop::from).collect())
    }

    async fn get_shop(&self, id: ShopId) -> Result<Option<Shop>, RepositoryError> {
        let sql = format!("SELECT {SHOP_COLUMNS} FROM shop WHERE id = $1");
        let row: Option<ShopRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Shop::from))
    }

    async fn create_shop(&self, owner: UserId, shop: ShopInput) -> Result<Shop, RepositoryError> {
        let sql = format!(
            "INSERT INTO shop (name, address, phone, opening_hours, latitude, longitude, owner_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {SHOP_COLUMNS}"
        );
        let row: ShopRow = sqlx::query_as(&sql)
            .bind(&shop.name)
            .bind(&shop.address)
            .bind(&shop.phone)
            .bind(&shop.opening_hours)
            .bind(shop.latitude)
            .bind(shop.longitude)
            .bind(owner)
            .fetch_one(self.pool())
            .await?;
        Ok(row.into())
    }

    async fn update_shop(&self, id: ShopId, shop: ShopInput) -> Result<Shop, RepositoryError> {
        let sql = format!(
            "UPDATE shop SET name = $2, address = $3, phone = $4, opening_hours = $5, \
             latitude = $6, longitude = $7 WHERE id = $1 RETURNING {SHOP_COLUMNS}"
        );
        let row: Option<ShopRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(&shop.name)
            .bind(&shop.address)
            .bind(&shop.phone)
            .bind(&shop.opening_hours)
            .bind(shop.latitude)
            .bind(shop.longitude)
            .fetch_optional(self.pool())
            .await?;
        row.map(Shop::from).ok_or(RepositoryError::NotFound)
    }

    async fn delete_shop(&self, id: ShopId) -> Result<bool, RepositoryError> {
        let deleted = sqlx::query("DELETE FROM shop WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(deleted.rows_affected() > 0)
    }
}

//! `PostgreSQL` implementation of the store traits.
//!
//! Queries are built at runtime with `query_as` and `QueryBuilder`; row
//! structs convert into domain types with `TryFrom`, reporting bad stored
//! values as [`RepositoryError::DataCorruption`].

mod carts;
mod catalog;
mod shops;
mod users;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{Repository, RepositoryError};

/// Store backed by a connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Repository for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

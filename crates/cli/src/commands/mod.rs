//! CLI command implementations.

pub mod categories;
pub mod media;
pub mod migrate;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use bazaar_storefront::db::{RepositoryError, create_pool};
use bazaar_storefront::services::{AuthError, MediaError};

/// Errors surfaced by `bz-cli` commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0} not set")]
    MissingEnv(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Role(#[from] bazaar_core::RoleParseError),

    #[error("user not found: {0}")]
    UserNotFound(String),
}

/// Connect to the storefront database.
///
/// Reads `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CliError::MissingEnv("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(create_pool(&SecretString::from(url)).await?)
}

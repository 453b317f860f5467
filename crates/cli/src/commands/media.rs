//! Uploaded media maintenance.

use std::path::PathBuf;

use bazaar_storefront::config::DEFAULT_MAX_UPLOAD_BYTES;
use bazaar_storefront::services::MediaStorage;

use super::CliError;

/// Delete every upload and recreate the empty directory layout.
pub async fn clean(root: Option<PathBuf>) -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let root = root.unwrap_or_else(|| {
        std::env::var("STOREFRONT_MEDIA_ROOT")
            .map_or_else(|_| PathBuf::from("media"), PathBuf::from)
    });

    let storage = MediaStorage::new(&root, DEFAULT_MAX_UPLOAD_BYTES);
    storage.reset().await?;

    tracing::info!(root = %root.display(), "Media directory cleaned");
    Ok(())
}

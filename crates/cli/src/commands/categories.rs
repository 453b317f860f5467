//! Category maintenance commands.

use bazaar_storefront::db::PgStore;
use bazaar_storefront::services::categorize::{assign_categories, category_report};

use super::{CliError, connect};

/// File uncategorized products by name keywords.
pub async fn assign() -> Result<(), CliError> {
    let store = PgStore::new(connect().await?);
    let report = assign_categories(&store).await?;

    if report.total() == 0 {
        tracing::info!("Every product already has a category");
        return Ok(());
    }
    tracing::info!(
        matched = report.matched.len(),
        fallback = report.fallback,
        "Categories assigned"
    );
    Ok(())
}

/// Print every product with its category, then the category list.
#[allow(clippy::print_stdout)]
pub async fn debug() -> Result<(), CliError> {
    let store = PgStore::new(connect().await?);
    let report = category_report(&store).await?;

    println!("Products:");
    for (name, category) in &report.products {
        println!("  {name}: {}", category.as_deref().unwrap_or("none"));
    }
    println!();
    println!("With category: {}", report.with_category);
    println!("Without category: {}", report.without_category);
    println!();
    println!("Categories:");
    for category in &report.categories {
        match category.parent_id {
            Some(parent) => println!("  {}: {} (parent {parent})", category.id, category.name),
            None => println!("  {}: {}", category.id, category.name),
        }
    }
    Ok(())
}

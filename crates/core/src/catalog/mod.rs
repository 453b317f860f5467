//! Catalog logic shared by the storefront and the CLI.
//!
//! - [`tree`] - Category forest and cycle-safe descendant collection
//! - [`listing`] - Product search filters, sort keys, and pagination
//! - [`classify`] - Keyword-based category suggestions for uncategorized products

pub mod classify;
pub mod listing;
pub mod tree;

pub use listing::{FilterFields, ListingFilter, PAGE_SIZE, Pagination, SortFields, SortKey};
pub use tree::{CategoryIndex, CategoryNode, CategoryTree};

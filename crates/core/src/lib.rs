//! Bazaar Core - Shared domain types and catalog logic.
//!
//! This crate provides the types and algorithms used across all Bazaar components:
//! - `storefront` - Public catalog, cart, favorites, and shop management
//! - `cli` - Command-line tools for migrations and catalog maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Anything here can be tested without a running database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, account fields, and roles
//! - [`catalog`] - Category forest, descendant filtering, listing queries, keyword classification
//! - [`cart`] - Cart aggregation
//! - [`geo`] - Great-circle distances for nearest-shop lookup

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod geo;
pub mod types;

pub use types::*;

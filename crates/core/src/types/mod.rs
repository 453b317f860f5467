//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod account;
pub mod id;
pub mod price;
pub mod role;

pub use account::{Email, EmailError, Username, UsernameError};
pub use id::*;
pub use price::{Price, PriceError, format_rubles};
pub use role::{RoleParseError, UserRole};

//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;
use std::str::FromStr;

use bazaar_core::format_rubles;
use rust_decimal::Decimal;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats an amount as rubles: `1 234,50 ₽`.
///
/// Anything that is not a number renders as `0 ₽`.
///
/// Usage in templates: `{{ product.price|rubles }}`
#[askama::filter_fn]
pub fn rubles(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_price(&value.to_string()))
}

/// The formatting behind [`rubles`].
#[must_use]
pub fn format_price(value: &str) -> String {
    match Decimal::from_str(value.trim()) {
        Ok(amount) => format_rubles(amount),
        Err(_) => "0 ₽".to_string(),
    }
}

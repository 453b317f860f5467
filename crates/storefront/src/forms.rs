//! HTML form payloads and their validation.
//!
//! Field-level checks are declared with `validator`; cross-field and
//! parse-into-domain checks live in each form's `into_input`/`check`.
//! Failures collect into [`FormErrors`], which templates render next to
//! the offending inputs.

use std::collections::BTreeMap;

use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use bazaar_core::cart::Quantity;
use bazaar_core::geo::Coordinates;
use bazaar_core::{CategoryId, Price, ShopId, Username};

use crate::models::{ProductInput, ShopInput};

/// Per-field error messages. The `__all__` key holds form-wide errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    /// Key for errors not tied to one field.
    pub const FORM: &'static str = "__all__";

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// Messages for one field; empty when it is valid.
    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map_or(&[], Vec::as_slice)
    }

    /// Form-wide messages.
    #[must_use]
    pub fn form(&self) -> &[String] {
        self.get(Self::FORM)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = Self::default();
        for (field, errs) in errors.field_errors() {
            for err in errs {
                let message = err
                    .message
                    .as_ref()
                    .map_or_else(|| err.code.to_string(), ToString::to_string);
                out.add(&field.to_string(), message);
            }
        }
        out
    }
}

/// Run the derived validators, collecting into [`FormErrors`].
fn validated(form: &impl Validate) -> FormErrors {
    form.validate().err().map(FormErrors::from).unwrap_or_default()
}

fn validate_username(value: &str) -> Result<(), ValidationError> {
    Username::parse(value).map(|_| ()).map_err(|e| {
        let mut err = ValidationError::new("username");
        err.message = Some(format!("Enter a valid username: {e}.").into());
        err
    })
}

fn validate_price(value: &str) -> Result<(), ValidationError> {
    value.parse::<Price>().map(|_| ()).map_err(|e| {
        let mut err = ValidationError::new("price");
        err.message = Some(format!("Enter a valid price: {e}.").into());
        err
    })
}

/// Registration form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password1: String,
    pub password2: String,
}

impl RegisterForm {
    /// Validate every field and the password confirmation.
    ///
    /// # Errors
    ///
    /// Returns the collected field errors.
    pub fn check(&self) -> Result<(), FormErrors> {
        let mut errors = validated(self);
        if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }
        errors.into_result()
    }
}

/// Login form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
    /// Where to go after logging in.
    #[serde(default)]
    pub next: Option<String>,
}

impl LoginForm {
    /// # Errors
    ///
    /// Returns the collected field errors.
    pub fn check(&self) -> Result<(), FormErrors> {
        validated(self).into_result()
    }
}

/// A local redirect target, or `/`.
///
/// Only same-site absolute paths are followed.
#[must_use]
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_owned()
        }
        _ => "/".to_owned(),
    }
}

/// Shop create/edit form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ShopForm {
    #[validate(length(min = 1, max = 200, message = "Name is required (at most 200 characters)."))]
    pub name: String,
    #[validate(length(min = 1, message = "Address is required."))]
    pub address: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "Phone must be at most 20 characters."))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "Opening hours must be at most 100 characters."))]
    pub opening_hours: String,
    #[serde(default)]
    pub latitude: String,
    #[serde(default)]
    pub longitude: String,
}

fn parse_optional_f64(value: &str) -> Result<Option<f64>, ()> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.replace(',', ".").parse::<f64>().map(Some).map_err(|_| ())
}

impl ShopForm {
    /// Validate and convert to repository input.
    ///
    /// Coordinates are optional but must come as a valid pair.
    ///
    /// # Errors
    ///
    /// Returns the collected field errors.
    pub fn into_input(self) -> Result<ShopInput, FormErrors> {
        let mut errors = validated(&self);
        let latitude = parse_optional_f64(&self.latitude).unwrap_or_else(|()| {
            errors.add("latitude", "Enter a number.");
            None
        });
        let longitude = parse_optional_f64(&self.longitude).unwrap_or_else(|()| {
            errors.add("longitude", "Enter a number.");
            None
        });
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => {
                if let Err(e) = Coordinates::new(lat, lon) {
                    errors.add(FormErrors::FORM, format!("Invalid coordinates: {e}."));
                }
            }
            (None, None) => {}
            _ if errors.get("latitude").is_empty() && errors.get("longitude").is_empty() => {
                errors.add(FormErrors::FORM, "Enter both latitude and longitude, or neither.");
            }
            _ => {}
        }
        errors.into_result()?;

        Ok(ShopInput {
            name: self.name.trim().to_owned(),
            address: self.address.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            opening_hours: self.opening_hours.trim().to_owned(),
            latitude,
            longitude,
        })
    }
}

/// Product create/edit form, decoded from a multipart body.
#[derive(Debug, Clone, Default, Validate)]
pub struct ProductForm {
    #[validate(length(min = 1, max = 200, message = "Name is required (at most 200 characters)."))]
    pub name: String,
    pub description: String,
    #[validate(custom(function = "validate_price"))]
    pub price: String,
    /// Selected category id; empty for none.
    pub category: String,
    /// Selected shop ids.
    pub shops: Vec<String>,
    pub is_active: bool,
}

impl ProductForm {
    /// Validate and convert to repository input.
    ///
    /// `known_categories` and `known_shops` reject ids that do not exist.
    ///
    /// # Errors
    ///
    /// Returns the collected field errors.
    pub fn to_input(
        &self,
        known_categories: &[CategoryId],
        known_shops: &[ShopId],
    ) -> Result<ProductInput, FormErrors> {
        let mut errors = validated(self);

        let category_id = match self.category.trim() {
            "" => None,
            raw => match raw.parse::<CategoryId>() {
                Ok(id) if known_categories.contains(&id) => Some(id),
                _ => {
                    errors.add("category", "Select a valid choice.");
                    None
                }
            },
        };

        let mut shop_ids = Vec::with_capacity(self.shops.len());
        for raw in &self.shops {
            match raw.parse::<ShopId>() {
                Ok(id) if known_shops.contains(&id) => {
                    if !shop_ids.contains(&id) {
                        shop_ids.push(id);
                    }
                }
                _ => errors.add("shops", format!("Select a valid choice. {raw} is not one of the available choices.")),
            }
        }

        let price = self.price.parse::<Price>().ok();
        errors.into_result()?;
        let price = price.ok_or_else(FormErrors::default)?;

        Ok(ProductInput {
            name: self.name.trim().to_owned(),
            category_id,
            description: self.description.trim().to_owned(),
            price,
            is_active: self.is_active,
            shop_ids,
        })
    }
}

/// The `quantity` field of cart forms.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuantityForm {
    #[serde(default)]
    pub quantity: Option<String>,
}

impl QuantityForm {
    /// Quantity to add; a missing field means one.
    ///
    /// # Errors
    ///
    /// Returns a message for zero, negative, or non-numeric input.
    pub fn to_add(&self) -> Result<Quantity, String> {
        match self.quantity.as_deref().map(str::trim) {
            None | Some("") => Ok(Quantity::ONE),
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .and_then(|n| Quantity::new(n.min(Quantity::MAX)))
                .ok_or_else(|| format!("invalid quantity {raw:?}")),
        }
    }

    /// Requested quantity for an update; zero is allowed.
    ///
    /// # Errors
    ///
    /// Returns a message for missing, negative, or non-numeric input.
    pub fn to_update(&self) -> Result<u32, String> {
        let raw = self.quantity.as_deref().map(str::trim).unwrap_or_default();
        raw.parse::<u32>()
            .map_err(|_| format!("invalid quantity {raw:?}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn register(username: &str, email: &str, p1: &str, p2: &str) -> RegisterForm {
        RegisterForm {
            username: username.into(),
            email: email.into(),
            password1: p1.into(),
            password2: p2.into(),
        }
    }

    #[test]
    fn test_register_form_valid() {
        assert!(register("alice", "alice@example.com", "longpass1", "longpass1").check().is_ok());
    }

    #[test]
    fn test_register_form_collects_every_error() {
        let errors = register("bad name!", "nope", "short", "other").check().unwrap_err();
        assert_eq!(errors.get("username").len(), 1);
        assert_eq!(errors.get("email"), ["Enter a valid email address."]);
        assert_eq!(errors.get("password1").len(), 1);
        assert_eq!(errors.get("password2"), ["The two password fields didn't match."]);
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/cart")), "/cart");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_shop_form_coordinates() {
        let form = ShopForm {
            name: "Corner".into(),
            address: "1 Main St".into(),
            latitude: "55,75".into(),
            longitude: "37.61".into(),
            ..ShopForm::default()
        };
        let input = form.into_input().unwrap();
        assert_eq!(input.latitude, Some(55.75));

        let half = ShopForm {
            name: "Corner".into(),
            address: "1 Main St".into(),
            latitude: "55".into(),
            ..ShopForm::default()
        };
        assert_eq!(half.into_input().unwrap_err().form().len(), 1);

        let out_of_range = ShopForm {
            name: "Corner".into(),
            address: "1 Main St".into(),
            latitude: "91".into(),
            longitude: "0".into(),
            ..ShopForm::default()
        };
        assert!(out_of_range.into_input().is_err());
    }

    #[test]
    fn test_shop_form_requires_name_and_address() {
        let errors = ShopForm::default().into_input().unwrap_err();
        assert!(!errors.get("name").is_empty());
        assert!(!errors.get("address").is_empty());
    }

    #[test]
    fn test_product_form() {
        let form = ProductForm {
            name: " Milk ".into(),
            price: "89,90".into(),
            category: "3".into(),
            shops: vec!["1".into(), "1".into()],
            is_active: true,
            ..ProductForm::default()
        };
        let input = form
            .to_input(&[CategoryId::new(3)], &[ShopId::new(1)])
            .unwrap();
        assert_eq!(input.name, "Milk");
        assert_eq!(input.price, Price::from_cents(8990).unwrap());
        assert_eq!(input.shop_ids, [ShopId::new(1)]);

        let errors = ProductForm {
            name: String::new(),
            price: "-1".into(),
            category: "99".into(),
            ..ProductForm::default()
        }
        .to_input(&[], &[])
        .unwrap_err();
        assert!(!errors.get("name").is_empty());
        assert!(!errors.get("price").is_empty());
        assert!(!errors.get("category").is_empty());
    }

    #[test]
    fn test_product_form_price_rounding_past_bound() {
        let errors = ProductForm {
            name: "Yacht".into(),
            price: "99999999.995".into(),
            ..ProductForm::default()
        }
        .to_input(&[], &[])
        .unwrap_err();
        assert_eq!(errors.get("price").len(), 1);
    }

    #[test]
    fn test_quantity_form() {
        let q = |v: Option<&str>| QuantityForm {
            quantity: v.map(str::to_owned),
        };
        assert_eq!(q(None).to_add().unwrap(), Quantity::ONE);
        assert_eq!(q(Some("3")).to_add().unwrap().get(), 3);
        assert!(q(Some("0")).to_add().is_err());
        assert!(q(Some("-2")).to_add().is_err());
        assert_eq!(q(Some("0")).to_update().unwrap(), 0);
        assert!(q(Some("x")).to_update().is_err());
        assert!(q(None).to_update().is_err());
    }
}

//! Form validation shared by checkout, account and auth pages.
//!
//! Validation never calls the backend. It trims input, enforces lengths and
//! formats, and collects one message per field so the form can be rendered
//! again with the visitor's input intact.

use std::collections::{BTreeMap, HashMap};

use vernont_core::Email;

use crate::api::Address;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

const MAX_NAME_LENGTH: usize = 80;
const MAX_LINE_LENGTH: usize = 200;
const MAX_CITY_LENGTH: usize = 100;
const MAX_POSTAL_CODE_LENGTH: usize = 20;
const MAX_PHONE_LENGTH: usize = 30;

// =============================================================================
// FieldErrors
// =============================================================================

/// Validation messages keyed by form field name. The first message recorded
/// for a field wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Message for a field, for templates.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(value)` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when any field failed validation.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

// =============================================================================
// Field Validators
// =============================================================================

/// Trimmed, non-empty and at most `max` characters.
pub fn required(
    errors: &mut FieldErrors,
    field: &str,
    label: &str,
    value: &str,
    max: usize,
) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, format!("{label} is required"));
    } else if value.chars().count() > max {
        errors.add(field, format!("{label} must be at most {max} characters"));
    }
    value.to_string()
}

/// Trimmed, `None` when empty, at most `max` characters.
pub fn optional(
    errors: &mut FieldErrors,
    field: &str,
    label: &str,
    value: &str,
    max: usize,
) -> Option<String> {
    let value = value.trim();
    if value.chars().count() > max {
        errors.add(field, format!("{label} must be at most {max} characters"));
    }
    (!value.is_empty()).then(|| value.to_string())
}

/// A structurally valid email address, normalized.
pub fn email(errors: &mut FieldErrors, field: &str, value: &str) -> Option<Email> {
    if value.trim().is_empty() {
        errors.add(field, "Email is required");
        return None;
    }
    match Email::parse(value) {
        Ok(email) => Some(email),
        Err(_) => {
            errors.add(field, "Enter a valid email address");
            None
        }
    }
}

/// A new password and its confirmation.
pub fn new_password(errors: &mut FieldErrors, password: &str, confirmation: &str) {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
    } else if length > MAX_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("Password must be at most {MAX_PASSWORD_LENGTH} characters"),
        );
    }
    if password != confirmation {
        errors.add("password_confirm", "Passwords do not match");
    }
}

/// ISO 3166-1 alpha-2 country code, lower-cased for the backend.
pub fn country_code(errors: &mut FieldErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, "Country is required");
    } else if value.len() != 2 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
        errors.add(field, "Choose a country");
    }
    value.to_ascii_lowercase()
}

// =============================================================================
// Address Input
// =============================================================================

/// Raw address fields as submitted, kept for re-rendering the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressInput {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country_code: String,
    pub phone: String,
}

impl AddressInput {
    /// Read `{prefix}first_name`, `{prefix}city`, ... from a submitted form.
    #[must_use]
    pub fn from_fields(fields: &HashMap<String, String>, prefix: &str) -> Self {
        let field = |name: &str| {
            fields
                .get(&format!("{prefix}{name}"))
                .cloned()
                .unwrap_or_default()
        };
        Self {
            first_name: field("first_name"),
            last_name: field("last_name"),
            company: field("company"),
            address_1: field("address_1"),
            address_2: field("address_2"),
            city: field("city"),
            province: field("province"),
            postal_code: field("postal_code"),
            country_code: field("country_code"),
            phone: field("phone"),
        }
    }

    /// Prefill from an existing address.
    #[must_use]
    pub fn from_address(address: &Address) -> Self {
        Self {
            first_name: address.first_name.clone(),
            last_name: address.last_name.clone(),
            company: address.company.clone().unwrap_or_default(),
            address_1: address.address_1.clone(),
            address_2: address.address_2.clone().unwrap_or_default(),
            city: address.city.clone(),
            province: address.province.clone().unwrap_or_default(),
            postal_code: address.postal_code.clone(),
            country_code: address.country_code.to_ascii_uppercase(),
            phone: address.phone.clone().unwrap_or_default(),
        }
    }

    /// Validate into an [`Address`], recording errors under
    /// `{prefix}{field}`.
    pub fn validate(&self, prefix: &str, errors: &mut FieldErrors) -> Option<Address> {
        let before = errors.len();
        let key = |name: &str| format!("{prefix}{name}");

        let address = Address {
            first_name: required(errors, &key("first_name"), "First name", &self.first_name, MAX_NAME_LENGTH),
            last_name: required(errors, &key("last_name"), "Last name", &self.last_name, MAX_NAME_LENGTH),
            company: optional(errors, &key("company"), "Company", &self.company, MAX_NAME_LENGTH),
            address_1: required(errors, &key("address_1"), "Address", &self.address_1, MAX_LINE_LENGTH),
            address_2: optional(errors, &key("address_2"), "Apartment, suite", &self.address_2, MAX_LINE_LENGTH),
            city: required(errors, &key("city"), "City", &self.city, MAX_CITY_LENGTH),
            province: optional(errors, &key("province"), "Region", &self.province, MAX_CITY_LENGTH),
            postal_code: required(
                errors,
                &key("postal_code"),
                "Postal code",
                &self.postal_code,
                MAX_POSTAL_CODE_LENGTH,
            ),
            country_code: country_code(errors, &key("country_code"), &self.country_code),
            phone: optional(errors, &key("phone"), "Phone", &self.phone, MAX_PHONE_LENGTH),
        };

        (errors.len() == before).then_some(address)
    }
}

/// Countries offered in address forms, by ISO 3166-1 alpha-2 code.
pub const COUNTRIES: [(&str, &str); 16] = [
    ("US", "United States"),
    ("CA", "Canada"),
    ("GB", "United Kingdom"),
    ("IE", "Ireland"),
    ("FR", "France"),
    ("DE", "Germany"),
    ("IT", "Italy"),
    ("ES", "Spain"),
    ("NL", "Netherlands"),
    ("BE", "Belgium"),
    ("CH", "Switzerland"),
    ("SE", "Sweden"),
    ("AE", "United Arab Emirates"),
    ("JP", "Japan"),
    ("SG", "Singapore"),
    ("AU", "Australia"),
];

/// An address fieldset ready for rendering: values, names and errors under
/// one field prefix.
#[derive(Debug, Clone, Default)]
pub struct AddressFields {
    pub prefix: &'static str,
    pub input: AddressInput,
    errors: FieldErrors,
}

impl AddressFields {
    #[must_use]
    pub fn new(prefix: &'static str, input: AddressInput, errors: &FieldErrors) -> Self {
        Self {
            prefix,
            input,
            errors: errors.clone(),
        }
    }

    /// Form field name for `field`.
    #[must_use]
    pub fn name(&self, field: &str) -> String {
        format!("{}{field}", self.prefix)
    }

    #[must_use]
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(&self.name(field))
    }

    #[must_use]
    pub const fn countries(&self) -> &'static [(&'static str, &'static str)] {
        &COUNTRIES
    }

    #[must_use]
    pub fn is_country(&self, code: &str) -> bool {
        self.input.country_code.eq_ignore_ascii_case(code)
    }
}

//! Checkout wizard: information, shipping, payment.
//!
//! Which steps a visitor may see is derived from the backend cart, never
//! from what the browser claims. The session only remembers which step was
//! last requested; [`CheckoutState::resolve`] clamps it to what the cart
//! currently allows, so a cart that lost its shipping method (address
//! changed, option expired) falls back to the shipping step by itself.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vernont_core::{CartId, ShippingOptionId};

use crate::api::{Cart, CartUpdate, ShippingOption};
use crate::forms::{self, AddressInput, FieldErrors};

/// Longest promo or gift card code accepted from the form.
const MAX_CODE_LENGTH: usize = 64;

/// Form field prefix of the billing address.
pub const BILLING_PREFIX: &str = "billing_";

// =============================================================================
// Steps
// =============================================================================

/// A wizard step, in order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    #[default]
    Information,
    Shipping,
    Payment,
}

impl CheckoutStep {
    pub const ALL: [Self; 3] = [Self::Information, Self::Shipping, Self::Payment];

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Information => "information",
            Self::Shipping => "shipping",
            Self::Payment => "payment",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Information => "Information",
            Self::Shipping => "Shipping",
            Self::Payment => "Payment",
        }
    }

    /// 1-based position for the progress indicator.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Information => 1,
            Self::Shipping => 2,
            Self::Payment => 3,
        }
    }
}

/// The furthest step the cart's server state allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutProgress {
    furthest: CheckoutStep,
}

impl CheckoutProgress {
    #[must_use]
    pub fn from_cart(cart: &Cart) -> Self {
        let has_contact = cart.email.is_some() && cart.shipping_address.is_some();
        let furthest = if !has_contact {
            CheckoutStep::Information
        } else if cart.shipping_methods.is_empty() {
            CheckoutStep::Shipping
        } else {
            CheckoutStep::Payment
        };
        Self { furthest }
    }

    #[must_use]
    pub const fn furthest(self) -> CheckoutStep {
        self.furthest
    }

    #[must_use]
    pub fn allows(self, step: CheckoutStep) -> bool {
        step <= self.furthest
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// The visitor asked for a step whose prerequisites are not on the cart.
    #[error("{requested:?} is locked until {furthest:?} is complete")]
    StepLocked {
        requested: CheckoutStep,
        furthest: CheckoutStep,
    },
}

/// Session-stored wizard position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutState {
    pub cart_id: CartId,
    pub step: CheckoutStep,
}

impl CheckoutState {
    #[must_use]
    pub const fn new(cart_id: CartId) -> Self {
        Self {
            cart_id,
            step: CheckoutStep::Information,
        }
    }

    /// The state to render for `cart`: a stored state for another cart is
    /// discarded, and the requested step is clamped to what the cart allows.
    #[must_use]
    pub fn resolve(stored: Option<Self>, cart: &Cart) -> Self {
        let mut state = match stored {
            Some(state) if state.cart_id == cart.id => state,
            _ => Self::new(cart.id.clone()),
        };
        state.step = state.step.min(CheckoutProgress::from_cart(cart).furthest());
        state
    }

    /// Move to `step` if the cart allows it. Going back is always allowed.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::StepLocked`] when a previous step is not
    /// complete on the server.
    pub fn go_to(
        &mut self,
        step: CheckoutStep,
        progress: CheckoutProgress,
    ) -> Result<(), CheckoutError> {
        if !progress.allows(step) {
            return Err(CheckoutError::StepLocked {
                requested: step,
                furthest: progress.furthest(),
            });
        }
        self.step = step;
        Ok(())
    }
}

// =============================================================================
// Step 1: Information
// =============================================================================

/// Submitted contact and address fields, kept for re-rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InformationInput {
    pub email: String,
    pub shipping: AddressInput,
    pub billing_same: bool,
    pub billing: AddressInput,
}

impl InformationInput {
    #[must_use]
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        Self {
            email: fields.get("email").cloned().unwrap_or_default(),
            shipping: AddressInput::from_fields(fields, ""),
            // Unchecked checkboxes are absent from the form.
            billing_same: fields.contains_key("billing_same"),
            billing: AddressInput::from_fields(fields, BILLING_PREFIX),
        }
    }

    /// Prefill from the cart, falling back to the customer's email.
    #[must_use]
    pub fn from_cart(cart: &Cart, customer_email: Option<&str>) -> Self {
        let shipping = cart
            .shipping_address
            .as_ref()
            .map(AddressInput::from_address)
            .unwrap_or_default();
        let billing = cart
            .billing_address
            .as_ref()
            .map(AddressInput::from_address)
            .unwrap_or_default();
        Self {
            email: cart
                .email
                .as_deref()
                .or(customer_email)
                .unwrap_or_default()
                .to_string(),
            billing_same: cart.billing_address.is_none()
                || cart.billing_address == cart.shipping_address,
            shipping,
            billing,
        }
    }

    /// Validate into the cart update to send.
    ///
    /// # Errors
    ///
    /// Returns every field that failed validation.
    pub fn validate(&self) -> Result<CartUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();
        let email = forms::email(&mut errors, "email", &self.email);
        let shipping = self.shipping.validate("", &mut errors);
        let billing = if self.billing_same {
            shipping.clone()
        } else {
            self.billing.validate(BILLING_PREFIX, &mut errors)
        };

        errors.into_result(CartUpdate {
            email: email.map(vernont_core::Email::into_inner),
            shipping_address: shipping,
            billing_address: billing,
            currency_code: None,
        })
    }
}

// =============================================================================
// Step 2: Shipping
// =============================================================================

/// The submitted option, if it is one the backend offered for this cart.
///
/// # Errors
///
/// Returns a `shipping_option` field error otherwise.
pub fn choose_shipping_option(
    options: &[ShippingOption],
    submitted: &str,
) -> Result<ShippingOptionId, FieldErrors> {
    let submitted = submitted.trim();
    options
        .iter()
        .find(|option| option.id.as_str() == submitted)
        .map(|option| option.id.clone())
        .ok_or_else(|| {
            let mut errors = FieldErrors::new();
            errors.add("shipping_option", "Choose a shipping method");
            errors
        })
}

// =============================================================================
// Step 3: Payment
// =============================================================================

/// A trimmed promo or gift card code.
///
/// # Errors
///
/// Returns a `field` error when the code is blank or too long.
pub fn normalize_code(field: &str, label: &str, value: &str) -> Result<String, FieldErrors> {
    let mut errors = FieldErrors::new();
    let code = forms::required(&mut errors, field, label, value, MAX_CODE_LENGTH);
    errors.into_result(code)
}

/// The payment provider to open a session with: the submitted one when the
/// cart offers it, otherwise the only one offered.
///
/// # Errors
///
/// Returns a `provider_id` error when no offered provider matches.
pub fn choose_payment_provider(cart: &Cart, submitted: Option<&str>) -> Result<String, FieldErrors> {
    let submitted = submitted.map(str::trim).filter(|p| !p.is_empty());
    let chosen = match (submitted, cart.payment_providers.as_slice()) {
        (Some(provider), offered) => offered.iter().find(|p| p.as_str() == provider),
        (None, [only]) => Some(only),
        (None, _) => None,
    };
    chosen.cloned().ok_or_else(|| {
        let mut errors = FieldErrors::new();
        errors.add(
            "provider_id",
            if cart.payment_providers.is_empty() {
                "No payment method is available for this order"
            } else {
                "Choose a payment method"
            },
        );
        errors
    })
}

//! Cart and checkout operations.
//!
//! Every mutation returns the cart as the backend now sees it. Callers render
//! that response; nothing is updated optimistically.

use reqwest::Method;
use serde_json::json;
use tracing::{info, instrument};
use vernont_core::{CartId, CurrencyCode, LineItemId, ShippingOptionId, VariantId};

use super::conversions::{convert_cart, convert_completion, convert_shipping_option};
use super::dto::{CartEnvelope, CompletionDto, ShippingOptionsEnvelope};
use super::types::{Cart, CartCompletion, CartUpdate, ShippingOption};
use super::{ApiError, CommerceClient};

impl CommerceClient {
    /// Create an empty cart in the given currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn create_cart(&self, currency: CurrencyCode) -> Result<Cart, ApiError> {
        let envelope: CartEnvelope = self
            .send(
                Method::POST,
                &["store", "carts"],
                &json!({ "currency_code": currency }),
                None,
            )
            .await?;
        let cart = convert_cart(envelope.cart)?;
        info!(cart_id = %cart.id, "Created cart");
        Ok(cart)
    }

    /// Fetch a cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the cart no longer exists.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get_cart(&self, cart_id: &CartId) -> Result<Cart, ApiError> {
        let envelope: CartEnvelope = self
            .get(&["store", "carts", cart_id.as_str()], &[], None)
            .await?;
        Ok(convert_cart(envelope.cart)?)
    }

    /// Add a variant to the cart.
    ///
    /// # Errors
    ///
    /// Returns a rejection when the variant is out of stock.
    #[instrument(skip(self), fields(cart_id = %cart_id, variant_id = %variant_id))]
    pub async fn add_line_item(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        self.cart_call(
            Method::POST,
            &["store", "carts", cart_id.as_str(), "line-items"],
            &json!({ "variant_id": variant_id, "quantity": quantity }),
        )
        .await
    }

    /// Change the quantity of a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    pub async fn update_line_item(
        &self,
        cart_id: &CartId,
        line_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, ApiError> {
        self.cart_call(
            Method::POST,
            &["store", "carts", cart_id.as_str(), "line-items", line_id.as_str()],
            &json!({ "quantity": quantity }),
        )
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    pub async fn remove_line_item(
        &self,
        cart_id: &CartId,
        line_id: &LineItemId,
    ) -> Result<Cart, ApiError> {
        let envelope: CartEnvelope = self
            .delete(
                &["store", "carts", cart_id.as_str(), "line-items", line_id.as_str()],
                None,
            )
            .await?;
        Ok(convert_cart(envelope.cart)?)
    }

    /// Update email, addresses or currency.
    ///
    /// # Errors
    ///
    /// Returns a rejection when the backend refuses an address.
    #[instrument(skip(self, update), fields(cart_id = %cart_id))]
    pub async fn update_cart(
        &self,
        cart_id: &CartId,
        update: &CartUpdate,
    ) -> Result<Cart, ApiError> {
        self.cart_call(Method::POST, &["store", "carts", cart_id.as_str()], update)
            .await
    }

    /// Attach an anonymous cart to the logged-in customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(cart_id = %cart_id))]
    pub async fn transfer_cart(&self, cart_id: &CartId, token: &str) -> Result<Cart, ApiError> {
        let envelope: CartEnvelope = self
            .send(
                Method::POST,
                &["store", "carts", cart_id.as_str(), "customer"],
                &json!({}),
                Some(token),
            )
            .await?;
        Ok(convert_cart(envelope.cart)?)
    }

    /// Shipping options available for the cart's address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn shipping_options(
        &self,
        cart_id: &CartId,
        currency: CurrencyCode,
    ) -> Result<Vec<ShippingOption>, ApiError> {
        let params = [("cart_id", cart_id.to_string())];
        let envelope: ShippingOptionsEnvelope = self
            .get(&["store", "shipping-options"], &params, None)
            .await?;
        Ok(envelope
            .shipping_options
            .into_iter()
            .map(|option| convert_shipping_option(option, currency))
            .collect())
    }

    /// Select a shipping option.
    ///
    /// # Errors
    ///
    /// Returns a rejection when the option does not apply to the cart.
    #[instrument(skip(self), fields(cart_id = %cart_id, option_id = %option_id))]
    pub async fn add_shipping_method(
        &self,
        cart_id: &CartId,
        option_id: &ShippingOptionId,
    ) -> Result<Cart, ApiError> {
        self.cart_call(
            Method::POST,
            &["store", "carts", cart_id.as_str(), "shipping-methods"],
            &json!({ "option_id": option_id }),
        )
        .await
    }

    /// Apply a promo code.
    ///
    /// # Errors
    ///
    /// Returns a rejection for unknown or expired codes.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn apply_discount(&self, cart_id: &CartId, code: &str) -> Result<Cart, ApiError> {
        self.cart_call(
            Method::POST,
            &["store", "carts", cart_id.as_str(), "discounts"],
            &json!({ "code": code }),
        )
        .await
    }

    /// Remove a promo code.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn remove_discount(&self, cart_id: &CartId, code: &str) -> Result<Cart, ApiError> {
        let envelope: CartEnvelope = self
            .delete(&["store", "carts", cart_id.as_str(), "discounts", code], None)
            .await?;
        Ok(convert_cart(envelope.cart)?)
    }

    /// Apply a gift card.
    ///
    /// # Errors
    ///
    /// Returns a rejection for unknown or empty gift cards.
    #[instrument(skip(self, code), fields(cart_id = %cart_id))]
    pub async fn apply_gift_card(&self, cart_id: &CartId, code: &str) -> Result<Cart, ApiError> {
        self.cart_call(
            Method::POST,
            &["store", "carts", cart_id.as_str(), "gift-cards"],
            &json!({ "code": code }),
        )
        .await
    }

    /// Remove a gift card.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, code), fields(cart_id = %cart_id))]
    pub async fn remove_gift_card(&self, cart_id: &CartId, code: &str) -> Result<Cart, ApiError> {
        let envelope: CartEnvelope = self
            .delete(&["store", "carts", cart_id.as_str(), "gift-cards", code], None)
            .await?;
        Ok(convert_cart(envelope.cart)?)
    }

    /// Create (or replace) the payment session for a provider.
    ///
    /// `return_url` is where a hosted payment page sends the customer back.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, provider_id = %provider_id))]
    pub async fn create_payment_session(
        &self,
        cart_id: &CartId,
        provider_id: &str,
        return_url: &str,
    ) -> Result<Cart, ApiError> {
        self.cart_call(
            Method::POST,
            &["store", "carts", cart_id.as_str(), "payment-sessions"],
            &json!({ "provider_id": provider_id, "return_url": return_url }),
        )
        .await
    }

    /// Place the order.
    ///
    /// A declined payment is not an error: the backend returns the cart with
    /// a message, surfaced as [`CartCompletion::Cart`].
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn complete_cart(&self, cart_id: &CartId) -> Result<CartCompletion, ApiError> {
        let dto: CompletionDto = self
            .send(
                Method::POST,
                &["store", "carts", cart_id.as_str(), "complete"],
                &json!({}),
                None,
            )
            .await?;
        let completion = convert_completion(dto)?;
        if let CartCompletion::Order(order) = &completion {
            info!(order_id = %order.id, display_id = order.display_id, "Order placed");
        }
        Ok(completion)
    }

    async fn cart_call<B: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<Cart, ApiError> {
        let envelope: CartEnvelope = self.send(method, segments, body, None).await?;
        Ok(convert_cart(envelope.cart)?)
    }
}

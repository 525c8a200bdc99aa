//! Wire shapes returned by the commerce backend.
//!
//! These mirror the JSON exactly and are deliberately loose: quantities and
//! counts are signed, currencies are raw strings. [`super::conversions`]
//! validates them into [`super::types`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use vernont_core::{
    CartId, CustomerId, FulfillmentStatus, LineItemId, OrderId, OrderStatus,
    PaymentStatus, ProductId, ReturnId, ReturnKind, ReturnStatus, ReviewId, ShippingOptionId,
    VariantId,
};

use super::types::{Address, PaymentSessionStatus};

/// Error body returned alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

// =============================================================================
// Store
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct StoreEnvelope {
    pub store: StoreSettingsDto,
}

#[derive(Debug, Deserialize)]
pub struct StoreSettingsDto {
    pub name: String,
    pub default_currency_code: String,
    #[serde(default)]
    pub currencies: Vec<String>,
    #[serde(default)]
    pub free_shipping_thresholds: Vec<PriceDto>,
    #[serde(default)]
    pub support_email: Option<String>,
    #[serde(default)]
    pub return_window_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PriceDto {
    pub amount: i64,
    pub currency_code: String,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProductEnvelope {
    pub product: ProductDto,
}

#[derive(Debug, Deserialize)]
pub struct ProductListDto {
    pub products: Vec<ProductDto>,
    pub count: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct ImageDto {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotesDto {
    #[serde(default)]
    pub top: Vec<String>,
    #[serde(default)]
    pub heart: Vec<String>,
    #[serde(default)]
    pub base: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CalculatedPriceDto {
    pub calculated_amount: i64,
    #[serde(default)]
    pub original_amount: Option<i64>,
    pub currency_code: String,
}

#[derive(Debug, Deserialize)]
pub struct VariantDto {
    pub id: VariantId,
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub calculated_price: CalculatedPriceDto,
    #[serde(default)]
    pub inventory_quantity: Option<i64>,
    #[serde(default = "default_true")]
    pub manage_inventory: bool,
    #[serde(default)]
    pub allow_backorder: bool,
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct RatingDto {
    pub average: f64,
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct ProductDto {
    pub id: ProductId,
    pub handle: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub concentration: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageDto>,
    #[serde(default)]
    pub notes: Option<NotesDto>,
    #[serde(default)]
    pub variants: Vec<VariantDto>,
    #[serde(default)]
    pub rating: Option<RatingDto>,
    #[serde(default)]
    pub tags: Vec<String>,
}

// =============================================================================
// Reviews
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ReviewDto {
    pub id: ReviewId,
    pub author_name: String,
    pub rating: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub verified_purchase: bool,
    #[serde(default)]
    pub helpful_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReviewSummaryDto {
    pub average: f64,
    pub count: i64,
    #[serde(default)]
    pub distribution: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewListDto {
    pub reviews: Vec<ReviewDto>,
    pub count: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub limit: i64,
    pub summary: ReviewSummaryDto,
}

#[derive(Debug, Deserialize)]
pub struct ReviewEnvelope {
    pub review: ReviewDto,
}

#[derive(Debug, Deserialize)]
pub struct HelpfulDto {
    pub helpful_count: i64,
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CartEnvelope {
    pub cart: CartDto,
}

#[derive(Debug, Deserialize)]
pub struct LineItemDto {
    pub id: LineItemId,
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_handle: String,
    pub title: String,
    #[serde(default)]
    pub variant_title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub quantity: i64,
    pub unit_price: i64,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub struct ShippingMethodDto {
    pub shipping_option_id: ShippingOptionId,
    pub name: String,
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct DiscountDto {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct GiftCardDto {
    pub code: String,
    #[serde(default)]
    pub balance: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentSessionDto {
    pub provider_id: String,
    pub status: PaymentSessionStatus,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CartDto {
    pub id: CartId,
    pub currency_code: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub items: Vec<LineItemDto>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub shipping_methods: Vec<ShippingMethodDto>,
    #[serde(default)]
    pub discounts: Vec<DiscountDto>,
    #[serde(default)]
    pub gift_cards: Vec<GiftCardDto>,
    #[serde(default)]
    pub payment_session: Option<PaymentSessionDto>,
    #[serde(default)]
    pub payment_providers: Vec<String>,
    pub subtotal: i64,
    #[serde(default)]
    pub discount_total: i64,
    #[serde(default)]
    pub shipping_total: i64,
    #[serde(default)]
    pub tax_total: i64,
    #[serde(default)]
    pub gift_card_total: i64,
    pub total: i64,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ShippingOptionDto {
    pub id: ShippingOptionId,
    pub name: String,
    pub amount: i64,
    #[serde(default)]
    pub estimated_delivery: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShippingOptionsEnvelope {
    pub shipping_options: Vec<ShippingOptionDto>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionErrorDto {
    pub message: String,
}

/// Body of `POST /store/carts/{id}/complete`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletionDto {
    Order {
        order: Box<OrderDto>,
    },
    Cart {
        cart: Box<CartDto>,
        error: CompletionErrorDto,
    },
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct OrderItemDto {
    pub id: LineItemId,
    #[serde(default)]
    pub product_handle: Option<String>,
    pub title: String,
    #[serde(default)]
    pub variant_title: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub returned_quantity: i64,
    pub unit_price: i64,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub struct OrderDto {
    pub id: OrderId,
    pub display_id: i64,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub payment_status: PaymentStatus,
    pub email: String,
    pub currency_code: String,
    #[serde(default)]
    pub items: Vec<OrderItemDto>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub shipping_methods: Vec<ShippingMethodDto>,
    pub subtotal: i64,
    #[serde(default)]
    pub discount_total: i64,
    #[serde(default)]
    pub shipping_total: i64,
    #[serde(default)]
    pub tax_total: i64,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub struct OrderEnvelope {
    pub order: OrderDto,
}

#[derive(Debug, Deserialize)]
pub struct OrderListDto {
    pub orders: Vec<OrderDto>,
    pub count: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub limit: i64,
}

// =============================================================================
// Customers
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CustomerEnvelope {
    pub customer: super::types::Customer,
}

#[derive(Debug, Deserialize)]
pub struct AddressEnvelope {
    pub address: super::types::SavedAddress,
}

// =============================================================================
// Returns
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ReturnReasonsEnvelope {
    pub return_reasons: Vec<super::types::ReturnReason>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnItemDto {
    pub item_id: LineItemId,
    pub title: String,
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnDto {
    pub id: ReturnId,
    pub order_id: OrderId,
    #[serde(default)]
    pub order_display_id: Option<i64>,
    pub kind: ReturnKind,
    pub status: ReturnStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<ReturnItemDto>,
    #[serde(default)]
    pub refund_amount: Option<i64>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnEnvelope {
    #[serde(rename = "return")]
    pub return_request: ReturnDto,
}

#[derive(Debug, Deserialize)]
pub struct ReturnListDto {
    pub returns: Vec<ReturnDto>,
}

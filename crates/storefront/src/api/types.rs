//! Domain types for the commerce backend.
//!
//! These are the validated, storefront-friendly shapes produced by
//! [`super::conversions`] from the raw wire DTOs in [`super::dto`]. Money is
//! always paired with its currency and quantities are unsigned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vernont_core::{
    AddressId, CartId, CurrencyCode, CustomerId, FulfillmentStatus, LineItemId, Money, OrderId,
    OrderStatus, PaymentStatus, ProductId, ReturnId, ReturnKind, ReturnStatus, ReviewId,
    ShippingOptionId, VariantId,
};

// =============================================================================
// Store Settings
// =============================================================================

/// Storefront-wide configuration owned by the backend.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Display name of the store.
    pub name: String,
    /// Currency used when the visitor has not chosen one.
    pub default_currency: CurrencyCode,
    /// Currencies the visitor may switch between.
    pub currencies: Vec<CurrencyCode>,
    /// Free-shipping thresholds, one per currency at most.
    pub free_shipping_thresholds: Vec<Money>,
    /// Customer service address.
    pub support_email: Option<String>,
    /// Days after delivery during which returns are accepted.
    pub return_window_days: u32,
}

impl StoreSettings {
    /// Whether `currency` can be selected.
    #[must_use]
    pub fn supports(&self, currency: CurrencyCode) -> bool {
        self.currencies.contains(&currency)
    }

    /// Free-shipping threshold for `currency`, if the store offers one.
    #[must_use]
    pub fn free_shipping_threshold(&self, currency: CurrencyCode) -> Option<Money> {
        self.free_shipping_thresholds
            .iter()
            .copied()
            .find(|m| m.currency == currency)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            name: "Vernont".to_string(),
            default_currency: CurrencyCode::USD,
            currencies: vec![CurrencyCode::USD],
            free_shipping_thresholds: Vec::new(),
            support_email: None,
            return_window_days: 30,
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Product image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub url: String,
    pub alt: Option<String>,
}

/// Olfactory pyramid of a fragrance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragranceNotes {
    pub top: Vec<String>,
    pub heart: Vec<String>,
    pub base: Vec<String>,
}

impl FragranceNotes {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.heart.is_empty() && self.base.is_empty()
    }
}

/// Purchasable variant (usually a bottle size).
#[derive(Debug, Clone)]
pub struct Variant {
    pub id: VariantId,
    pub title: String,
    pub sku: Option<String>,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    /// `None` when the backend does not track inventory for the variant.
    pub inventory_quantity: Option<u32>,
    pub allow_backorder: bool,
}

impl Variant {
    /// Units at or below which the page shows a low-stock hint.
    pub const LOW_STOCK_THRESHOLD: u32 = 3;

    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.allow_backorder || self.inventory_quantity.is_none_or(|q| q > 0)
    }

    #[must_use]
    pub fn low_stock(&self) -> bool {
        !self.allow_backorder
            && self
                .inventory_quantity
                .is_some_and(|q| q > 0 && q <= Self::LOW_STOCK_THRESHOLD)
    }

    /// Whether the variant is discounted against its compare-at price.
    #[must_use]
    pub fn on_sale(&self) -> bool {
        self.compare_at_price
            .is_some_and(|c| c.currency == self.price.currency && c.amount > self.price.amount)
    }
}

/// Average rating as reported on product listings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub count: u32,
}

/// A fragrance in the catalog.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub handle: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: String,
    pub brand: Option<String>,
    /// Concentration such as "Eau de Parfum".
    pub concentration: Option<String>,
    pub category: Option<String>,
    pub thumbnail: Option<Image>,
    pub images: Vec<Image>,
    pub notes: FragranceNotes,
    pub variants: Vec<Variant>,
    pub rating: Option<RatingSummary>,
    pub tags: Vec<String>,
}

impl Product {
    /// Lowest variant price, used for "from" pricing on cards.
    #[must_use]
    pub fn lowest_price(&self) -> Option<Money> {
        self.variants
            .iter()
            .map(|v| v.price)
            .min_by_key(|m| m.amount)
    }

    /// Look up a variant by id.
    #[must_use]
    pub fn variant(&self, id: &VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| &v.id == id)
    }

    /// First variant in stock, falling back to the first variant.
    #[must_use]
    pub fn default_variant(&self) -> Option<&Variant> {
        self.variants
            .iter()
            .find(|v| v.in_stock())
            .or_else(|| self.variants.first())
    }

    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.variants.iter().any(Variant::in_stock)
    }
}

/// One page of products.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub count: u32,
    pub offset: u32,
    pub limit: u32,
}

impl ProductPage {
    /// 1-based index of this page.
    #[must_use]
    pub const fn current_page(&self) -> u32 {
        if self.limit == 0 {
            1
        } else {
            self.offset / self.limit + 1
        }
    }

    #[must_use]
    pub const fn total_pages(&self) -> u32 {
        if self.limit == 0 || self.count == 0 {
            1
        } else {
            self.count.div_ceil(self.limit)
        }
    }
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProductSort {
    #[default]
    Featured,
    Newest,
    PriceAsc,
    PriceDesc,
    BestSelling,
}

impl ProductSort {
    pub const ALL: [Self; 5] = [
        Self::Featured,
        Self::Newest,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::BestSelling,
    ];

    /// Parse the `sort` query parameter, defaulting to `Featured`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .unwrap_or_default()
    }

    /// Value used in storefront URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::Newest => "newest",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::BestSelling => "best-selling",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Featured => "Featured",
            Self::Newest => "Newest",
            Self::PriceAsc => "Price: low to high",
            Self::PriceDesc => "Price: high to low",
            Self::BestSelling => "Best selling",
        }
    }

    /// Backend `order` parameter; `None` keeps the curated order.
    #[must_use]
    pub const fn order_param(self) -> Option<&'static str> {
        match self {
            Self::Featured => None,
            Self::Newest => Some("-created_at"),
            Self::PriceAsc => Some("price"),
            Self::PriceDesc => Some("-price"),
            Self::BestSelling => Some("-sales_count"),
        }
    }
}

/// Parameters of a product listing request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub sort: ProductSort,
    pub featured_only: bool,
    pub currency: CurrencyCode,
    pub limit: u32,
    pub offset: u32,
}

impl ProductQuery {
    /// Listing page `page` (1-based) of `per_page` products.
    #[must_use]
    pub fn page(currency: CurrencyCode, page: u32, per_page: u32) -> Self {
        Self {
            category: None,
            sort: ProductSort::default(),
            featured_only: false,
            currency,
            limit: per_page,
            offset: page.saturating_sub(1).saturating_mul(per_page),
        }
    }
}

// =============================================================================
// Reviews
// =============================================================================

/// A customer review.
#[derive(Debug, Clone)]
pub struct Review {
    pub id: ReviewId,
    pub author_name: String,
    /// 1 to 5 stars.
    pub rating: u8,
    pub title: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub verified_purchase: bool,
    pub helpful_count: u32,
}

/// Aggregate rating for a product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewSummary {
    pub average: f64,
    pub count: u32,
    /// Review counts for 5, 4, 3, 2 and 1 stars, in that order.
    pub distribution: [u32; 5],
}

/// One page of reviews.
#[derive(Debug, Clone)]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    pub count: u32,
    pub offset: u32,
    pub limit: u32,
    pub summary: ReviewSummary,
}

/// Sort order for reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewSort {
    #[default]
    Newest,
    Highest,
    Lowest,
    MostHelpful,
}

impl ReviewSort {
    pub const ALL: [Self; 4] = [Self::Newest, Self::Highest, Self::Lowest, Self::MostHelpful];

    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Highest => "highest",
            Self::Lowest => "lowest",
            Self::MostHelpful => "helpful",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Newest => "Most recent",
            Self::Highest => "Highest rated",
            Self::Lowest => "Lowest rated",
            Self::MostHelpful => "Most helpful",
        }
    }

    #[must_use]
    pub const fn order_param(self) -> &'static str {
        match self {
            Self::Newest => "-created_at",
            Self::Highest => "-rating",
            Self::Lowest => "rating",
            Self::MostHelpful => "-helpful_count",
        }
    }
}

/// Review submission.
#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
}

// =============================================================================
// Addresses & Customers
// =============================================================================

/// Postal address, identical on the wire and in the storefront.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub address_1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2, lower-case.
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Address {
    /// "First Last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Address lines for display, skipping empty parts.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.full_name()];
        if let Some(company) = self.company.as_deref().filter(|c| !c.is_empty()) {
            lines.push(company.to_string());
        }
        lines.push(self.address_1.clone());
        if let Some(line2) = self.address_2.as_deref().filter(|l| !l.is_empty()) {
            lines.push(line2.to_string());
        }
        let locality = match self.province.as_deref().filter(|p| !p.is_empty()) {
            Some(province) => format!("{}, {} {}", self.city, province, self.postal_code),
            None => format!("{} {}", self.city, self.postal_code),
        };
        lines.push(locality);
        lines.push(self.country_code.to_uppercase());
        lines
    }
}

/// Address saved on a customer account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAddress {
    pub id: AddressId,
    #[serde(flatten)]
    pub address: Address,
    #[serde(default)]
    pub is_default_shipping: bool,
}

/// Authenticated customer profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub addresses: Vec<SavedAddress>,
}

impl Customer {
    /// Name to greet the customer with.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.is_empty() => format!("{first} {last}"),
            (Some(first), _) if !first.is_empty() => first.to_string(),
            _ => self.email.clone(),
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    /// Bearer token for customer-scoped calls.
    pub token: String,
    pub customer: Customer,
}

/// Account registration payload.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Profile edit payload.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

// =============================================================================
// Cart
// =============================================================================

/// A line in the cart.
#[derive(Debug, Clone)]
pub struct LineItem {
    pub id: LineItemId,
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_handle: String,
    pub title: String,
    pub variant_title: Option<String>,
    pub thumbnail: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub total: Money,
}

/// Shipping method selected on the cart.
#[derive(Debug, Clone)]
pub struct ShippingMethod {
    pub shipping_option_id: ShippingOptionId,
    pub name: String,
    pub amount: Money,
}

/// Gift card applied to the cart.
#[derive(Debug, Clone)]
pub struct AppliedGiftCard {
    pub code: String,
    /// Remaining balance after this order, when disclosed.
    pub balance: Option<Money>,
}

/// State of the provider-side payment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSessionStatus {
    Pending,
    Authorized,
    RequiresMore,
    Error,
    Canceled,
}

/// Payment session attached to the cart.
#[derive(Debug, Clone)]
pub struct PaymentSession {
    pub provider_id: String,
    pub status: PaymentSessionStatus,
    /// Hosted payment page the customer must visit, if any.
    pub redirect_url: Option<String>,
}

/// Server-authoritative cart.
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: CartId,
    pub currency: CurrencyCode,
    pub email: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub items: Vec<LineItem>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub shipping_methods: Vec<ShippingMethod>,
    pub discount_codes: Vec<String>,
    pub gift_cards: Vec<AppliedGiftCard>,
    pub payment_session: Option<PaymentSession>,
    /// Payment providers the backend offers for this cart.
    pub payment_providers: Vec<String>,
    pub subtotal: Money,
    pub discount_total: Money,
    pub shipping_total: Money,
    pub tax_total: Money,
    pub gift_card_total: Money,
    pub total: Money,
    pub completed: bool,
}

impl Cart {
    /// Number of units in the cart: the sum of line quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, item| acc.saturating_add(item.quantity))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Line by id.
    #[must_use]
    pub fn line(&self, id: &LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == id)
    }
}

/// Partial cart update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CartUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<CurrencyCode>,
}

/// Shipping option offered for a cart.
#[derive(Debug, Clone)]
pub struct ShippingOption {
    pub id: ShippingOptionId,
    pub name: String,
    pub amount: Money,
    pub estimated_delivery: Option<String>,
}

/// Outcome of completing a cart.
#[derive(Debug, Clone)]
pub enum CartCompletion {
    /// The order was placed.
    Order(Box<Order>),
    /// Completion failed; the cart is returned with the backend's reason.
    Cart { cart: Box<Cart>, message: String },
}

// =============================================================================
// Orders
// =============================================================================

/// A purchased line.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: LineItemId,
    pub product_handle: Option<String>,
    pub title: String,
    pub variant_title: Option<String>,
    pub thumbnail: Option<String>,
    pub quantity: u32,
    pub returned_quantity: u32,
    pub unit_price: Money,
    pub total: Money,
}

impl OrderItem {
    /// Units that can still be returned or exchanged.
    #[must_use]
    pub const fn returnable_quantity(&self) -> u32 {
        self.quantity.saturating_sub(self.returned_quantity)
    }
}

/// A placed order.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub display_id: u64,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub payment_status: PaymentStatus,
    pub email: String,
    pub currency: CurrencyCode,
    pub items: Vec<OrderItem>,
    pub shipping_address: Option<Address>,
    pub shipping_methods: Vec<ShippingMethod>,
    pub subtotal: Money,
    pub discount_total: Money,
    pub shipping_total: Money,
    pub tax_total: Money,
    pub total: Money,
}

impl Order {
    /// Whether any line still has returnable units.
    #[must_use]
    pub fn has_returnable_items(&self) -> bool {
        self.items.iter().any(|i| i.returnable_quantity() > 0)
    }
}

/// One page of a customer's orders.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub count: u32,
    pub offset: u32,
    pub limit: u32,
}

// =============================================================================
// Returns & Exchanges
// =============================================================================

/// Reason a customer can pick for a return.
#[derive(Debug, Clone, Deserialize)]
pub struct ReturnReason {
    pub id: String,
    pub label: String,
}

/// Line of a submitted return.
#[derive(Debug, Clone)]
pub struct ReturnLine {
    pub item_id: LineItemId,
    pub title: String,
    pub quantity: u32,
    pub reason: Option<String>,
}

/// Return or exchange request as tracked by the backend.
#[derive(Debug, Clone)]
pub struct ReturnRequest {
    pub id: ReturnId,
    pub order_id: OrderId,
    pub order_display_id: Option<u64>,
    pub kind: ReturnKind,
    pub status: ReturnStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<ReturnLine>,
    pub refund_amount: Option<Money>,
}

/// Line of a new return request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReturnItem {
    pub item_id: LineItemId,
    pub quantity: u32,
    pub reason_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_variant_id: Option<VariantId>,
}

/// New return or exchange request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReturn {
    pub order_id: OrderId,
    pub kind: ReturnKind,
    pub items: Vec<NewReturnItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

//! Cart route handlers.
//!
//! Cart operations use HTMX for in-place updates. The cart id lives in the
//! session; totals always come from the latest backend response.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use vernont_core::{CurrencyCode, LineItemId, Money, VariantId};

use crate::api::{ApiError, Cart};
use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::models::session;
use crate::state::AppState;

use super::is_htmx;

/// Largest quantity accepted for a single line.
pub const MAX_LINE_QUANTITY: u32 = 10;

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Clone)]
pub struct CartLineView {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub variant_title: Option<String>,
    pub thumbnail: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub total: String,
}

/// Progress toward free shipping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeShippingView {
    /// Amount still missing, `None` once the threshold is reached.
    pub remaining: Option<String>,
    /// 0 to 100.
    pub percent: u32,
}

impl FreeShippingView {
    /// Progress of `subtotal` toward `threshold`; `None` without a threshold
    /// in the cart's currency.
    #[must_use]
    pub fn new(subtotal: Money, threshold: Option<Money>) -> Option<Self> {
        let threshold = threshold.filter(|t| t.currency == subtotal.currency && t.amount > 0)?;
        let percent = if subtotal.amount >= threshold.amount {
            100
        } else {
            u32::try_from(subtotal.amount.max(0).saturating_mul(100) / threshold.amount)
                .unwrap_or_default()
        };
        Some(Self {
            remaining: subtotal.remaining_until(threshold).map(|m| m.to_string()),
            percent,
        })
    }
}

/// Cart display data, shared with the checkout summary.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: u32,
    pub currency: CurrencyCode,
    pub subtotal: String,
    pub discount_total: Option<String>,
    pub shipping_total: Option<String>,
    pub tax_total: Option<String>,
    pub gift_card_total: Option<String>,
    pub total: String,
    pub discount_codes: Vec<String>,
    pub gift_cards: Vec<GiftCardView>,
    pub free_shipping: Option<FreeShippingView>,
}

#[derive(Debug, Clone)]
pub struct GiftCardView {
    pub code: String,
    pub balance: Option<String>,
}

pub(crate) fn non_zero(money: Money) -> Option<String> {
    (!money.is_zero()).then(|| money.to_string())
}

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, free_shipping_threshold: Option<Money>) -> Self {
        Self {
            items: cart
                .items
                .iter()
                .map(|item| CartLineView {
                    id: item.id.to_string(),
                    handle: item.product_handle.clone(),
                    title: item.title.clone(),
                    variant_title: item.variant_title.clone(),
                    thumbnail: item.thumbnail.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price.to_string(),
                    total: item.total.to_string(),
                })
                .collect(),
            item_count: cart.item_count(),
            currency: cart.currency,
            subtotal: cart.subtotal.to_string(),
            discount_total: non_zero(cart.discount_total),
            shipping_total: (!cart.shipping_methods.is_empty())
                .then(|| cart.shipping_total.to_string()),
            tax_total: non_zero(cart.tax_total),
            gift_card_total: non_zero(cart.gift_card_total),
            total: cart.total.to_string(),
            discount_codes: cart.discount_codes.clone(),
            gift_cards: cart
                .gift_cards
                .iter()
                .map(|card| GiftCardView {
                    code: card.code.clone(),
                    balance: card.balance.map(|b| b.to_string()),
                })
                .collect(),
            free_shipping: FreeShippingView::new(cart.subtotal, free_shipping_threshold),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.item_count == 0
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// The visitor's open cart, if any.
///
/// A cart the backend no longer knows, or one already turned into an order,
/// is forgotten.
pub(crate) async fn load_cart(state: &AppState, session: &Session) -> Result<Option<Cart>> {
    let Some(cart_id) = session::cart_id(session).await else {
        return Ok(None);
    };

    match state.commerce().get_cart(&cart_id).await {
        Ok(cart) if !cart.completed => Ok(Some(cart)),
        Ok(_) => {
            tracing::info!(cart_id = %cart_id, "Dropping completed cart from session");
            session::clear_cart(session).await?;
            Ok(None)
        }
        Err(ApiError::NotFound(_)) => {
            tracing::info!(cart_id = %cart_id, "Dropping unknown cart from session");
            session::clear_cart(session).await?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// The visitor's open cart, creating one in their currency when needed.
pub(crate) async fn ensure_cart(state: &AppState, session: &Session) -> Result<Cart> {
    if let Some(cart) = load_cart(state, session).await? {
        return Ok(cart);
    }

    let currency = state.resolve_currency(session::currency(session).await).await;
    let cart = state.commerce().create_cart(currency).await?;
    session::set_cart_id(session, &cart.id).await?;
    tracing::info!(cart_id = %cart.id, currency = %currency, "Created cart");
    Ok(cart)
}

async fn cart_view(state: &AppState, cart: &Cart) -> CartView {
    let threshold = state.settings().await.free_shipping_threshold(cart.currency);
    CartView::new(cart, threshold)
}

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub variant_id: String,
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: Option<CartView>,
    pub message: Option<String>,
}

/// Cart contents fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "cart/_contents.html")]
pub struct CartContentsTemplate {
    pub cart: Option<CartView>,
    pub message: Option<String>,
}

/// Add-to-cart confirmation with an out-of-band count badge (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "cart/added.html")]
pub struct CartAddedTemplate {
    pub count: u32,
    pub message: Option<String>,
}

/// Cart count badge fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart page.
#[instrument(skip(state, session, layout))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let cart = match load_cart(&state, &session).await? {
        Some(cart) => Some(cart_view(&state, &cart).await),
        None => None,
    };
    Ok(CartShowTemplate {
        layout,
        cart,
        message: None,
    })
}

/// Add a variant to the cart.
///
/// HTMX requests get a confirmation fragment and `HX-Trigger: cart-updated`;
/// plain form posts are redirected to the cart.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let quantity = form.quantity.unwrap_or(1);
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        let message = format!("Choose a quantity from 1 to {MAX_LINE_QUANTITY}");
        return Ok(rejected_add(&state, &session, &headers, message).await);
    }

    let cart = ensure_cart(&state, &session).await?;
    let variant_id = VariantId::new(form.variant_id.trim());

    match state
        .commerce()
        .add_line_item(&cart.id, &variant_id, quantity)
        .await
    {
        Ok(cart) => {
            tracing::info!(cart_id = %cart.id, variant_id = %variant_id, quantity, "Added to cart");
            if !is_htmx(&headers) {
                return Ok(Redirect::to("/cart").into_response());
            }
            Ok((
                AppendHeaders([("HX-Trigger", "cart-updated")]),
                CartAddedTemplate {
                    count: cart.item_count(),
                    message: None,
                },
            )
                .into_response())
        }
        Err(e) if e.is_rejection() => {
            let message = e
                .user_message()
                .unwrap_or("This item could not be added")
                .to_string();
            Ok(rejected_add(&state, &session, &headers, message).await)
        }
        Err(e) => Err(e.into()),
    }
}

async fn rejected_add(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    message: String,
) -> Response {
    if !is_htmx(headers) {
        return (StatusCode::UNPROCESSABLE_ENTITY, message).into_response();
    }
    let count = match load_cart(state, session).await {
        Ok(Some(cart)) => cart.item_count(),
        _ => 0,
    };
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        CartAddedTemplate {
            count,
            message: Some(message),
        },
    )
        .into_response()
}

/// Change a line's quantity; zero removes the line.
#[instrument(skip(state, session, headers))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    if form.quantity > MAX_LINE_QUANTITY {
        let message = format!("Choose a quantity from 1 to {MAX_LINE_QUANTITY}");
        return contents_response(&state, &session, &headers, Some(message)).await;
    }

    let Some(cart) = load_cart(&state, &session).await? else {
        return contents_response(&state, &session, &headers, None).await;
    };
    let line_id = LineItemId::new(form.line_id);

    let result = if form.quantity == 0 {
        state.commerce().remove_line_item(&cart.id, &line_id).await
    } else {
        state
            .commerce()
            .update_line_item(&cart.id, &line_id, form.quantity)
            .await
    };
    mutation_response(&state, &session, &headers, result).await
}

/// Remove a line.
#[instrument(skip(state, session, headers))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let Some(cart) = load_cart(&state, &session).await? else {
        return contents_response(&state, &session, &headers, None).await;
    };
    let result = state
        .commerce()
        .remove_line_item(&cart.id, &LineItemId::new(form.line_id))
        .await;
    mutation_response(&state, &session, &headers, result).await
}

/// Render the outcome of a line mutation.
///
/// A rejected change re-renders the unchanged cart with the backend's
/// message, so HTMX swaps it in place of the contents.
async fn mutation_response(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    result: std::result::Result<Cart, ApiError>,
) -> Result<Response> {
    match result {
        Ok(cart) => {
            if !is_htmx(headers) {
                return Ok(Redirect::to("/cart").into_response());
            }
            let view = cart_view(state, &cart).await;
            Ok((
                AppendHeaders([("HX-Trigger", "cart-updated")]),
                CartContentsTemplate {
                    cart: Some(view),
                    message: None,
                },
            )
                .into_response())
        }
        Err(e) if e.is_rejection() => {
            tracing::warn!(error = %e, "Cart update rejected");
            let message = e
                .user_message()
                .unwrap_or("Your bag could not be updated")
                .to_string();
            if !is_htmx(headers) {
                return Ok((StatusCode::UNPROCESSABLE_ENTITY, message).into_response());
            }
            contents_response(state, session, headers, Some(message)).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Re-render the current cart, optionally with a message.
async fn contents_response(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    message: Option<String>,
) -> Result<Response> {
    if !is_htmx(headers) {
        return Ok(Redirect::to("/cart").into_response());
    }
    let cart = match load_cart(state, session).await? {
        Some(cart) => Some(cart_view(state, &cart).await),
        None => None,
    };
    let status = if message.is_some() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    Ok((status, CartContentsTemplate { cart, message }).into_response())
}

/// Cart count badge (for HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let count = match load_cart(&state, &session).await {
        Ok(cart) => cart.map_or(0, |c| c.item_count()),
        Err(e) => {
            tracing::warn!(error = %e, "Cart count unavailable");
            0
        }
    };
    CartCountTemplate { count }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::extract::Path;
    use axum::http::Request;
    use axum::routing::{get, post};
    use serde_json::json;

    use super::*;
    use crate::test_support::{TestApp, backend, body_text, cart_json, location};

    fn usd(amount: i64) -> Money {
        Money::new(amount, CurrencyCode::USD)
    }

    #[test]
    fn test_free_shipping_progress() {
        let progress = FreeShippingView::new(usd(12_500), Some(usd(50_000))).unwrap();
        assert_eq!(progress.percent, 25);
        assert_eq!(progress.remaining.as_deref(), Some("$375.00"));

        let reached = FreeShippingView::new(usd(60_000), Some(usd(50_000))).unwrap();
        assert_eq!(reached.percent, 100);
        assert!(reached.remaining.is_none());

        assert!(FreeShippingView::new(usd(100), None).is_none());
        assert!(
            FreeShippingView::new(usd(100), Some(Money::new(5_000, CurrencyCode::EUR))).is_none()
        );
    }

    fn htmx_form(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .header("hx-request", "true")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn cart_backend() -> axum::Router {
        backend()
            .route(
                "/store/carts",
                post(|| async { axum::Json(json!({ "cart": cart_json("cart_1", "usd", &[]) })) }),
            )
            .route(
                "/store/carts/{id}",
                get(|Path(id): Path<String>| async move {
                    axum::Json(json!({ "cart": cart_json(&id, "usd", &[("line_1", 2)]) }))
                }),
            )
            .route(
                "/store/carts/{id}/line-items",
                post(|Path(id): Path<String>| async move {
                    axum::Json(json!({ "cart": cart_json(&id, "usd", &[("line_1", 2), ("line_2", 1)]) }))
                }),
            )
    }

    #[tokio::test]
    async fn test_add_creates_cart_and_returns_badge() {
        let mut app = TestApp::new(cart_backend()).await;

        let response = app
            .send(htmx_form("/cart/add", "variant_id=variant_50&quantity=1"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["hx-trigger"], "cart-updated");
        let body = body_text(response).await;
        assert!(body.contains("Added to your bag"));
        assert!(body.contains(">3<"));

        let response = app.get("/cart/count").await;
        assert!(body_text(response).await.contains('2'));
    }

    #[tokio::test]
    async fn test_add_without_htmx_redirects_to_cart() {
        let mut app = TestApp::new(cart_backend()).await;
        let response = app
            .post_form("/cart/add", &[("variant_id", "variant_50")])
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/cart");
    }

    #[tokio::test]
    async fn test_add_rejects_out_of_range_quantity() {
        let mut app = TestApp::new(cart_backend()).await;
        let response = app
            .send(htmx_form("/cart/add", "variant_id=variant_50&quantity=11"))
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("from 1 to 10"));
    }

    #[tokio::test]
    async fn test_cart_page_shows_free_shipping_progress() {
        let mut app = TestApp::new(cart_backend()).await;
        app.send(htmx_form("/cart/add", "variant_id=variant_50")).await;

        let response = app.get("/cart").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Santal Noir"));
        assert!(body.contains("$370.00"));
        assert!(body.contains("$130.00 away from free shipping"));
    }

    fn line_backend() -> axum::Router {
        cart_backend().route(
            "/store/carts/{id}/line-items/{line}",
            post(|Path((id, _line)): Path<(String, String)>| async move {
                axum::Json(json!({ "cart": cart_json(&id, "usd", &[("line_1", 3)]) }))
            })
            .delete(|Path((id, _line)): Path<(String, String)>| async move {
                axum::Json(json!({ "cart": cart_json(&id, "usd", &[]) }))
            }),
        )
    }

    #[tokio::test]
    async fn test_update_changes_quantity() {
        let mut app = TestApp::new(line_backend()).await;
        app.send(htmx_form("/cart/add", "variant_id=variant_50")).await;

        let response = app
            .send(htmx_form("/cart/update", "line_id=line_1&quantity=3"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["hx-trigger"], "cart-updated");
        let body = body_text(response).await;
        assert!(body.contains("id=\"cart-contents\""));
        assert!(body.contains("$555.00"));
    }

    #[tokio::test]
    async fn test_update_to_zero_removes_line() {
        let mut app = TestApp::new(line_backend()).await;
        app.send(htmx_form("/cart/add", "variant_id=variant_50")).await;

        let response = app
            .send(htmx_form("/cart/update", "line_id=line_1&quantity=0"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Your bag is empty"));
    }

    #[tokio::test]
    async fn test_rejected_update_is_shown_inline() {
        let stub = cart_backend().route(
            "/store/carts/{id}/line-items/{line}",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    axum::Json(json!({ "message": "Only 2 left in stock" })),
                )
            }),
        );
        let mut app = TestApp::new(stub).await;
        app.send(htmx_form("/cart/add", "variant_id=variant_50")).await;

        let response = app
            .send(htmx_form("/cart/update", "line_id=line_1&quantity=5"))
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_text(response).await;
        assert!(body.contains("Only 2 left in stock"));
        assert!(body.contains("id=\"cart-contents\""));
        assert!(body.contains("Santal Noir"));
    }

    #[tokio::test]
    async fn test_currency_switcher_returns_to_cart() {
        let mut app = TestApp::new(cart_backend()).await;
        let body = body_text(app.get("/cart").await).await;
        assert!(body.contains("name=\"return_to\" value=\"/cart\""));
    }

    #[tokio::test]
    async fn test_unknown_cart_is_forgotten() {
        let stub = backend()
            .route(
                "/store/carts",
                post(|| async { axum::Json(json!({ "cart": cart_json("cart_1", "usd", &[]) })) }),
            )
            .route(
                "/store/carts/{id}",
                get(|| async {
                    (
                        StatusCode::NOT_FOUND,
                        axum::Json(json!({ "message": "Cart not found" })),
                    )
                }),
            )
            .route(
                "/store/carts/{id}/line-items",
                post(|Path(id): Path<String>| async move {
                    axum::Json(json!({ "cart": cart_json(&id, "usd", &[("line_1", 1)]) }))
                }),
            );
        let mut app = TestApp::new(stub).await;
        app.send(htmx_form("/cart/add", "variant_id=variant_50")).await;

        let response = app.get("/cart").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Your bag is empty"));
    }
}

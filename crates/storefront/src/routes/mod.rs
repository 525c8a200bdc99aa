//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Home page
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (database + commerce backend)
//!
//! # Catalog
//! GET  /products                - Product listing (?category=&sort=&page=)
//! GET  /products/{handle}       - Product detail with reviews
//! POST /products/{handle}/reviews - Submit a review (requires sign-in)
//! POST /reviews/{id}/helpful    - Helpful vote (HTMX fragment)
//! GET  /search                  - Search page
//! GET  /search/suggest          - Suggestions dropdown (HTMX fragment)
//! POST /search/recent/clear     - Forget recent searches
//!
//! # Cart (HTMX fragments)
//! GET  /cart                    - Cart page
//! POST /cart/add                - Add a variant (triggers cart-updated)
//! POST /cart/update             - Change a quantity
//! POST /cart/remove             - Remove a line
//! GET  /cart/count              - Badge fragment
//!
//! # Checkout (mutations are rate limited)
//! GET  /checkout                - Wizard at the current step
//! POST /checkout/step           - Move between steps
//! POST /checkout/information    - Contact and shipping address
//! POST /checkout/shipping       - Shipping method
//! POST /checkout/discount[/remove]  - Promo code
//! POST /checkout/gift-card[/remove] - Gift card
//! POST /checkout/payment        - Place the order
//! GET  /checkout/complete       - Return from the hosted payment page
//! GET  /order/confirmed/{id}    - Confirmation
//!
//! # Wishlist and preferences
//! GET  /wishlist                - Saved products
//! POST /wishlist/toggle         - Save or unsave (HTMX fragment)
//! POST /wishlist/remove         - Remove from the wishlist page
//! POST /preferences/currency    - Switch display currency
//!
//! # Auth (form posts are rate limited)
//! GET|POST /auth/login
//! GET|POST /auth/register
//! GET|POST /auth/forgot-password
//! GET|POST /auth/reset-password
//! POST /auth/logout
//!
//! # Account (requires sign-in)
//! GET|POST /account/profile
//! GET  /account/orders, /account/orders/{id}
//! GET|POST /account/orders/{id}/return
//! GET  /account/returns
//! GET|POST /account/addresses
//! GET  /account/addresses/new, /account/addresses/{id}/edit
//! POST /account/addresses/{id}, /account/addresses/{id}/delete
//! ```

pub mod account;
pub mod addresses;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod home;
pub mod preferences;
pub mod products;
pub mod returns;
pub mod reviews;
pub mod search;
pub mod wishlist;

use axum::{
    Router,
    http::HeaderMap,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::error::AppError;
use crate::middleware::rate_limit::RateLimiterLayer;
use crate::middleware::session::StorefrontSessionLayer;
use crate::middleware::{
    auth_rate_limiter, checkout_rate_limiter, csp_nonce_middleware, make_request_span,
    request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Static assets, relative to the workspace root.
const STATIC_DIR: &str = "crates/storefront/static";

/// Whether the request was issued by HTMX.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("hx-request")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "true")
}

/// Accept a post-action redirect target only if it stays on this site.
#[must_use]
pub fn safe_return_path(path: Option<&str>) -> Option<String> {
    let path = path?.trim();
    let same_site = path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.contains("://")
        && !path.chars().any(char::is_control);
    same_site.then(|| path.to_string())
}

fn rate_limited(router: Router<AppState>, limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    match limiter {
        Some(limiter) => router.route_layer(limiter),
        None => {
            tracing::warn!("Serving routes without a rate limit");
            router
        }
    }
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{handle}", get(products::show))
        .route("/products/{handle}/reviews", post(reviews::create))
        .route("/reviews/{id}/helpful", post(reviews::helpful))
        .route("/search", get(search::search_page))
        .route("/search/suggest", get(search::suggest))
        .route("/search/recent/clear", post(search::clear_recent))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    let mutations = Router::new()
        .route("/checkout/step", post(checkout::step))
        .route("/checkout/information", post(checkout::information))
        .route("/checkout/shipping", post(checkout::shipping))
        .route("/checkout/discount", post(checkout::discount))
        .route("/checkout/discount/remove", post(checkout::remove_discount))
        .route("/checkout/gift-card", post(checkout::gift_card))
        .route("/checkout/gift-card/remove", post(checkout::remove_gift_card))
        .route("/checkout/payment", post(checkout::payment));

    Router::new()
        .route("/checkout", get(checkout::show))
        .route("/checkout/complete", get(checkout::complete))
        .route("/order/confirmed/{id}", get(checkout::confirmed))
        .merge(rate_limited(mutations, checkout_rate_limiter()))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let submissions = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password));

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/forgot-password", get(auth::forgot_password_page))
        .route("/reset-password", get(auth::reset_password_page))
        .route("/logout", post(auth::logout))
        .merge(rate_limited(submissions, auth_rate_limiter()))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route(
            "/profile",
            get(account::profile_page).post(account::update_profile),
        )
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
        .route(
            "/orders/{id}/return",
            get(returns::new_page).post(returns::create),
        )
        .route("/returns", get(returns::index))
        .route(
            "/addresses",
            get(addresses::index).post(addresses::create),
        )
        .route("/addresses/new", get(addresses::new_page))
        .route("/addresses/{id}", post(addresses::update))
        .route("/addresses/{id}/edit", get(addresses::edit_page))
        .route("/addresses/{id}/delete", post(addresses::delete))
}

/// Create the wishlist and preference routes router.
pub fn visitor_routes() -> Router<AppState> {
    Router::new()
        .route("/wishlist", get(wishlist::show))
        .route("/wishlist/toggle", post(wishlist::toggle))
        .route("/wishlist/remove", post(wishlist::remove))
        .route("/preferences/currency", post(preferences::set_currency))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .merge(checkout_routes())
        .merge(visitor_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .fallback(not_found)
}

async fn not_found() -> AppError {
    AppError::NotFound("page".to_string())
}

/// The storefront application with its middleware stack.
///
/// Sentry layers are added by the binary so tests can build the same app.
pub fn app<S: SessionStore + Clone>(state: AppState, sessions: StorefrontSessionLayer<S>) -> Router {
    routes()
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(sessions)
        .layer(from_fn_with_state(state.clone(), security_headers_middleware))
        .layer(from_fn(csp_nonce_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{HeaderValue, StatusCode};

    use super::*;
    use crate::test_support::{TestApp, backend};

    #[test]
    fn test_safe_return_path() {
        assert_eq!(
            safe_return_path(Some("/products?sort=newest")).as_deref(),
            Some("/products?sort=newest")
        );
        assert_eq!(safe_return_path(Some("//evil.example.com")), None);
        assert_eq!(safe_return_path(Some("https://evil.example.com")), None);
        assert_eq!(safe_return_path(Some("/\\evil.example.com")), None);
        assert_eq!(safe_return_path(Some("/redirect?to=https://x")), None);
        assert_eq!(safe_return_path(Some("products")), None);
        assert_eq!(safe_return_path(Some("/\t/evil.example.com")), None);
        assert_eq!(safe_return_path(Some("/\n/evil.example.com")), None);
        assert_eq!(safe_return_path(Some("/\r\n/evil.example.com")), None);
        assert_eq!(safe_return_path(None), None);
    }

    #[test]
    fn test_is_htmx() {
        let mut headers = HeaderMap::new();
        assert!(!is_htmx(&headers));
        headers.insert("HX-Request", HeaderValue::from_static("true"));
        assert!(is_htmx(&headers));
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_with_security_headers() {
        let mut app = TestApp::new(backend()).await;
        let response = app.get("/no-such-page").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert!(
            response.headers()["content-security-policy"]
                .to_str()
                .unwrap()
                .contains("'nonce-")
        );
        assert!(response.headers().contains_key("x-request-id"));
    }
}

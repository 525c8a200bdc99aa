//! Shared helpers for unit tests: an in-process stub backend, JSON fixtures
//! shaped like the commerce API, and a session-aware harness for the router.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderValue, Request, Response, header};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use url::Url;

use crate::api::CommerceClient;
use crate::config::{CommerceApiConfig, SentryConfig, StorefrontConfig};
use crate::state::AppState;

// =============================================================================
// Stub Backend
// =============================================================================

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_backend(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

fn commerce_config(base_url: Url) -> CommerceApiConfig {
    CommerceApiConfig {
        base_url,
        publishable_key: "pk_test".to_string(),
        timeout: Duration::from_secs(5),
    }
}

/// Client pointed at a stub backend.
pub fn test_client(base_url: Url) -> CommerceClient {
    CommerceClient::new(&commerce_config(base_url)).unwrap()
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn product_json(id: &str, handle: &str) -> Value {
    json!({
        "id": id,
        "handle": handle,
        "title": "Santal Noir",
        "description": "Sandalwood, cardamom and smoked leather.",
        "brand": "Vernont",
        "concentration": "Eau de Parfum",
        "thumbnail": "https://img.vernont.com/santal-noir.jpg",
        "notes": { "top": ["Cardamom"], "heart": ["Iris"], "base": ["Sandalwood", "Leather"] },
        "variants": [
            {
                "id": "variant_50",
                "title": "50 ml",
                "calculated_price": { "calculated_amount": 18500, "original_amount": 18500, "currency_code": "usd" },
                "inventory_quantity": 8
            },
            {
                "id": "variant_100",
                "title": "100 ml",
                "calculated_price": { "calculated_amount": 26000, "original_amount": 26000, "currency_code": "usd" },
                "inventory_quantity": 2
            }
        ],
        "rating": { "average": 4.5, "count": 2 }
    })
}

/// A cart whose lines each cost 185.00 per unit.
pub fn cart_json(id: &str, currency: &str, lines: &[(&str, u64)]) -> Value {
    let items: Vec<Value> = lines
        .iter()
        .map(|(line_id, quantity)| {
            json!({
                "id": line_id,
                "variant_id": "variant_50",
                "product_id": "prod_1",
                "product_handle": "santal-noir",
                "title": "Santal Noir",
                "variant_title": "50 ml",
                "quantity": quantity,
                "unit_price": 18500,
                "total": 18500 * quantity
            })
        })
        .collect();
    let subtotal: u64 = lines.iter().map(|(_, q)| 18500 * q).sum();

    json!({
        "id": id,
        "currency_code": currency,
        "items": items,
        "payment_providers": ["stripe"],
        "subtotal": subtotal,
        "total": subtotal
    })
}

pub fn order_json(id: &str, display_id: u64) -> Value {
    json!({
        "id": id,
        "display_id": display_id,
        "created_at": "2026-05-04T10:15:00Z",
        "status": "pending",
        "fulfillment_status": "delivered",
        "payment_status": "captured",
        "email": "claire@maison.fr",
        "currency_code": "usd",
        "items": [{
            "id": "item_1",
            "product_handle": "santal-noir",
            "title": "Santal Noir",
            "variant_title": "50 ml",
            "quantity": 2,
            "unit_price": 18500,
            "total": 37000
        }],
        "shipping_address": address_json(),
        "shipping_methods": [{ "shipping_option_id": "so_standard", "name": "Standard", "amount": 0 }],
        "subtotal": 37000,
        "total": 37000
    })
}

pub fn address_json() -> Value {
    json!({
        "first_name": "Claire",
        "last_name": "Moreau",
        "address_1": "12 Rue du Bac",
        "city": "Paris",
        "postal_code": "75007",
        "country_code": "fr"
    })
}

pub fn customer_json() -> Value {
    let mut address = address_json();
    address["id"] = "addr_1".into();
    address["is_default_shipping"] = true.into();
    json!({
        "id": "cus_1",
        "email": "claire@maison.fr",
        "first_name": "Claire",
        "last_name": "Moreau",
        "addresses": [address]
    })
}

pub fn settings_json() -> Value {
    json!({
        "store": {
            "name": "Vernont",
            "default_currency_code": "usd",
            "currencies": ["usd", "eur"],
            "free_shipping_thresholds": [{ "amount": 50000, "currency_code": "usd" }],
            "support_email": "care@vernont.com",
            "return_window_days": 30
        }
    })
}

// =============================================================================
// Router Harness
// =============================================================================

pub fn test_config(commerce_url: Url) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/vernont_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: Url::parse("http://localhost:3000").unwrap(),
        session_secret: SecretString::from("k3J9x2QmZ7vL0pR4tY8wB1nC6hF5dG"),
        commerce: commerce_config(commerce_url),
        image_host: None,
        sentry: SentryConfig::default(),
    }
}

/// The full storefront router over a stub backend, with sessions held in
/// memory and replayed through a cookie.
pub struct TestApp {
    router: Router,
    cookie: Option<HeaderValue>,
}

impl TestApp {
    pub async fn new(backend: Router) -> Self {
        let config = test_config(spawn_backend(backend).await);
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(config.database_url.expose_secret())
            .unwrap();
        let sessions = crate::middleware::session::configure(MemoryStore::default(), &config);
        let state = AppState::new(config, pool).unwrap();
        Self {
            router: crate::routes::app(state, sessions),
            cookie: None,
        }
    }

    pub async fn send(&mut self, mut request: Request<Body>) -> Response<Body> {
        let headers = request.headers_mut();
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.7"));
        if let Some(cookie) = &self.cookie {
            headers.insert(header::COOKIE, cookie.clone());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            let pair = set_cookie.split(';').next().unwrap_or_default();
            self.cookie = Some(HeaderValue::from_str(pair).unwrap());
        }
        response
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_form(&mut self, uri: &str, form: &[(&str, &str)]) -> Response<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Stub backend serving store settings and the catalog. Tests add the
/// routes they exercise.
pub fn backend() -> Router {
    use axum::extract::Path;
    use axum::routing::get;

    Router::new()
        .route("/store/settings", get(|| async { axum::Json(settings_json()) }))
        .route(
            "/store/products",
            get(|| async {
                axum::Json(json!({
                    "products": [product_json("prod_1", "santal-noir")],
                    "count": 1,
                    "offset": 0,
                    "limit": 12
                }))
            }),
        )
        .route(
            "/store/products/{handle}",
            get(|Path(handle): Path<String>| async move {
                axum::Json(json!({ "product": product_json("prod_1", &handle) }))
            }),
        )
}

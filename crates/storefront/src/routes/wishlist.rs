//! Wishlist route handlers.
//!
//! The wishlist is a list of product ids in the session. Products are loaded
//! from the backend on display; ids it no longer returns are dropped.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use vernont_core::ProductId;

use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::models::session;
use crate::state::AppState;

use super::products::ProductCardView;
use super::{is_htmx, safe_return_path};

#[derive(Debug, Deserialize)]
pub struct WishlistForm {
    pub product_id: String,
    pub return_to: Option<String>,
}

/// Fields the wishlist button reads.
#[derive(Debug, Clone)]
pub struct WishlistButtonView {
    pub id: String,
    pub in_wishlist: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "wishlist/show.html")]
pub struct WishlistTemplate {
    pub layout: Layout,
    pub products: Vec<ProductCardView>,
}

/// Wishlist toggle button (HTMX fragment).
#[derive(Template, WebTemplate)]
#[template(path = "partials/wishlist_button.html")]
pub struct WishlistButtonTemplate {
    pub card: WishlistButtonView,
}

/// Display the saved products.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let mut wishlist = session::wishlist(&session).await;
    let products = state
        .commerce()
        .products_by_ids(wishlist.ids(), layout.currency)
        .await?;

    let known: Vec<ProductId> = products.iter().map(|p| p.id.clone()).collect();
    let dropped = wishlist.retain_known(&known);
    if dropped > 0 {
        tracing::info!(dropped, "Dropped unknown products from wishlist");
        session::set_wishlist(&session, &wishlist).await?;
    }

    // Keep the order the customer saved them in.
    let cards = wishlist
        .ids()
        .iter()
        .filter_map(|id| products.iter().find(|p| &p.id == id))
        .map(|p| ProductCardView::new(p, &wishlist))
        .collect();

    Ok(WishlistTemplate {
        layout,
        products: cards,
    })
}

/// Save or unsave a product.
#[instrument(skip(headers, session, form), fields(product_id = %form.product_id))]
pub async fn toggle(
    headers: HeaderMap,
    session: Session,
    Form(form): Form<WishlistForm>,
) -> Result<Response> {
    let product_id = ProductId::new(form.product_id.trim());
    let mut wishlist = session::wishlist(&session).await;
    let saved = wishlist.toggle(product_id.clone());
    session::set_wishlist(&session, &wishlist).await?;
    tracing::debug!(saved, "Wishlist toggled");

    if is_htmx(&headers) {
        return Ok((
            AppendHeaders([("HX-Trigger", "wishlist-updated")]),
            WishlistButtonTemplate {
                card: WishlistButtonView {
                    id: product_id.to_string(),
                    in_wishlist: saved,
                },
            },
        )
            .into_response());
    }

    let back = safe_return_path(form.return_to.as_deref()).unwrap_or_else(|| "/wishlist".to_string());
    Ok(Redirect::to(&back).into_response())
}

/// Remove a product from the wishlist page.
#[instrument(skip(headers, session, form), fields(product_id = %form.product_id))]
pub async fn remove(
    headers: HeaderMap,
    session: Session,
    Form(form): Form<WishlistForm>,
) -> Result<Response> {
    let mut wishlist = session::wishlist(&session).await;
    if wishlist.remove(&ProductId::new(form.product_id.trim())) {
        session::set_wishlist(&session, &wishlist).await?;
    }

    if is_htmx(&headers) {
        // The card is swapped out with an empty body.
        Ok(AppendHeaders([("HX-Trigger", "wishlist-updated")]).into_response())
    } else {
        Ok(Redirect::to("/wishlist").into_response())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};

    use crate::test_support::{TestApp, backend, body_text, location};

    fn htmx_toggle(product_id: &str) -> Request<Body> {
        Request::post("/wishlist/toggle")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("HX-Request", "true")
            .body(Body::from(format!("product_id={product_id}")))
            .unwrap()
    }

    #[tokio::test]
    async fn test_toggle_returns_button_fragment() {
        let mut app = TestApp::new(backend()).await;

        let response = app.send(htmx_toggle("prod_1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["HX-Trigger"], "wishlist-updated");
        let body = body_text(response).await;
        assert!(body.contains("Saved"));
        assert!(body.contains("aria-pressed=\"true\""));

        let body = body_text(app.send(htmx_toggle("prod_1")).await).await;
        assert!(body.contains("aria-pressed=\"false\""));
    }

    #[tokio::test]
    async fn test_toggle_without_htmx_redirects_back() {
        let mut app = TestApp::new(backend()).await;
        let response = app
            .post_form(
                "/wishlist/toggle",
                &[("product_id", "prod_1"), ("return_to", "/products/santal-noir")],
            )
            .await;
        assert_eq!(location(&response), "/products/santal-noir");

        let response = app
            .post_form(
                "/wishlist/toggle",
                &[("product_id", "prod_2"), ("return_to", "https://evil.example.com")],
            )
            .await;
        assert_eq!(location(&response), "/wishlist");
    }

    #[tokio::test]
    async fn test_unknown_products_are_dropped() {
        // The stub backend only knows prod_1.
        let mut app = TestApp::new(backend()).await;
        app.post_form("/wishlist/toggle", &[("product_id", "prod_gone")]).await;
        app.post_form("/wishlist/toggle", &[("product_id", "prod_1")]).await;

        let body = body_text(app.get("/wishlist").await).await;
        assert!(body.contains("Santal Noir"));

        // prod_gone was forgotten: toggling it saves it again.
        let body = body_text(app.send(htmx_toggle("prod_gone")).await).await;
        assert!(body.contains("aria-pressed=\"true\""));
    }

    #[tokio::test]
    async fn test_remove() {
        let mut app = TestApp::new(backend()).await;
        app.post_form("/wishlist/toggle", &[("product_id", "prod_1")]).await;
        let response = app.post_form("/wishlist/remove", &[("product_id", "prod_1")]).await;
        assert_eq!(location(&response), "/wishlist");
        assert!(body_text(app.get("/wishlist").await).await.contains("Your wishlist is empty"));
    }
}

//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use crate::api::ProductQuery;
use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::models::session;
use crate::state::AppState;

use super::products::ProductCardView;

/// Products in the featured grid.
const FEATURED_COUNT: u32 = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home/index.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub featured: Vec<ProductCardView>,
}

/// Display the home page with the featured selection.
///
/// A failing catalog call degrades to a page without the grid.
#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let query = ProductQuery {
        featured_only: true,
        ..ProductQuery::page(layout.currency, 1, FEATURED_COUNT)
    };
    let wishlist = session::wishlist(&session).await;

    let featured = match state.commerce().list_products(&query).await {
        Ok(page) => page
            .products
            .iter()
            .map(|p| ProductCardView::new(p, &wishlist))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Featured products unavailable");
            Vec::new()
        }
    };

    Ok(HomeTemplate { layout, featured })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use serde_json::json;

    use crate::test_support::{TestApp, backend, body_text, settings_json};

    #[tokio::test]
    async fn test_home_shows_featured() {
        let mut app = TestApp::new(backend()).await;
        let response = app.get("/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Santal Noir"));
        assert!(body.contains("<title>Vernont</title>"));
    }

    #[tokio::test]
    async fn test_home_survives_catalog_outage() {
        let stub = Router::new()
            .route("/store/settings", get(|| async { axum::Json(settings_json()) }))
            .route(
                "/store/products",
                get(|| async {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        axum::Json(json!({ "message": "maintenance" })),
                    )
                }),
            );
        let mut app = TestApp::new(stub).await;
        let response = app.get("/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!body_text(response).await.contains("product-card"));
    }
}

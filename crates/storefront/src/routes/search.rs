//! Search route handlers.
//!
//! Queries go to the backend's product search on every request; nothing is
//! indexed locally. Submitted queries are remembered in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::models::session;
use crate::state::AppState;

use super::is_htmx;
use super::products::ProductCardView;

/// Results on the search page.
const SEARCH_LIMIT: u32 = 24;

/// Entries in the suggestions dropdown.
const SUGGEST_LIMIT: u32 = 5;

/// Shorter queries show recent searches instead of suggestions.
const MIN_SUGGEST_LENGTH: usize = 2;

/// Search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// One entry of the suggestions dropdown.
#[derive(Debug, Clone)]
pub struct SuggestionView {
    pub handle: String,
    pub title: String,
    pub price: String,
}

/// Full search page template.
#[derive(Template, WebTemplate)]
#[template(path = "search/show.html")]
pub struct SearchPageTemplate {
    pub layout: Layout,
    pub query: String,
    pub results: Vec<ProductCardView>,
    pub total: u32,
    pub recent: Vec<String>,
}

/// Search suggestions template (HTMX fragment).
#[derive(Template, WebTemplate)]
#[template(path = "search/_suggestions.html")]
pub struct SuggestionsTemplate {
    pub query: String,
    pub suggestions: Vec<SuggestionView>,
    pub recent: Vec<String>,
}

/// Recent searches list (HTMX fragment).
#[derive(Template, WebTemplate)]
#[template(path = "search/_recent.html")]
pub struct RecentSearchesTemplate {
    pub recent: Vec<String>,
}

/// Full search page. A non-blank query is recorded in recent searches.
#[instrument(skip(state, session, layout))]
pub async fn search_page(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let q = query.q.trim().to_string();
    let mut recent = session::recent_searches(&session).await;

    let (results, total) = if q.is_empty() {
        (Vec::new(), 0)
    } else {
        recent.record(&q);
        session::set_recent_searches(&session, &recent).await?;

        let page = state
            .commerce()
            .search_products(&q, SEARCH_LIMIT, layout.currency)
            .await?;
        let wishlist = session::wishlist(&session).await;
        tracing::debug!(results = page.count, "Search completed");
        (
            page.products
                .iter()
                .map(|p| ProductCardView::new(p, &wishlist))
                .collect(),
            page.count,
        )
    };

    Ok(SearchPageTemplate {
        layout,
        query: q,
        results,
        total,
        recent: recent.entries().to_vec(),
    })
}

/// Suggestions dropdown (HTMX). The markup debounces input by 300 ms.
#[instrument(skip(state, session))]
pub async fn suggest(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let q = query.q.trim().to_string();
    if q.chars().count() < MIN_SUGGEST_LENGTH {
        let recent = session::recent_searches(&session).await;
        return Ok(SuggestionsTemplate {
            query: q,
            suggestions: Vec::new(),
            recent: recent.entries().to_vec(),
        });
    }

    let currency = state
        .resolve_currency(session::currency(&session).await)
        .await;
    let page = state
        .commerce()
        .search_products(&q, SUGGEST_LIMIT, currency)
        .await?;

    Ok(SuggestionsTemplate {
        query: q,
        suggestions: page
            .products
            .iter()
            .map(|p| SuggestionView {
                handle: p.handle.clone(),
                title: p.title.clone(),
                price: p.lowest_price().map(|m| m.to_string()).unwrap_or_default(),
            })
            .collect(),
        recent: Vec::new(),
    })
}

/// Forget recent searches.
#[instrument(skip_all)]
pub async fn clear_recent(headers: HeaderMap, session: Session) -> Result<Response> {
    let mut recent = session::recent_searches(&session).await;
    recent.clear();
    session::set_recent_searches(&session, &recent).await?;

    if is_htmx(&headers) {
        Ok(RecentSearchesTemplate { recent: Vec::new() }.into_response())
    } else {
        Ok(Redirect::to("/search").into_response())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    use crate::test_support::{TestApp, backend, body_text, location};

    #[tokio::test]
    async fn test_search_records_recent_queries() {
        let mut app = TestApp::new(backend()).await;

        let body = body_text(app.get("/search?q=santal").await).await;
        assert!(body.contains("Santal Noir"));
        assert!(body.contains("1 result"));

        app.get("/search?q=oud").await;
        let body = body_text(app.get("/search").await).await;
        let oud = body.find(">oud<").unwrap();
        let santal = body.find(">santal<").unwrap();
        assert!(oud < santal);
    }

    #[tokio::test]
    async fn test_short_query_suggests_recent_searches() {
        let mut app = TestApp::new(backend()).await;
        app.get("/search?q=vetiver").await;

        let body = body_text(app.get("/search/suggest?q=v").await).await;
        assert!(body.contains("vetiver"));

        let body = body_text(app.get("/search/suggest?q=san").await).await;
        assert!(body.contains("/products/santal-noir"));
        assert!(body.contains("$185.00"));
    }

    #[tokio::test]
    async fn test_clear_recent_searches() {
        let mut app = TestApp::new(backend()).await;
        app.get("/search?q=vetiver").await;

        let response = app
            .send(
                Request::post("/search/recent/clear")
                    .header("HX-Request", "true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!body_text(response).await.contains("vetiver"));

        let response = app.post_form("/search/recent/clear", &[]).await;
        assert_eq!(location(&response), "/search");
        assert!(!body_text(app.get("/search").await).await.contains("vetiver"));
    }
}

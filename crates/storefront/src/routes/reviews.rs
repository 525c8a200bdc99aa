//! Product review handlers: submission and helpful votes.
//!
//! Listing happens on the product page; see [`ReviewsView`].

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;
use vernont_core::ReviewId;

use crate::api::{ApiError, NewReview, ReviewPage, ReviewSort};
use crate::error::{Result, add_breadcrumb};
use crate::forms::{self, FieldErrors};
use crate::layout::Layout;
use crate::middleware::RequireCustomer;
use crate::models::session;
use crate::state::AppState;

use super::products::{Pagination, ShowQuery, load_product, render_show};

const MAX_TITLE_LENGTH: usize = 120;
const MIN_CONTENT_LENGTH: usize = 10;
const MAX_CONTENT_LENGTH: usize = 2000;

// =============================================================================
// Views
// =============================================================================

/// One bar of the rating distribution.
#[derive(Debug, Clone)]
pub struct DistributionRow {
    pub stars: u8,
    pub count: u32,
    /// Share of all reviews, 0 to 100.
    pub percent: u32,
}

#[derive(Debug, Clone)]
pub struct ReviewView {
    pub id: String,
    pub author_name: String,
    pub rating: u8,
    pub stars: String,
    pub title: Option<String>,
    pub content: String,
    pub date: String,
    pub verified_purchase: bool,
    pub helpful_count: u32,
    pub voted: bool,
}

#[derive(Debug, Clone)]
pub struct ReviewSortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Review section of the product page.
#[derive(Debug, Clone)]
pub struct ReviewsView {
    pub average: String,
    pub count: u32,
    pub distribution: Vec<DistributionRow>,
    pub reviews: Vec<ReviewView>,
    pub sort_options: Vec<ReviewSortOption>,
    pub handle: String,
    pub pagination: Pagination,
}

fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

impl ReviewsView {
    #[must_use]
    pub fn new(handle: &str, page: &ReviewPage, sort: ReviewSort, voted: &[ReviewId]) -> Self {
        let summary = &page.summary;
        let distribution = summary
            .distribution
            .iter()
            .zip((1..=5_u8).rev())
            .map(|(&count, stars)| DistributionRow {
                stars,
                count,
                percent: if summary.count == 0 {
                    0
                } else {
                    (count.saturating_mul(100) / summary.count).min(100)
                },
            })
            .collect();

        let base = format!("/products/{handle}?review_sort={}&", sort.as_str());

        Self {
            average: format!("{:.1}", summary.average),
            count: summary.count,
            distribution,
            reviews: page
                .reviews
                .iter()
                .map(|r| ReviewView {
                    id: r.id.to_string(),
                    author_name: r.author_name.clone(),
                    rating: r.rating,
                    stars: stars(r.rating),
                    title: r.title.clone(),
                    content: r.content.clone(),
                    date: r.created_at.format("%B %-d, %Y").to_string(),
                    verified_purchase: r.verified_purchase,
                    helpful_count: r.helpful_count,
                    voted: voted.contains(&r.id),
                })
                .collect(),
            sort_options: ReviewSort::ALL
                .into_iter()
                .map(|s| ReviewSortOption {
                    value: s.as_str(),
                    label: s.label(),
                    selected: s == sort,
                })
                .collect(),
            handle: handle.to_string(),
            pagination: Pagination::for_offset(
                page.count,
                page.offset,
                page.limit,
                &base,
                "review_page",
            ),
        }
    }
}

/// Review form state: submitted values, errors and the confirmation flag.
#[derive(Debug, Clone, Default)]
pub struct ReviewForm {
    pub rating: String,
    pub title: String,
    pub content: String,
    pub errors: FieldErrors,
    /// Backend rejection shown above the form.
    pub message: Option<String>,
    pub submitted: bool,
}

impl ReviewForm {
    /// Validate into a review submission.
    ///
    /// # Errors
    ///
    /// Returns every field that failed validation.
    pub fn validate(&self) -> std::result::Result<NewReview, FieldErrors> {
        let mut errors = FieldErrors::new();

        let rating = match self.rating.trim().parse::<u8>() {
            Ok(rating @ 1..=5) => rating,
            _ => {
                errors.add("rating", "Choose a rating from 1 to 5 stars");
                0
            }
        };
        let title = forms::optional(&mut errors, "title", "Title", &self.title, MAX_TITLE_LENGTH);
        let content = forms::required(
            &mut errors,
            "content",
            "Review",
            &self.content,
            MAX_CONTENT_LENGTH,
        );
        if !content.is_empty() && content.chars().count() < MIN_CONTENT_LENGTH {
            errors.add(
                "content",
                format!("Review must be at least {MIN_CONTENT_LENGTH} characters"),
            );
        }

        errors.into_result(NewReview {
            rating,
            title,
            content,
        })
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Helpful button after a vote (HTMX fragment).
#[derive(Template, WebTemplate)]
#[template(path = "partials/review_helpful.html")]
pub struct HelpfulTemplate {
    pub count: Option<u32>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Submit a review as the signed-in customer.
#[instrument(skip(state, session, layout, customer, fields), fields(customer_id = %customer.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    RequireCustomer(customer): RequireCustomer,
    Path(handle): Path<String>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response> {
    let field = |name: &str| fields.get(name).cloned().unwrap_or_default();
    let mut form = ReviewForm {
        rating: field("rating"),
        title: field("title"),
        content: field("content"),
        ..ReviewForm::default()
    };

    let review = match form.validate() {
        Ok(review) => review,
        Err(errors) => {
            form.errors = errors;
            return render_show(&state, &session, layout, &handle, &ShowQuery::default(), form)
                .await;
        }
    };

    let product = load_product(&state, &handle, layout.currency).await?;
    match state
        .commerce()
        .create_review(&product.id, &review, &customer.token)
        .await
    {
        Ok(created) => {
            tracing::info!(review_id = %created.id, "Review submitted");
            add_breadcrumb("review", "Review submitted", Some(&[("handle", handle.as_str())]));
            Ok(Redirect::to(&format!("/products/{handle}?review=submitted#reviews")).into_response())
        }
        Err(e) if e.is_rejection() => {
            form.message = e.user_message().map(String::from);
            render_show(&state, &session, layout, &handle, &ShowQuery::default(), form).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Mark a review helpful, once per session.
#[instrument(skip(state, session))]
pub async fn helpful(
    State(state): State<AppState>,
    session: Session,
    Path(review_id): Path<String>,
) -> Result<Response> {
    let review_id = ReviewId::new(review_id);
    if session::helpful_votes(&session).await.contains(&review_id) {
        return Ok(HelpfulTemplate { count: None }.into_response());
    }

    let count = match state.commerce().mark_review_helpful(&review_id).await {
        Ok(count) => count,
        Err(ApiError::NotFound(_)) => {
            return Err(crate::error::AppError::NotFound(format!("review {review_id}")));
        }
        Err(e) => return Err(e.into()),
    };
    session::record_helpful_vote(&session, &review_id).await?;

    Ok(HelpfulTemplate { count: Some(count) }.into_response())
}

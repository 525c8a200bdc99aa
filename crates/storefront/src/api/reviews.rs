//! Product reviews.

use reqwest::Method;
use tracing::instrument;
use vernont_core::{ProductId, ReviewId};

use super::conversions::{convert_review, convert_review_page, count};
use super::dto::{HelpfulDto, ReviewEnvelope, ReviewListDto};
use super::types::{NewReview, Review, ReviewPage, ReviewSort};
use super::{ApiError, CommerceClient};

/// Page and order of a review listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewQuery {
    pub sort: ReviewSort,
    pub limit: u32,
    pub offset: u32,
}

impl ReviewQuery {
    /// Reviews shown per page on the product page.
    pub const PER_PAGE: u32 = 5;

    /// Page `page` (1-based) in the given order.
    #[must_use]
    pub const fn page(sort: ReviewSort, page: u32) -> Self {
        Self {
            sort,
            limit: Self::PER_PAGE,
            offset: page.saturating_sub(1).saturating_mul(Self::PER_PAGE),
        }
    }
}

impl CommerceClient {
    /// List reviews for a product, with the rating summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the payload is invalid.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn product_reviews(
        &self,
        product_id: &ProductId,
        query: ReviewQuery,
    ) -> Result<ReviewPage, ApiError> {
        let params = [
            ("order", query.sort.order_param().to_string()),
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        let dto: ReviewListDto = self
            .get(
                &["store", "products", product_id.as_str(), "reviews"],
                &params,
                None,
            )
            .await?;
        Ok(convert_review_page(dto)?)
    }

    /// Submit a review as the logged-in customer.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for an expired token, or a rejection
    /// if the backend refuses the review (e.g. duplicate).
    #[instrument(skip(self, review, token), fields(product_id = %product_id))]
    pub async fn create_review(
        &self,
        product_id: &ProductId,
        review: &NewReview,
        token: &str,
    ) -> Result<Review, ApiError> {
        let envelope: ReviewEnvelope = self
            .send(
                Method::POST,
                &["store", "products", product_id.as_str(), "reviews"],
                review,
                Some(token),
            )
            .await?;
        Ok(convert_review(envelope.review)?)
    }

    /// Record a helpful vote and return the new count.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(review_id = %review_id))]
    pub async fn mark_review_helpful(&self, review_id: &ReviewId) -> Result<u32, ApiError> {
        let dto: HelpfulDto = self
            .send(
                Method::POST,
                &["store", "reviews", review_id.as_str(), "helpful"],
                &serde_json::json!({}),
                None,
            )
            .await?;
        Ok(count("helpful_count", dto.helpful_count)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::Router;
    use axum::extract::{Path, Query};
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use serde_json::json;
    use std::collections::HashMap;
    use vernont_core::{ProductId, ReviewId};

    use super::*;
    use crate::test_support::{spawn_backend, test_client};

    fn router() -> Router {
        Router::new()
            .route(
                "/store/products/{id}/reviews",
                get(
                    |Path(id): Path<String>, Query(params): Query<HashMap<String, String>>| async move {
                        assert_eq!(id, "prod_1");
                        assert_eq!(params.get("order").map(String::as_str), Some("-rating"));
                        assert_eq!(params.get("offset").map(String::as_str), Some("5"));
                        axum::Json(json!({
                            "reviews": [{
                                "id": "rev_1", "author_name": "Camille", "rating": 5,
                                "content": "Lasts all day.", "created_at": "2026-03-01T10:00:00Z",
                                "verified_purchase": true, "helpful_count": 3
                            }],
                            "count": 6, "offset": 5, "limit": 5,
                            "summary": { "average": 4.5, "count": 6, "distribution": [4, 1, 1, 0, 0] }
                        }))
                    },
                )
                .post(|headers: HeaderMap| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default();
                    assert_eq!(auth, "Bearer tok_1");
                    axum::Json(json!({
                        "review": {
                            "id": "rev_2", "author_name": "Jules", "rating": 4,
                            "content": "Beautiful dry down.", "created_at": "2026-03-02T10:00:00Z"
                        }
                    }))
                }),
            )
            .route(
                "/store/reviews/{id}/helpful",
                post(|| async { axum::Json(json!({ "helpful_count": 4 })) }),
            )
    }

    #[tokio::test]
    async fn test_product_reviews() {
        let client = test_client(spawn_backend(router()).await);
        let page = client
            .product_reviews(&ProductId::new("prod_1"), ReviewQuery::page(ReviewSort::Highest, 2))
            .await
            .unwrap();
        assert_eq!(page.reviews.len(), 1);
        assert_eq!(page.summary.distribution, [4, 1, 1, 0, 0]);
        assert!(page.reviews[0].verified_purchase);
    }

    #[tokio::test]
    async fn test_create_review_and_helpful() {
        let client = test_client(spawn_backend(router()).await);
        let review = client
            .create_review(
                &ProductId::new("prod_1"),
                &NewReview {
                    rating: 4,
                    title: None,
                    content: "Beautiful dry down.".to_string(),
                },
                "tok_1",
            )
            .await
            .unwrap();
        assert_eq!(review.rating, 4);

        let count = client
            .mark_review_helpful(&ReviewId::new("rev_1"))
            .await
            .unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn test_review_query_page() {
        let query = ReviewQuery::page(ReviewSort::Newest, 3);
        assert_eq!(query.offset, 10);
        assert_eq!(ReviewQuery::page(ReviewSort::Newest, 0).offset, 0);
    }
}

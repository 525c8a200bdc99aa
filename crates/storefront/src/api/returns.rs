//! Returns and exchanges.

use reqwest::Method;
use tracing::{info, instrument};

use super::conversions::convert_return;
use super::dto::{ReturnEnvelope, ReturnListDto, ReturnReasonsEnvelope};
use super::types::{NewReturn, ReturnReason, ReturnRequest};
use super::{ApiError, CommerceClient};

impl CommerceClient {
    /// Reasons a customer can choose from.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn return_reasons(&self) -> Result<Vec<ReturnReason>, ApiError> {
        let envelope: ReturnReasonsEnvelope =
            self.get(&["store", "return-reasons"], &[], None).await?;
        Ok(envelope.return_reasons)
    }

    /// Return and exchange requests of the logged-in customer.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for an expired token.
    #[instrument(skip_all)]
    pub async fn customer_returns(&self, token: &str) -> Result<Vec<ReturnRequest>, ApiError> {
        let dto: ReturnListDto = self
            .get(&["store", "customers", "me", "returns"], &[], Some(token))
            .await?;
        dto.returns
            .into_iter()
            .map(|r| convert_return(r).map_err(ApiError::from))
            .collect()
    }

    /// Submit a return or exchange request. Eligibility is decided by the
    /// backend.
    ///
    /// # Errors
    ///
    /// Returns a rejection when the request is not eligible.
    #[instrument(skip(self, token, request), fields(order_id = %request.order_id, kind = ?request.kind))]
    pub async fn create_return(
        &self,
        token: &str,
        request: &NewReturn,
    ) -> Result<ReturnRequest, ApiError> {
        let envelope: ReturnEnvelope = self
            .send(Method::POST, &["store", "returns"], request, Some(token))
            .await?;
        let created = convert_return(envelope.return_request)?;
        info!(return_id = %created.id, "Return requested");
        Ok(created)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::Router;
    use axum::routing::{get, post};
    use serde_json::{Value, json};
    use vernont_core::{LineItemId, OrderId, ReturnKind, ReturnStatus, VariantId};

    use crate::api::{NewReturn, NewReturnItem};
    use crate::test_support::{spawn_backend, test_client};

    #[tokio::test]
    async fn test_create_return_serializes_request() {
        let router = Router::new()
            .route(
                "/store/return-reasons",
                get(|| async {
                    axum::Json(json!({ "return_reasons": [
                        { "id": "rr_size", "label": "Wrong size" },
                        { "id": "rr_damaged", "label": "Arrived damaged" }
                    ]}))
                }),
            )
            .route(
                "/store/returns",
                post(|axum::Json(body): axum::Json<Value>| async move {
                    assert_eq!(body["kind"], "exchange");
                    assert_eq!(body["items"][0]["exchange_variant_id"], "variant_100");
                    assert!(body.get("note").is_none());
                    axum::Json(json!({ "return": {
                        "id": "ret_1", "order_id": body["order_id"], "kind": "exchange",
                        "status": "requested", "created_at": "2026-04-10T12:00:00Z",
                        "items": [{ "item_id": "item_1", "title": "Oud Royal", "quantity": 1 }]
                    }}))
                }),
            );
        let client = test_client(spawn_backend(router).await);

        let reasons = client.return_reasons().await.unwrap();
        assert_eq!(reasons.len(), 2);

        let created = client
            .create_return(
                "tok_1",
                &NewReturn {
                    order_id: OrderId::new("order_1"),
                    kind: ReturnKind::Exchange,
                    items: vec![NewReturnItem {
                        item_id: LineItemId::new("item_1"),
                        quantity: 1,
                        reason_id: "rr_size".to_string(),
                        exchange_variant_id: Some(VariantId::new("variant_100")),
                    }],
                    note: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(created.status, ReturnStatus::Requested);
        assert_eq!(created.order_id.as_str(), "order_1");
    }
}

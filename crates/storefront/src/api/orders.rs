//! Order history.

use tracing::instrument;
use vernont_core::OrderId;

use super::conversions::{convert_order, convert_order_page};
use super::dto::{OrderEnvelope, OrderListDto};
use super::types::{Order, OrderPage};
use super::{ApiError, CommerceClient};

impl CommerceClient {
    /// Page of the logged-in customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for an expired token.
    #[instrument(skip(self, token))]
    pub async fn customer_orders(
        &self,
        token: &str,
        limit: u32,
        offset: u32,
    ) -> Result<OrderPage, ApiError> {
        let params = [
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("order", "-created_at".to_string()),
        ];
        let dto: OrderListDto = self
            .get(&["store", "customers", "me", "orders"], &params, Some(token))
            .await?;
        Ok(convert_order_page(dto)?)
    }

    /// A single order. Guests may read the order they just placed without a
    /// token; the backend scopes access.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown or foreign orders.
    #[instrument(skip(self, token), fields(order_id = %order_id))]
    pub async fn order(&self, order_id: &OrderId, token: Option<&str>) -> Result<Order, ApiError> {
        let envelope: OrderEnvelope = self
            .get(&["store", "orders", order_id.as_str()], &[], token)
            .await?;
        Ok(convert_order(envelope.order)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use axum::Router;
    use axum::extract::{Path, Query};
    use axum::routing::get;
    use serde_json::json;
    use vernont_core::OrderId;

    use crate::test_support::{order_json, spawn_backend, test_client};

    #[tokio::test]
    async fn test_customer_orders_and_order() {
        let router = Router::new()
            .route(
                "/store/customers/me/orders",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    assert_eq!(params.get("offset").map(String::as_str), Some("10"));
                    axum::Json(json!({
                        "orders": [order_json("order_2", 1002)],
                        "count": 11, "offset": 10, "limit": 10
                    }))
                }),
            )
            .route(
                "/store/orders/{id}",
                get(|Path(id): Path<String>| async move {
                    axum::Json(json!({ "order": order_json(&id, 1001) }))
                }),
            );
        let client = test_client(spawn_backend(router).await);

        let page = client.customer_orders("tok_1", 10, 10).await.unwrap();
        assert_eq!(page.count, 11);
        assert_eq!(page.orders[0].display_id, 1002);

        let order = client.order(&OrderId::new("order_1"), None).await.unwrap();
        assert_eq!(order.id.as_str(), "order_1");
    }
}

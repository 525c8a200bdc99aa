//! Catalog reads.

use tracing::{debug, instrument};
use vernont_core::{CurrencyCode, ProductId};

use super::cache::{CacheKey, CacheValue};
use super::conversions::{convert_product, convert_product_page};
use super::dto::{ProductEnvelope, ProductListDto};
use super::types::{Product, ProductPage, ProductQuery};
use super::{ApiError, CommerceClient};

impl CommerceClient {
    /// List products for a catalog page.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the payload is invalid.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let cache_key = CacheKey::Products(query.clone());
        if let Some(CacheValue::Products(page)) = self.cache().get(&cache_key).await {
            debug!("Cache hit for product listing");
            return Ok(page);
        }

        let mut params = vec![
            ("currency_code", query.currency.wire_code().to_string()),
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if let Some(category) = &query.category {
            params.push(("category", category.clone()));
        }
        if let Some(order) = query.sort.order_param() {
            params.push(("order", order.to_string()));
        }
        if query.featured_only {
            params.push(("featured", "true".to_string()));
        }

        let dto: ProductListDto = self.get(&["store", "products"], &params, None).await?;
        let page = convert_product_page(dto)?;

        self.cache()
            .insert(cache_key, CacheValue::Products(page.clone()))
            .await;
        Ok(page)
    }

    /// Load specific products (wishlist). Unknown ids are simply absent from
    /// the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the payload is invalid.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn products_by_ids(
        &self,
        ids: &[ProductId],
        currency: CurrencyCode,
    ) -> Result<Vec<Product>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut params: Vec<(&str, String)> =
            ids.iter().map(|id| ("id", id.to_string())).collect();
        params.push(("currency_code", currency.wire_code().to_string()));
        params.push(("limit", ids.len().to_string()));

        let dto: ProductListDto = self.get(&["store", "products"], &params, None).await?;
        Ok(convert_product_page(dto)?.products)
    }

    /// Get a product by its handle.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for unknown handles, or another error if
    /// the request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn product_by_handle(
        &self,
        handle: &str,
        currency: CurrencyCode,
    ) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product {
            handle: handle.to_string(),
            currency,
        };
        if let Some(CacheValue::Product(product)) = self.cache().get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let params = [("currency_code", currency.wire_code().to_string())];
        let envelope: ProductEnvelope = self
            .get(&["store", "products", handle], &params, None)
            .await?;
        let product = convert_product(envelope.product)?;

        self.cache()
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Full-text product search. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the payload is invalid.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search_products(
        &self,
        query: &str,
        limit: u32,
        currency: CurrencyCode,
    ) -> Result<ProductPage, ApiError> {
        let params = [
            ("q", query.trim().to_string()),
            ("limit", limit.to_string()),
            ("currency_code", currency.wire_code().to_string()),
        ];
        let dto: ProductListDto = self.get(&["store", "products"], &params, None).await?;
        Ok(convert_product_page(dto)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use axum::Router;
    use axum::extract::{Path, RawQuery};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use serde_json::json;
    use vernont_core::{CurrencyCode, ProductId};

    use crate::api::{ApiError, ProductQuery, ProductSort};
    use crate::test_support::{product_json, spawn_backend, test_client};

    fn listing_router() -> Router {
        Router::new()
            .route(
                "/store/products",
                get(|RawQuery(query): RawQuery| async move {
                    let query = query.unwrap_or_default();
                    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
                        .into_owned()
                        .collect();
                    let ids: Vec<&str> = pairs
                        .iter()
                        .filter(|(k, _)| k == "id")
                        .map(|(_, v)| v.as_str())
                        .collect();
                    let params: HashMap<_, _> = pairs.iter().cloned().collect();
                    let products: Vec<_> = if ids.is_empty() {
                        vec![product_json("prod_1", "santal-noir"), product_json("prod_2", "iris-pallida")]
                    } else {
                        // Unknown ids are dropped by the backend.
                        ids.iter()
                            .filter(|id| id.starts_with("prod_"))
                            .map(|id| product_json(id, id))
                            .collect()
                    };
                    axum::Json(json!({
                        "products": products,
                        "count": products.len(),
                        "offset": 0,
                        "limit": params.get("limit").and_then(|l| l.parse::<u32>().ok()).unwrap_or(12),
                        "echo": params,
                    }))
                }),
            )
            .route(
                "/store/products/{handle}",
                get(|Path(handle): Path<String>| async move {
                    if handle == "santal-noir" {
                        axum::Json(json!({ "product": product_json("prod_1", &handle) }))
                            .into_response()
                    } else {
                        axum::http::StatusCode::NOT_FOUND.into_response()
                    }
                }),
            )
    }

    #[tokio::test]
    async fn test_list_products() {
        let client = test_client(spawn_backend(listing_router()).await);
        let mut query = ProductQuery::page(CurrencyCode::USD, 1, 12);
        query.sort = ProductSort::PriceAsc;

        let page = client.list_products(&query).await.unwrap();
        assert_eq!(page.products.len(), 2);
        assert_eq!(page.limit, 12);
    }

    #[tokio::test]
    async fn test_products_by_ids_drops_unknown() {
        let client = test_client(spawn_backend(listing_router()).await);
        let ids = vec![ProductId::new("prod_7"), ProductId::new("gone_1")];
        let products = client
            .products_by_ids(&ids, CurrencyCode::USD)
            .await
            .unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id.as_str(), "prod_7");

        assert!(client
            .products_by_ids(&[], CurrencyCode::USD)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_product_by_handle() {
        let client = test_client(spawn_backend(listing_router()).await);
        let product = client
            .product_by_handle("santal-noir", CurrencyCode::USD)
            .await
            .unwrap();
        assert_eq!(product.title, "Santal Noir");

        let missing = client
            .product_by_handle("no-such-scent", CurrencyCode::USD)
            .await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }
}

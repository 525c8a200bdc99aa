//! Commerce REST client core: URL building, request execution and status
//! mapping. Resource-specific methods live in sibling modules.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::CommerceApiConfig;

use super::ApiError;
use super::cache::{CacheKey, CacheValue};
use super::dto::ErrorBody;

const PUBLISHABLE_KEY_HEADER: &str = "x-publishable-api-key";
const CACHE_CAPACITY: u64 = 1000;
const CACHE_TTL: Duration = Duration::from_secs(300);
const MAX_ERROR_BODY_CHARS: usize = 200;

// =============================================================================
// CommerceClient
// =============================================================================

/// Client for the commerce backend's store API.
///
/// Cheap to clone. Store settings and catalog reads are cached for 5 minutes.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    http: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

/// Query string pairs; empty values are skipped.
pub(super) type Query<'a> = &'a [(&'a str, String)];

impl CommerceClient {
    /// Create a new commerce client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path or the HTTP
    /// client cannot be built.
    pub fn new(config: &CommerceApiConfig) -> Result<Self, ApiError> {
        if config.base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidConfig(config.base_url.to_string()));
        }

        let mut key = HeaderValue::from_str(&config.publishable_key)
            .map_err(|_| ApiError::InvalidConfig("publishable key is not a valid header".into()))?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(PUBLISHABLE_KEY_HEADER, key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .user_agent(concat!("vernont-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                http,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    pub(super) fn cache(&self) -> &Cache<CacheKey, CacheValue> {
        &self.inner.cache
    }

    /// Build a URL from path segments, percent-encoding each one.
    pub(super) fn url(&self, segments: &[&str], query: Query<'_>) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidConfig(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);

        let pairs: Vec<_> = query.iter().filter(|(_, v)| !v.is_empty()).collect();
        if !pairs.is_empty() {
            let mut serializer = url.query_pairs_mut();
            for (key, value) in pairs {
                serializer.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn builder(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
        let builder = self.inner.http.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// `GET` and deserialize.
    pub(super) async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: Query<'_>,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let url = self.url(segments, query)?;
        let body = self.execute(self.builder(Method::GET, url, token)).await?;
        parse(&body)
    }

    /// Send a JSON body and deserialize the response.
    pub(super) async fn send<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
        token: Option<&str>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(segments, &[])?;
        let request = self.builder(method, url, token).json(body);
        let text = self.execute(request).await?;
        parse(&text)
    }

    /// `DELETE` and deserialize.
    pub(super) async fn delete<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let url = self.url(segments, &[])?;
        let text = self
            .execute(self.builder(Method::DELETE, url, token))
            .await?;
        parse(&text)
    }

    /// Send a request whose response body is irrelevant.
    pub(super) async fn send_ignoring_body<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<(), ApiError> {
        let url = self.url(segments, &[])?;
        let mut request = self.builder(method, url, token);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request).await.map(|_| ())
    }

    /// Execute a request and return the body of a successful response.
    async fn execute(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let path = response.url().path().to_string();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(1);
            tracing::warn!(path = %path, retry_after, "Commerce API rate limited");
            return Err(ApiError::RateLimited(retry_after));
        }

        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(path)),
            _ => {
                let message = serde_json::from_str::<ErrorBody>(&text)
                    .map(|body| body.message)
                    .unwrap_or_else(|_| text.chars().take(MAX_ERROR_BODY_CHARS).collect());
                if status.is_server_error() {
                    tracing::error!(
                        status = %status,
                        path = %path,
                        body = %text.chars().take(500).collect::<String>(),
                        "Commerce API returned server error"
                    );
                } else {
                    tracing::debug!(status = %status, path = %path, message = %message, "Commerce API rejected request");
                }
                Err(ApiError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

/// Deserialize a response body, logging a prefix of it on failure.
fn parse<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse commerce API response"
        );
        ApiError::Parse(e)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::Router;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use serde_json::json;

    use crate::test_support::{spawn_backend, test_client};

    use super::*;

    #[test]
    fn test_url_encodes_segments_and_skips_empty_query() {
        let client = test_client(Url::parse("http://localhost:9000/api/").unwrap());
        let url = client
            .url(
                &["store", "products", "a/b c"],
                &[("q", "oud & rose".to_string()), ("category", String::new())],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/api/store/products/a%2Fb%20c?q=oud+%26+rose"
        );
    }

    #[tokio::test]
    async fn test_publishable_key_header_is_sent() {
        let router = Router::new().route(
            "/store/echo",
            get(|headers: AxumHeaders| async move {
                let key = headers
                    .get(PUBLISHABLE_KEY_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                axum::Json(json!({ "key": key }))
            }),
        );
        let client = test_client(spawn_backend(router).await);

        let body: serde_json::Value = client.get(&["store", "echo"], &[], None).await.unwrap();
        assert_eq!(body["key"], "pk_test");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let router = Router::new()
            .route(
                "/limited",
                get(|| async {
                    (AxumStatus::TOO_MANY_REQUESTS, [("retry-after", "7")], "slow down")
                        .into_response()
                }),
            )
            .route(
                "/limited-no-header",
                get(|| async { AxumStatus::TOO_MANY_REQUESTS.into_response() }),
            )
            .route("/private", get(|| async { AxumStatus::UNAUTHORIZED }))
            .route(
                "/rejected",
                get(|| async {
                    (
                        AxumStatus::UNPROCESSABLE_ENTITY,
                        axum::Json(json!({ "message": "Discount code is not valid" })),
                    )
                }),
            )
            .route(
                "/broken",
                get(|| async { (AxumStatus::BAD_GATEWAY, "<html>upstream</html>") }),
            )
            .route("/garbage", get(|| async { "not json" }));
        let client = test_client(spawn_backend(router).await);

        let result: Result<serde_json::Value, _> = client.get(&["limited"], &[], None).await;
        assert!(matches!(result, Err(ApiError::RateLimited(7))));

        let result: Result<serde_json::Value, _> =
            client.get(&["limited-no-header"], &[], None).await;
        assert!(matches!(result, Err(ApiError::RateLimited(1))));

        let result: Result<serde_json::Value, _> = client.get(&["private"], &[], None).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));

        let result: Result<serde_json::Value, _> = client.get(&["missing"], &[], None).await;
        assert!(matches!(result, Err(ApiError::NotFound(path)) if path == "/missing"));

        let result: Result<serde_json::Value, _> = client.get(&["rejected"], &[], None).await;
        match result {
            Err(err @ ApiError::Status { status: 422, .. }) => {
                assert_eq!(err.user_message(), Some("Discount code is not valid"));
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let result: Result<serde_json::Value, _> = client.get(&["broken"], &[], None).await;
        assert!(matches!(
            result,
            Err(ApiError::Status { status: 502, message }) if message == "<html>upstream</html>"
        ));

        let result: Result<serde_json::Value, _> = client.get(&["garbage"], &[], None).await;
        assert!(matches!(result, Err(ApiError::Parse(_))));
    }
}

//! Customer authentication, profile and address book.

use reqwest::Method;
use serde_json::json;
use tracing::instrument;
use vernont_core::AddressId;

use super::dto::CustomerEnvelope;
use super::types::{Address, AuthSession, Customer, ProfileUpdate, Registration};
use super::{ApiError, CommerceClient};

impl CommerceClient {
    /// Exchange credentials for a customer token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for wrong credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        self.send(
            Method::POST,
            &["store", "auth"],
            &json!({ "email": email, "password": password }),
            None,
        )
        .await
    }

    /// Revoke a customer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: &str) -> Result<(), ApiError> {
        self.send_ignoring_body::<()>(Method::DELETE, &["store", "auth"], None, Some(token))
            .await
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns a rejection if the email is already registered.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<AuthSession, ApiError> {
        self.send(Method::POST, &["store", "customers"], registration, None)
            .await
    }

    /// Ask the backend to email a password reset link.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, email))]
    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        self.send_ignoring_body(
            Method::POST,
            &["store", "customers", "password-token"],
            Some(&json!({ "email": email })),
            None,
        )
        .await
    }

    /// Set a new password using a reset token.
    ///
    /// # Errors
    ///
    /// Returns a rejection for an invalid or expired token.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        reset_token: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        self.send_ignoring_body(
            Method::POST,
            &["store", "customers", "password-reset"],
            Some(&json!({ "token": reset_token, "email": email, "password": password })),
            None,
        )
        .await
    }

    /// The logged-in customer.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for an expired token.
    #[instrument(skip_all)]
    pub async fn me(&self, token: &str) -> Result<Customer, ApiError> {
        let envelope: CustomerEnvelope = self
            .get(&["store", "customers", "me"], &[], Some(token))
            .await?;
        Ok(envelope.customer)
    }

    /// Update names and phone.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<Customer, ApiError> {
        self.customer_call(Method::POST, &["store", "customers", "me"], update, token)
            .await
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns a rejection if the backend refuses the address.
    #[instrument(skip_all)]
    pub async fn add_address(&self, token: &str, address: &Address) -> Result<Customer, ApiError> {
        self.customer_call(
            Method::POST,
            &["store", "customers", "me", "addresses"],
            address,
            token,
        )
        .await
    }

    /// Replace a saved address.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown address.
    #[instrument(skip(self, token, address), fields(address_id = %address_id))]
    pub async fn update_address(
        &self,
        token: &str,
        address_id: &AddressId,
        address: &Address,
    ) -> Result<Customer, ApiError> {
        self.customer_call(
            Method::POST,
            &["store", "customers", "me", "addresses", address_id.as_str()],
            address,
            token,
        )
        .await
    }

    /// Delete a saved address.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown address.
    #[instrument(skip(self, token), fields(address_id = %address_id))]
    pub async fn delete_address(
        &self,
        token: &str,
        address_id: &AddressId,
    ) -> Result<Customer, ApiError> {
        let envelope: CustomerEnvelope = self
            .delete(
                &["store", "customers", "me", "addresses", address_id.as_str()],
                Some(token),
            )
            .await?;
        Ok(envelope.customer)
    }

    async fn customer_call<B: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
        token: &str,
    ) -> Result<Customer, ApiError> {
        let envelope: CustomerEnvelope = self.send(method, segments, body, Some(token)).await?;
        Ok(envelope.customer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use serde_json::{Value, json};

    use crate::api::ApiError;
    use crate::test_support::{customer_json, spawn_backend, test_client};

    fn bearer(headers: &HeaderMap) -> Option<&str> {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    fn router() -> Router {
        Router::new()
            .route(
                "/store/auth",
                post(|axum::Json(body): axum::Json<Value>| async move {
                    if body["password"] == "correct-horse" {
                        axum::Json(json!({ "token": "tok_1", "customer": customer_json() }))
                            .into_response()
                    } else {
                        StatusCode::UNAUTHORIZED.into_response()
                    }
                }),
            )
            .route(
                "/store/customers/me",
                get(|headers: HeaderMap| async move {
                    if bearer(&headers) == Some("tok_1") {
                        axum::Json(json!({ "customer": customer_json() })).into_response()
                    } else {
                        StatusCode::UNAUTHORIZED.into_response()
                    }
                }),
            )
            .route(
                "/store/customers/password-token",
                post(|| async { StatusCode::NO_CONTENT }),
            )
    }

    #[tokio::test]
    async fn test_login_and_me() {
        let client = test_client(spawn_backend(router()).await);

        let session = client
            .login("claire@maison.fr", "correct-horse")
            .await
            .unwrap();
        assert_eq!(session.token, "tok_1");
        assert_eq!(session.customer.display_name(), "Claire Moreau");
        assert_eq!(session.customer.addresses.len(), 1);

        let wrong = client.login("claire@maison.fr", "nope").await;
        assert!(matches!(wrong, Err(ApiError::Unauthorized)));

        let me = client.me("tok_1").await.unwrap();
        assert_eq!(me.email, "claire@maison.fr");
        assert!(matches!(client.me("expired").await, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_password_reset_ignores_empty_body() {
        let client = test_client(spawn_backend(router()).await);
        client
            .request_password_reset("claire@maison.fr")
            .await
            .unwrap();
    }
}

//! Authentication extractors.
//!
//! The signed-in customer lives in the session under
//! [`crate::models::session_keys::CURRENT_CUSTOMER`] with its bearer token.
//! Token expiry is detected by the backend: a `401` on any customer-scoped
//! call becomes [`crate::error::AppError`]'s session-expired redirect.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentCustomer, session};

/// Extractor that requires a signed-in customer.
///
/// Page requests without one are redirected to the login page with the
/// original path as `next`.
///
/// # Example
///
/// ```rust,ignore
/// async fn orders(RequireCustomer(customer): RequireCustomer) -> impl IntoResponse {
///     format!("Orders for {}", customer.email)
/// }
/// ```
pub struct RequireCustomer(pub CurrentCustomer);

/// Error returned when a customer is required but nobody is signed in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page, then back to `next`.
    RedirectToLogin { next: String },
    /// HTMX requests get a client-side redirect instead of a login page
    /// swapped into a fragment.
    HxRedirect { next: String },
    /// The session layer is missing.
    Unauthorized,
}

impl AuthRejection {
    fn login_url(next: &str) -> String {
        format!("/auth/login?next={}", urlencoding::encode(next))
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => Redirect::to(&Self::login_url(&next)).into_response(),
            Self::HxRedirect { next } => {
                (StatusCode::OK, [("HX-Redirect", Self::login_url(&next))]).into_response()
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireCustomer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let store = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        match session::current_customer(store).await {
            Some(customer) => Ok(Self(customer)),
            None => {
                let next = request_path(parts);
                if parts.headers.contains_key("hx-request") {
                    Err(AuthRejection::HxRedirect { next })
                } else {
                    Err(AuthRejection::RedirectToLogin { next })
                }
            }
        }
    }
}

/// Path and query as the client sent it.
///
/// Nested routers see the URI with their prefix stripped, so the original
/// URI is preferred when the router recorded one.
#[must_use]
pub fn request_path(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0);
    uri.path_and_query()
        .map_or_else(|| "/".to_string(), ToString::to_string)
}

/// Extractor that optionally gets the signed-in customer.
///
/// Unlike `RequireCustomer`, this never rejects the request.
pub struct OptionalCustomer(pub Option<CurrentCustomer>);

impl<S> FromRequestParts<S> for OptionalCustomer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let customer = match parts.extensions.get::<Session>() {
            Some(store) => session::current_customer(store).await,
            None => None,
        };

        Ok(Self(customer))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_carries_encoded_next() {
        let response = AuthRejection::RedirectToLogin {
            next: "/account/orders?page=2".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/auth/login?next=%2Faccount%2Forders%3Fpage%3D2"
        );
    }

    #[test]
    fn test_htmx_rejection_uses_hx_redirect() {
        let response = AuthRejection::HxRedirect {
            next: "/wishlist".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("hx-redirect").unwrap(),
            "/auth/login?next=%2Fwishlist"
        );
    }

    #[test]
    fn test_request_path_prefers_original_uri() {
        let (mut parts, ()) = axum::http::Request::get("/orders?page=2")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(request_path(&parts), "/orders?page=2");

        parts.extensions.insert(OriginalUri(
            "/account/orders?page=2".parse().unwrap(),
        ));
        assert_eq!(request_path(&parts), "/account/orders?page=2");
    }
}

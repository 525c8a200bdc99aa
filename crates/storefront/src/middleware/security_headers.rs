//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Adds restrictive security headers to all responses. Start locked down and
//! loosen only when specific functionality requires it.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use super::CspNonce;
use crate::state::AppState;

/// Script host serving HTMX.
pub const SCRIPT_HOST: &str = "https://unpkg.com";

/// Build the Content-Security-Policy for one response.
///
/// ```text
/// default-src 'none';
/// script-src 'self' 'nonce-{nonce}' https://unpkg.com;
/// style-src 'self';
/// font-src 'self';
/// img-src 'self' data: {image_host};
/// connect-src 'self';
/// frame-src 'none';
/// object-src 'none';
/// base-uri 'self';
/// form-action 'self';
/// frame-ancestors 'none';
/// upgrade-insecure-requests
/// ```
///
/// `upgrade-insecure-requests` is left out for plain-http deployments
/// (local development) where it would break every asset.
#[must_use]
pub fn content_security_policy(nonce: &str, image_host: Option<&str>, https: bool) -> String {
    let mut img_src = "'self' data:".to_string();
    if let Some(host) = image_host.filter(|h| !h.is_empty()) {
        img_src.push(' ');
        img_src.push_str(host);
    }

    let mut policy = format!(
        "default-src 'none'; \
         script-src 'self' 'nonce-{nonce}' {SCRIPT_HOST}; \
         style-src 'self'; \
         font-src 'self'; \
         img-src {img_src}; \
         connect-src 'self'; \
         frame-src 'none'; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'"
    );
    if https {
        policy.push_str("; upgrade-insecure-requests");
    }
    policy
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY` - Prevent clickjacking
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `Referrer-Policy: no-referrer` - Zero referrer leakage
/// - `Content-Security-Policy` - see [`content_security_policy`]
/// - `Permissions-Policy` - Deny all sensitive features
/// - `Cache-Control: no-store, max-age=0` - carts and accounts are per
///   visitor; static assets set their own caching
/// - `Cross-Origin-Opener-Policy: same-origin` - Process isolation
/// - `Cross-Origin-Resource-Policy: same-origin` - Resource isolation
/// - `Cross-Origin-Embedder-Policy: credentialless` - product images come
///   from the image host, which does not send CORP headers
/// - `X-DNS-Prefetch-Control: off` - Prevent DNS prefetch leakage
///
/// Must run inside [`super::csp_nonce_middleware`] so the nonce is present.
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let nonce = request
        .extensions()
        .get::<CspNonce>()
        .map(|n| n.value().to_string())
        .unwrap_or_default();
    let is_static = request.uri().path().starts_with("/static/");

    let mut response = next.run(request).await;

    let config = state.config();
    let csp = content_security_policy(
        &nonce,
        config.image_host.as_deref(),
        config.secure_cookies(),
    );

    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));

    match HeaderValue::from_str(&csp) {
        Ok(value) => {
            headers.insert(CONTENT_SECURITY_POLICY, value);
        }
        Err(e) => {
            // Only possible with a malformed VERNONT_IMAGE_HOST.
            tracing::error!(error = %e, "Could not encode CSP, using fallback");
            headers.insert(
                CONTENT_SECURITY_POLICY,
                HeaderValue::from_static("default-src 'self'; frame-ancestors 'none'"),
            );
        }
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             autoplay=(), \
             browsing-topics=(), \
             camera=(), \
             display-capture=(), \
             encrypted-media=(), \
             fullscreen=(), \
             geolocation=(), \
             gyroscope=(), \
             hid=(), \
             idle-detection=(), \
             interest-cohort=(), \
             magnetometer=(), \
             microphone=(), \
             midi=(), \
             payment=(), \
             picture-in-picture=(), \
             publickey-credentials-get=(), \
             screen-wake-lock=(), \
             serial=(), \
             sync-xhr=(), \
             usb=(), \
             xr-spatial-tracking=()",
        ),
    );

    if !is_static {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-embedder-policy"),
        HeaderValue::from_static("credentialless"),
    );
    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_carries_nonce_and_image_host() {
        let policy = content_security_policy("abc123", Some("https://img.vernont.com"), true);
        assert!(policy.contains("script-src 'self' 'nonce-abc123' https://unpkg.com;"));
        assert!(policy.contains("img-src 'self' data: https://img.vernont.com;"));
        assert!(policy.ends_with("upgrade-insecure-requests"));
    }

    #[test]
    fn test_policy_without_image_host_over_http() {
        let policy = content_security_policy("n", None, false);
        assert!(policy.contains("img-src 'self' data:;"));
        assert!(!policy.contains("upgrade-insecure-requests"));
    }
}

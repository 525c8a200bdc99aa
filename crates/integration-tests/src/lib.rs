//! End-to-end tests for the Vernont storefront.
//!
//! These tests drive a running storefront over HTTP. They are `#[ignore]`d
//! by default because they need:
//! - `PostgreSQL` with the session table (`vernont-cli migrate sessions`)
//! - The storefront server (`cargo run -p vernont-storefront`)
//! - A commerce backend with at least one published product
//!
//! ```bash
//! STOREFRONT_BASE_URL=http://localhost:3000 cargo test -p vernont-integration-tests -- --ignored
//! ```

use reqwest::Client;

/// Base URL of the storefront under test.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Client that keeps the session cookie and does not follow redirects, so
/// tests can assert on `Location`.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Pull the first `/products/{handle}` link out of a page.
#[must_use]
pub fn first_product_path(html: &str) -> Option<String> {
    let start = html.find("href=\"/products/")? + "href=\"".len();
    let rest = html.get(start..)?;
    let end = rest.find('"')?;
    rest.get(..end).map(String::from)
}

/// Pull the value of the first `name="variant_id"` input out of a page.
#[must_use]
pub fn first_variant_id(html: &str) -> Option<String> {
    let field = html.find("name=\"variant_id\"")?;
    let rest = html.get(field..)?;
    let start = rest.find("value=\"")? + "value=\"".len();
    let rest = rest.get(start..)?;
    let end = rest.find('"')?;
    rest.get(..end).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_product_path() {
        let html = r#"<a href="/products">All</a><a href="/products/santal-noir">Santal</a>"#;
        assert_eq!(first_product_path(html).as_deref(), Some("/products/santal-noir"));
        assert_eq!(first_product_path("<p>none</p>"), None);
    }

    #[test]
    fn test_first_variant_id() {
        let html = r#"<input type="hidden" name="variant_id" value="variant_50">"#;
        assert_eq!(first_variant_id(html).as_deref(), Some("variant_50"));
    }
}

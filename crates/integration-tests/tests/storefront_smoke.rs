//! Smoke tests against a running storefront.
//!
//! Run with: cargo test -p vernont-integration-tests -- --ignored

use reqwest::StatusCode;
use vernont_integration_tests::{
    first_product_path, first_variant_id, session_client, storefront_base_url,
};

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_and_readiness() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Failed to reach storefront");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Failed to reach storefront");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("\"database\""));
}

#[tokio::test]
#[ignore = "Requires running storefront server and commerce backend"]
async fn test_security_headers_on_pages() {
    let client = session_client();
    let resp = client
        .get(format!("{}/", storefront_base_url()))
        .send()
        .await
        .expect("Failed to load home page");

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("content-security-policy"));
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and commerce backend"]
async fn test_browse_add_to_bag_and_reach_checkout() {
    let client = session_client();
    let base_url = storefront_base_url();

    let listing = client
        .get(format!("{base_url}/products"))
        .send()
        .await
        .expect("Failed to load listing")
        .text()
        .await
        .expect("Failed to read listing");
    let product_path = first_product_path(&listing).expect("Listing has no products");

    let detail = client
        .get(format!("{base_url}{product_path}"))
        .send()
        .await
        .expect("Failed to load product")
        .text()
        .await
        .expect("Failed to read product");
    let variant_id = first_variant_id(&detail).expect("Product has no purchasable variant");

    let resp = client
        .post(format!("{base_url}/cart/add"))
        .form(&[("variant_id", variant_id.as_str()), ("quantity", "1")])
        .send()
        .await
        .expect("Failed to add to bag");
    assert!(resp.status().is_success() || resp.status().is_redirection());

    let count = client
        .get(format!("{base_url}/cart/count"))
        .send()
        .await
        .expect("Failed to load badge")
        .text()
        .await
        .expect("Failed to read badge");
    assert!(count.contains('1'));

    let resp = client
        .get(format!("{base_url}/checkout"))
        .send()
        .await
        .expect("Failed to load checkout");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read checkout");
    assert!(body.contains("/checkout/information"));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_account_requires_sign_in() {
    let client = session_client();
    let resp = client
        .get(format!("{}/account/orders", storefront_base_url()))
        .send()
        .await
        .expect("Failed to request account");

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let location = resp.headers()["location"].to_str().expect("Bad location");
    assert!(location.starts_with("/auth/login?next="));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_auth_posts_are_rate_limited() {
    let client = session_client();
    let base_url = storefront_base_url();

    let mut limited = false;
    for _ in 0..20 {
        let resp = client
            .post(format!("{base_url}/auth/login"))
            .header("x-real-ip", "198.51.100.77")
            .form(&[("email", "nobody@example.com"), ("password", "wrong")])
            .send()
            .await
            .expect("Failed to post login");
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            limited = true;
            break;
        }
    }
    assert!(limited);
}

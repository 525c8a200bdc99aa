//! Commerce backend connectivity check.
//!
//! # Environment Variables
//!
//! - `VERNONT_API_URL` - Backend base URL
//! - `VERNONT_PUBLISHABLE_KEY` - Publishable key sent with every request
//! - `VERNONT_API_TIMEOUT_SECS` - Optional request timeout

use vernont_storefront::api::{ApiError, CommerceClient};
use vernont_storefront::config::{CommerceApiConfig, ConfigError};

#[derive(Debug, thiserror::Error)]
pub enum PingError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Commerce backend error: {0}")]
    Api(#[from] ApiError),
}

/// Fetch the store settings and report what the storefront will see.
///
/// # Errors
///
/// Returns `PingError` if configuration is incomplete or the backend cannot
/// be reached.
pub async fn run() -> Result<(), PingError> {
    let _ = dotenvy::dotenv();
    let config = CommerceApiConfig::from_env()?;

    tracing::info!(url = %config.base_url, "Contacting commerce backend...");
    let client = CommerceClient::new(&config)?;
    let settings = client.store_settings().await?;

    tracing::info!(
        store = %settings.name,
        default_currency = %settings.default_currency,
        currencies = settings.currencies.len(),
        return_window_days = settings.return_window_days,
        "Commerce backend reachable"
    );
    Ok(())
}

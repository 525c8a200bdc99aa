//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use vernont_core::CurrencyCode;

use crate::api::{ApiError, CommerceClient, StoreSettings};
use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// session database pool, the commerce client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    commerce: CommerceClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool (session store)
    ///
    /// # Errors
    ///
    /// Returns an error if the commerce client cannot be built from the
    /// configuration.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, ApiError> {
        let commerce = CommerceClient::new(&config.commerce)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                commerce,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the commerce backend client.
    #[must_use]
    pub fn commerce(&self) -> &CommerceClient {
        &self.inner.commerce
    }

    /// Store settings, falling back to single-currency defaults when the
    /// backend is unavailable so pages can still render.
    pub async fn settings(&self) -> StoreSettings {
        match self.inner.commerce.store_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Store settings unavailable, using defaults");
                StoreSettings::default()
            }
        }
    }

    /// Resolve a visitor's stored currency preference against what the store
    /// supports.
    pub async fn resolve_currency(&self, preferred: Option<CurrencyCode>) -> CurrencyCode {
        let settings = self.settings().await;
        preferred
            .filter(|c| settings.supports(*c))
            .unwrap_or(settings.default_currency)
    }
}

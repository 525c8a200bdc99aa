//! Store settings.

use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::conversions::convert_store_settings;
use super::dto::StoreEnvelope;
use super::types::StoreSettings;
use super::{ApiError, CommerceClient};

impl CommerceClient {
    /// Fetch storefront settings (currencies, free-shipping thresholds).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the payload is invalid.
    #[instrument(skip(self))]
    pub async fn store_settings(&self) -> Result<StoreSettings, ApiError> {
        if let Some(CacheValue::Settings(settings)) = self.cache().get(&CacheKey::Settings).await {
            debug!("Cache hit for store settings");
            return Ok(*settings);
        }

        let settings = self.fetch_store_settings().await?;
        self.cache()
            .insert(
                CacheKey::Settings,
                CacheValue::Settings(Box::new(settings.clone())),
            )
            .await;
        Ok(settings)
    }

    /// Check that the backend is reachable and answering with valid data.
    ///
    /// Bypasses the cache.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying settings request.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), ApiError> {
        self.fetch_store_settings().await.map(|_| ())
    }

    async fn fetch_store_settings(&self) -> Result<StoreSettings, ApiError> {
        let envelope: StoreEnvelope = self.get(&["store", "settings"], &[], None).await?;
        Ok(convert_store_settings(envelope.store)?)
    }
}

//! Data every full page renders in its shell: header, currency switcher and
//! footer.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use vernont_core::CurrencyCode;

use crate::middleware::CspNonce;
use crate::middleware::auth::request_path;
use crate::models::session;
use crate::state::AppState;

/// Page shell context, extracted once per page request.
///
/// The cart badge is not part of it: the header loads `/cart/count` with
/// HTMX so pages never wait on a cart fetch.
#[derive(Debug, Clone)]
pub struct Layout {
    pub nonce: String,
    pub store_name: String,
    pub support_email: Option<String>,
    /// Greeting for the signed-in customer.
    pub customer_name: Option<String>,
    pub currency: CurrencyCode,
    /// Currencies offered in the switcher, the active one included.
    pub currencies: Vec<CurrencyCode>,
    /// Path and query of this page, where the currency switcher returns.
    pub path: String,
}

impl Layout {
    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.customer_name.is_some()
    }

    /// Whether `currency` is the active one, for the switcher.
    #[must_use]
    pub fn is_current(&self, currency: &CurrencyCode) -> bool {
        *currency == self.currency
    }

    /// Title shown in `<title>`.
    #[must_use]
    pub fn title(&self, page: &str) -> String {
        if page.is_empty() {
            self.store_name.clone()
        } else {
            format!("{page} | {}", self.store_name)
        }
    }
}

impl FromRequestParts<AppState> for Layout {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let nonce = parts
            .extensions
            .get::<CspNonce>()
            .map(|n| n.value().to_string())
            .unwrap_or_default();

        let (customer, preferred) = match parts.extensions.get::<Session>() {
            Some(store) => (
                session::current_customer(store).await,
                session::currency(store).await,
            ),
            None => (None, None),
        };

        let settings = state.settings().await;
        let currency = preferred
            .filter(|c| settings.supports(*c))
            .unwrap_or(settings.default_currency);

        Ok(Self {
            nonce,
            store_name: settings.name,
            support_email: settings.support_email,
            customer_name: customer.map(|c| c.greeting_name().to_string()),
            currency,
            currencies: settings.currencies,
            path: request_path(parts),
        })
    }
}

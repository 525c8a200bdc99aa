//! Session-related types and typed accessors.
//!
//! Reads treat a missing or undecodable value as absent (logged at warn).
//! Writes propagate the store error.

use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;
use vernont_core::{CartId, CurrencyCode, CustomerId, OrderId, ReviewId};

use crate::api::{AuthSession, Customer};
use crate::checkout::CheckoutState;

use super::{RecentSearches, Wishlist};

/// Session keys.
pub mod keys {
    /// Backend cart id.
    pub const CART_ID: &str = "cart_id";

    /// Preferred display currency (lower-case ISO code).
    pub const CURRENCY: &str = "currency";

    /// Saved product ids.
    pub const WISHLIST: &str = "wishlist";

    /// Recent search queries.
    pub const RECENT_SEARCHES: &str = "recent_searches";

    /// Signed-in customer with bearer token.
    pub const CURRENT_CUSTOMER: &str = "customer";

    /// Checkout wizard position.
    pub const CHECKOUT: &str = "checkout";

    /// Order placed in this session, readable on the confirmation page.
    pub const LAST_ORDER_ID: &str = "last_order_id";

    /// Reviews already voted helpful.
    pub const HELPFUL_VOTES: &str = "helpful_votes";
}

/// Session-stored customer identity.
///
/// The token authenticates customer-scoped backend calls and is never
/// written to logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentCustomer {
    pub id: CustomerId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub token: String,
}

impl CurrentCustomer {
    #[must_use]
    pub fn from_auth(auth: AuthSession) -> Self {
        let AuthSession { token, customer } = auth;
        Self::with_token(customer, token)
    }

    #[must_use]
    pub fn with_token(customer: Customer, token: String) -> Self {
        Self {
            id: customer.id,
            email: customer.email,
            first_name: customer.first_name,
            last_name: customer.last_name,
            token,
        }
    }

    /// First name, or the email when none is on file.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        self.first_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.email)
    }
}

impl fmt::Debug for CurrentCustomer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentCustomer")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Typed Accessors
// =============================================================================

async fn read<T: DeserializeOwned>(session: &Session, key: &str) -> Option<T> {
    match session.get::<T>(key).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding unreadable session value");
            None
        }
    }
}

pub async fn cart_id(session: &Session) -> Option<CartId> {
    read(session, keys::CART_ID).await
}

/// Store the cart id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_cart_id(session: &Session, cart_id: &CartId) -> Result<(), SessionError> {
    session.insert(keys::CART_ID, cart_id).await
}

/// Forget the cart and any checkout progress on it.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_cart(session: &Session) -> Result<(), SessionError> {
    session.remove_value(keys::CART_ID).await?;
    session.remove_value(keys::CHECKOUT).await?;
    Ok(())
}

pub async fn currency(session: &Session) -> Option<CurrencyCode> {
    read(session, keys::CURRENCY).await
}

/// Store the currency preference.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_currency(session: &Session, currency: CurrencyCode) -> Result<(), SessionError> {
    session.insert(keys::CURRENCY, currency).await
}

pub async fn wishlist(session: &Session) -> Wishlist {
    read(session, keys::WISHLIST).await.unwrap_or_default()
}

/// Store the wishlist.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_wishlist(session: &Session, wishlist: &Wishlist) -> Result<(), SessionError> {
    session.insert(keys::WISHLIST, wishlist).await
}

pub async fn recent_searches(session: &Session) -> RecentSearches {
    read(session, keys::RECENT_SEARCHES)
        .await
        .unwrap_or_default()
}

/// Store recent searches.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_recent_searches(
    session: &Session,
    searches: &RecentSearches,
) -> Result<(), SessionError> {
    session.insert(keys::RECENT_SEARCHES, searches).await
}

pub async fn current_customer(session: &Session) -> Option<CurrentCustomer> {
    read(session, keys::CURRENT_CUSTOMER).await
}

/// Sign a customer in.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: &CurrentCustomer,
) -> Result<(), SessionError> {
    session.insert(keys::CURRENT_CUSTOMER, customer).await
}

pub async fn checkout_state(session: &Session) -> Option<CheckoutState> {
    read(session, keys::CHECKOUT).await
}

/// Store the checkout position.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_checkout_state(
    session: &Session,
    state: &CheckoutState,
) -> Result<(), SessionError> {
    session.insert(keys::CHECKOUT, state).await
}

pub async fn last_order_id(session: &Session) -> Option<OrderId> {
    read(session, keys::LAST_ORDER_ID).await
}

/// Remember the order just placed.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_last_order_id(session: &Session, order_id: &OrderId) -> Result<(), SessionError> {
    session.insert(keys::LAST_ORDER_ID, order_id).await
}

/// Maximum remembered helpful votes.
const MAX_HELPFUL_VOTES: usize = 200;

pub async fn helpful_votes(session: &Session) -> Vec<ReviewId> {
    read(session, keys::HELPFUL_VOTES)
        .await
        .unwrap_or_default()
}

/// Record a helpful vote. Returns `false` if the review was already voted.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn record_helpful_vote(
    session: &Session,
    review_id: &ReviewId,
) -> Result<bool, SessionError> {
    let mut votes = helpful_votes(session).await;
    if votes.contains(review_id) {
        return Ok(false);
    }
    if votes.len() >= MAX_HELPFUL_VOTES {
        votes.remove(0);
    }
    votes.push(review_id.clone());
    session.insert(keys::HELPFUL_VOTES, votes).await?;
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn customer() -> CurrentCustomer {
        CurrentCustomer {
            id: CustomerId::new("cus_1"),
            email: "claire@maison.fr".to_string(),
            first_name: Some("Claire".to_string()),
            last_name: None,
            token: "tok_secret_value".to_string(),
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", customer());
        assert!(debug.contains("claire@maison.fr"));
        assert!(!debug.contains("tok_secret_value"));
    }

    #[test]
    fn test_greeting_name_falls_back_to_email() {
        let mut c = customer();
        assert_eq!(c.greeting_name(), "Claire");
        c.first_name = Some(String::new());
        assert_eq!(c.greeting_name(), "claire@maison.fr");
    }

    #[tokio::test]
    async fn test_cart_and_checkout_cleared_together() {
        let session = session();
        let id = CartId::new("cart_1");
        set_cart_id(&session, &id).await.unwrap();
        set_checkout_state(&session, &CheckoutState::new(id.clone()))
            .await
            .unwrap();

        assert_eq!(cart_id(&session).await, Some(id));
        clear_cart(&session).await.unwrap();
        assert_eq!(cart_id(&session).await, None);
        assert!(checkout_state(&session).await.is_none());
    }

    #[tokio::test]
    async fn test_unreadable_currency_is_absent() {
        let session = session();
        session.insert(keys::CURRENCY, "xau").await.unwrap();
        assert_eq!(currency(&session).await, None);

        set_currency(&session, CurrencyCode::EUR).await.unwrap();
        assert_eq!(currency(&session).await, Some(CurrencyCode::EUR));
    }

    #[tokio::test]
    async fn test_helpful_vote_recorded_once() {
        let session = session();
        let review = ReviewId::new("rev_1");
        assert!(record_helpful_vote(&session, &review).await.unwrap());
        assert!(!record_helpful_vote(&session, &review).await.unwrap());
        assert_eq!(helpful_votes(&session).await, vec![review]);
    }
}

//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The table is
//! created by `vernont-cli migrate sessions`, never on startup. Cookies are
//! signed with a key derived from `STOREFRONT_SESSION_SECRET`.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha512};
use sqlx::PgPool;
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "vernont_session";

/// Session expiry after inactivity, in seconds (30 days).
const SESSION_EXPIRY_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Session layer as served: signed cookies over some store.
pub type StorefrontSessionLayer<S> = SessionManagerLayer<S, SignedCookie>;

/// Create the session layer with the `PostgreSQL` store.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> StorefrontSessionLayer<PostgresStore> {
    configure(PostgresStore::new(pool.clone()), config)
}

/// Apply the storefront's cookie settings to any store.
pub fn configure<S: SessionStore + Clone>(
    store: S,
    config: &StorefrontConfig,
) -> StorefrontSessionLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_signed(signing_key(&config.session_secret))
}

/// 64-byte signing key: SHA-512 of the configured secret.
fn signing_key(secret: &SecretString) -> Key {
    let digest = Sha512::digest(secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_is_stable_per_secret() {
        let a = signing_key(&SecretString::from("k3J9x2QmZ7vL0pR4tY8wB1nC6hF5dGq1"));
        let b = signing_key(&SecretString::from("k3J9x2QmZ7vL0pR4tY8wB1nC6hF5dGq1"));
        let c = signing_key(&SecretString::from("p8Xw2LmQ4rT7vB9nK1cZ6hF3dG5sJ0aY"));
        assert_eq!(a.master(), b.master());
        assert_ne!(a.master(), c.master());
    }
}

//! Session-backed visitor state.
//!
//! The storefront keeps no database tables of its own. Everything a visitor
//! accumulates between requests (cart id, currency, wishlist, recent
//! searches, sign-in) lives in the tower-sessions record.

pub mod recent_searches;
pub mod session;
pub mod wishlist;

pub use recent_searches::RecentSearches;
pub use session::{CurrentCustomer, keys as session_keys};
pub use wishlist::Wishlist;

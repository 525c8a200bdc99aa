//! Vernont storefront library.
//!
//! Server-rendered pages and HTMX fragments over the commerce backend's
//! REST API. The binary in `main.rs` adds configuration, tracing and Sentry
//! around [`routes::app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod forms;
pub mod layout;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

#[cfg(test)]
mod test_support;

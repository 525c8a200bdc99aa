//! Visitor preferences.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use vernont_core::CurrencyCode;

use crate::api::{ApiError, CartUpdate};
use crate::error::{AppError, Result};
use crate::models::session;
use crate::state::AppState;

use super::safe_return_path;

#[derive(Debug, Deserialize)]
pub struct CurrencyForm {
    pub currency: String,
    pub return_to: Option<String>,
}

/// Switch the display currency.
///
/// Only currencies the store offers are accepted. An open cart is moved to
/// the new currency so prices stay consistent through checkout.
#[instrument(skip(state, session, form), fields(currency = %form.currency))]
pub async fn set_currency(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CurrencyForm>,
) -> Result<Response> {
    let settings = state.settings().await;
    let currency = CurrencyCode::parse(&form.currency)
        .ok()
        .filter(|c| settings.supports(*c))
        .ok_or_else(|| AppError::BadRequest("Unsupported currency".to_string()))?;

    session::set_currency(&session, currency).await?;

    if let Some(cart_id) = session::cart_id(&session).await {
        let update = CartUpdate {
            currency_code: Some(currency),
            ..CartUpdate::default()
        };
        match state.commerce().update_cart(&cart_id, &update).await {
            Ok(_) => tracing::info!(cart_id = %cart_id, "Cart moved to new currency"),
            Err(ApiError::NotFound(_)) => session::clear_cart(&session).await?,
            Err(e) => return Err(e.into()),
        }
    }

    let back = safe_return_path(form.return_to.as_deref()).unwrap_or_else(|| "/".to_string());
    Ok(Redirect::to(&back).into_response())
}

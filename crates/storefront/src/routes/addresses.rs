//! Address book handlers.
//!
//! Addresses are validated with the same rules as checkout before they are
//! sent to the backend.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;
use vernont_core::AddressId;

use crate::api::{ApiError, Customer, SavedAddress};
use crate::error::{AppError, Result};
use crate::filters;
use crate::forms::{AddressFields, AddressInput, FieldErrors};
use crate::layout::Layout;
use crate::middleware::RequireCustomer;
use crate::state::AppState;

/// Address forms use unprefixed field names.
const PREFIX: &str = "";

#[derive(Debug, Clone)]
pub struct AddressView {
    pub id: String,
    pub lines: Vec<String>,
    pub is_default: bool,
}

impl AddressView {
    fn new(saved: &SavedAddress) -> Self {
        Self {
            id: saved.id.to_string(),
            lines: saved.address.lines(),
            is_default: saved.is_default_shipping,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "account/addresses.html")]
pub struct AddressesTemplate {
    pub layout: Layout,
    pub addresses: Vec<AddressView>,
    pub notice: Option<&'static str>,
}

/// New and edit form.
#[derive(Template, WebTemplate)]
#[template(path = "account/address_form.html")]
pub struct AddressFormTemplate {
    pub layout: Layout,
    pub heading: &'static str,
    pub action: String,
    pub fields: AddressFields,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddressesQuery {
    pub saved: Option<String>,
    pub deleted: Option<String>,
}

fn find_address<'a>(customer: &'a Customer, address_id: &str) -> Result<&'a SavedAddress> {
    customer
        .addresses
        .iter()
        .find(|a| a.id.as_str() == address_id)
        .ok_or_else(|| AppError::NotFound(format!("address {address_id}")))
}

fn not_found(e: ApiError, address_id: &str) -> AppError {
    match e {
        ApiError::NotFound(_) => AppError::NotFound(format!("address {address_id}")),
        e => e.into(),
    }
}

/// List saved addresses.
#[instrument(skip_all, fields(customer_id = %customer.id))]
pub async fn index(
    State(state): State<AppState>,
    layout: Layout,
    RequireCustomer(customer): RequireCustomer,
    Query(query): Query<AddressesQuery>,
) -> Result<impl IntoResponse> {
    let profile = state.commerce().me(&customer.token).await?;
    let notice = if query.saved.is_some() {
        Some("Address saved.")
    } else if query.deleted.is_some() {
        Some("Address removed.")
    } else {
        None
    };

    Ok(AddressesTemplate {
        layout,
        addresses: profile.addresses.iter().map(AddressView::new).collect(),
        notice,
    })
}

/// Empty form for a new address.
pub async fn new_page(layout: Layout, RequireCustomer(_): RequireCustomer) -> impl IntoResponse {
    AddressFormTemplate {
        layout,
        heading: "Add an address",
        action: "/account/addresses".to_string(),
        fields: AddressFields::new(PREFIX, AddressInput::default(), &FieldErrors::new()),
        message: None,
    }
}

/// Save a new address.
#[instrument(skip_all, fields(customer_id = %customer.id))]
pub async fn create(
    State(state): State<AppState>,
    layout: Layout,
    RequireCustomer(customer): RequireCustomer,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response> {
    let input = AddressInput::from_fields(&fields, PREFIX);
    let page = |errors: &FieldErrors, message: Option<String>| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            AddressFormTemplate {
                layout: layout.clone(),
                heading: "Add an address",
                action: "/account/addresses".to_string(),
                fields: AddressFields::new(PREFIX, input.clone(), errors),
                message,
            },
        )
            .into_response()
    };

    let mut errors = FieldErrors::new();
    let Some(address) = input.validate(PREFIX, &mut errors) else {
        return Ok(page(&errors, None));
    };

    match state.commerce().add_address(&customer.token, &address).await {
        Ok(_) => {
            tracing::info!("Address added");
            Ok(Redirect::to("/account/addresses?saved=1").into_response())
        }
        Err(e) if e.is_rejection() => Ok(page(&errors, e.user_message().map(String::from))),
        Err(e) => Err(e.into()),
    }
}

/// Form prefilled with a saved address.
#[instrument(skip(state, layout, customer), fields(customer_id = %customer.id))]
pub async fn edit_page(
    State(state): State<AppState>,
    layout: Layout,
    RequireCustomer(customer): RequireCustomer,
    Path(address_id): Path<String>,
) -> Result<impl IntoResponse> {
    let profile = state.commerce().me(&customer.token).await?;
    let saved = find_address(&profile, &address_id)?;

    Ok(AddressFormTemplate {
        layout,
        heading: "Edit address",
        action: format!("/account/addresses/{address_id}"),
        fields: AddressFields::new(
            PREFIX,
            AddressInput::from_address(&saved.address),
            &FieldErrors::new(),
        ),
        message: None,
    })
}

/// Replace a saved address.
#[instrument(skip(state, layout, customer, fields), fields(customer_id = %customer.id))]
pub async fn update(
    State(state): State<AppState>,
    layout: Layout,
    RequireCustomer(customer): RequireCustomer,
    Path(address_id): Path<String>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response> {
    let input = AddressInput::from_fields(&fields, PREFIX);
    let page = |errors: &FieldErrors, message: Option<String>| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            AddressFormTemplate {
                layout: layout.clone(),
                heading: "Edit address",
                action: format!("/account/addresses/{address_id}"),
                fields: AddressFields::new(PREFIX, input.clone(), errors),
                message,
            },
        )
            .into_response()
    };

    let mut errors = FieldErrors::new();
    let Some(address) = input.validate(PREFIX, &mut errors) else {
        return Ok(page(&errors, None));
    };

    match state
        .commerce()
        .update_address(&customer.token, &AddressId::new(address_id.as_str()), &address)
        .await
    {
        Ok(_) => {
            tracing::info!("Address updated");
            Ok(Redirect::to("/account/addresses?saved=1").into_response())
        }
        Err(e) if e.is_rejection() => Ok(page(&errors, e.user_message().map(String::from))),
        Err(e) => Err(not_found(e, &address_id)),
    }
}

/// Delete a saved address.
#[instrument(skip(state, customer), fields(customer_id = %customer.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    Path(address_id): Path<String>,
) -> Result<Redirect> {
    state
        .commerce()
        .delete_address(&customer.token, &AddressId::new(address_id.as_str()))
        .await
        .map_err(|e| not_found(e, &address_id))?;
    tracing::info!("Address deleted");
    Ok(Redirect::to("/account/addresses?deleted=1"))
}

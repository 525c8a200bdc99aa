//! Account route handlers.
//!
//! These routes require a signed-in customer. Every page reads fresh data
//! from the backend with the customer's token; an expired token surfaces as
//! the session-expired redirect.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use vernont_core::OrderId;

use crate::api::{ApiError, Order, ProfileUpdate};
use crate::error::{AppError, Result};
use crate::filters;
use crate::forms::{self, FieldErrors};
use crate::layout::Layout;
use crate::middleware::RequireCustomer;
use crate::models::{CurrentCustomer, session};
use crate::state::AppState;

use super::cart::non_zero;
use super::products::Pagination;

/// Orders per page of the order history.
pub const ORDERS_PER_PAGE: u32 = 10;

/// Orders shown on the overview.
const RECENT_ORDERS: u32 = 3;

const MAX_NAME_LENGTH: usize = 80;
const MAX_PHONE_LENGTH: usize = 30;

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub id: String,
    pub handle: Option<String>,
    pub title: String,
    pub variant_title: Option<String>,
    pub thumbnail: Option<String>,
    pub quantity: u32,
    /// Units still eligible for a return or exchange.
    pub returnable: u32,
    pub unit_price: String,
    pub total: String,
}

/// Order display data for templates.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: String,
    /// "#1001".
    pub display_id: String,
    pub date: String,
    pub status: &'static str,
    pub fulfillment_status: &'static str,
    pub payment_status: &'static str,
    pub email: String,
    pub items: Vec<OrderItemView>,
    pub item_count: u32,
    pub ship_to: Vec<String>,
    pub shipping_method: Option<String>,
    pub subtotal: String,
    pub discount_total: Option<String>,
    pub shipping_total: String,
    pub tax_total: Option<String>,
    pub total: String,
    pub can_return: bool,
}

impl OrderView {
    #[must_use]
    pub fn new(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            display_id: format!("#{}", order.display_id),
            date: order.created_at.format("%B %-d, %Y").to_string(),
            status: order.status.label(),
            fulfillment_status: order.fulfillment_status.label(),
            payment_status: order.payment_status.label(),
            email: order.email.clone(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    id: item.id.to_string(),
                    handle: item.product_handle.clone(),
                    title: item.title.clone(),
                    variant_title: item.variant_title.clone(),
                    thumbnail: item.thumbnail.clone(),
                    quantity: item.quantity,
                    returnable: item.returnable_quantity(),
                    unit_price: item.unit_price.to_string(),
                    total: item.total.to_string(),
                })
                .collect(),
            item_count: order
                .items
                .iter()
                .fold(0_u32, |acc, item| acc.saturating_add(item.quantity)),
            ship_to: order
                .shipping_address
                .as_ref()
                .map(crate::api::Address::lines)
                .unwrap_or_default(),
            shipping_method: order.shipping_methods.first().map(|m| m.name.clone()),
            subtotal: order.subtotal.to_string(),
            discount_total: non_zero(order.discount_total),
            shipping_total: if order.shipping_total.is_zero() {
                "Free".to_string()
            } else {
                order.shipping_total.to_string()
            },
            tax_total: non_zero(order.tax_total),
            total: order.total.to_string(),
            can_return: order.has_returnable_items(),
        }
    }
}

/// Profile form state.
#[derive(Debug, Clone, Default)]
pub struct ProfileView {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub errors: FieldErrors,
}

// =============================================================================
// Templates
// =============================================================================

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub layout: Layout,
    pub name: String,
    pub email: String,
    pub recent_orders: Vec<OrderView>,
    pub default_address: Option<Vec<String>>,
    pub address_count: usize,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub layout: Layout,
    pub profile: ProfileView,
    pub saved: bool,
    pub message: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderView>,
    pub pagination: Pagination,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/order.html")]
pub struct OrderTemplate {
    pub layout: Layout,
    pub order: OrderView,
}

// =============================================================================
// Form & Query Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
}

impl ProfileForm {
    /// Validate into a profile update.
    ///
    /// # Errors
    ///
    /// Returns every field that failed validation.
    pub fn validate(&self) -> std::result::Result<ProfileUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();
        let first_name = forms::required(
            &mut errors,
            "first_name",
            "First name",
            &self.first_name,
            MAX_NAME_LENGTH,
        );
        let last_name = forms::required(
            &mut errors,
            "last_name",
            "Last name",
            &self.last_name,
            MAX_NAME_LENGTH,
        );
        let phone = forms::optional(&mut errors, "phone", "Phone", &self.phone, MAX_PHONE_LENGTH);
        errors.into_result(ProfileUpdate {
            first_name,
            last_name,
            phone,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    pub saved: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub page: Option<u32>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display account overview page.
#[instrument(skip_all, fields(customer_id = %customer.id))]
pub async fn index(
    State(state): State<AppState>,
    layout: Layout,
    RequireCustomer(customer): RequireCustomer,
) -> Result<impl IntoResponse> {
    let profile = state.commerce().me(&customer.token).await?;
    let recent = state
        .commerce()
        .customer_orders(&customer.token, RECENT_ORDERS, 0)
        .await?;

    let default_address = profile
        .addresses
        .iter()
        .find(|a| a.is_default_shipping)
        .or_else(|| profile.addresses.first())
        .map(|a| a.address.lines());

    Ok(AccountIndexTemplate {
        layout,
        name: profile.display_name(),
        email: profile.email.clone(),
        recent_orders: recent.orders.iter().map(OrderView::new).collect(),
        default_address,
        address_count: profile.addresses.len(),
    })
}

/// Display the profile form.
#[instrument(skip_all, fields(customer_id = %customer.id))]
pub async fn profile_page(
    State(state): State<AppState>,
    layout: Layout,
    RequireCustomer(customer): RequireCustomer,
    Query(query): Query<ProfileQuery>,
) -> Result<impl IntoResponse> {
    let profile = state.commerce().me(&customer.token).await?;
    Ok(ProfileTemplate {
        layout,
        profile: ProfileView {
            email: profile.email,
            first_name: profile.first_name.unwrap_or_default(),
            last_name: profile.last_name.unwrap_or_default(),
            phone: profile.phone.unwrap_or_default(),
            errors: FieldErrors::new(),
        },
        saved: query.saved.is_some(),
        message: None,
    })
}

/// Save names and phone.
#[instrument(skip_all, fields(customer_id = %customer.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    RequireCustomer(customer): RequireCustomer,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    let page = |errors: FieldErrors, message: Option<String>| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            ProfileTemplate {
                layout: layout.clone(),
                profile: ProfileView {
                    email: customer.email.clone(),
                    first_name: form.first_name.trim().to_string(),
                    last_name: form.last_name.trim().to_string(),
                    phone: form.phone.trim().to_string(),
                    errors,
                },
                saved: false,
                message,
            },
        )
            .into_response()
    };

    let update = match form.validate() {
        Ok(update) => update,
        Err(errors) => return Ok(page(errors, None)),
    };

    match state
        .commerce()
        .update_profile(&customer.token, &update)
        .await
    {
        Ok(updated) => {
            let refreshed = CurrentCustomer::with_token(updated, customer.token.clone());
            session::set_current_customer(&session, &refreshed).await?;
            tracing::info!("Profile updated");
            Ok(Redirect::to("/account/profile?saved=1").into_response())
        }
        Err(e) if e.is_rejection() => Ok(page(
            FieldErrors::new(),
            e.user_message().map(String::from),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Order history, newest first.
#[instrument(skip_all, fields(customer_id = %customer.id))]
pub async fn orders(
    State(state): State<AppState>,
    layout: Layout,
    RequireCustomer(customer): RequireCustomer,
    Query(query): Query<OrdersQuery>,
) -> Result<impl IntoResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1).saturating_mul(ORDERS_PER_PAGE);
    let result = state
        .commerce()
        .customer_orders(&customer.token, ORDERS_PER_PAGE, offset)
        .await?;

    Ok(OrdersTemplate {
        layout,
        orders: result.orders.iter().map(OrderView::new).collect(),
        pagination: Pagination::for_offset(
            result.count,
            result.offset,
            result.limit,
            "/account/orders?",
            "page",
        ),
    })
}

/// Load one of the customer's orders; foreign and unknown ids are 404.
pub(crate) async fn customer_order(
    state: &AppState,
    customer: &CurrentCustomer,
    order_id: &str,
) -> Result<Order> {
    match state
        .commerce()
        .order(&OrderId::new(order_id), Some(&customer.token))
        .await
    {
        Ok(order) => Ok(order),
        Err(ApiError::NotFound(_)) => Err(AppError::NotFound(format!("order {order_id}"))),
        Err(e) => Err(e.into()),
    }
}

/// Order detail page.
#[instrument(skip(state, layout, customer), fields(customer_id = %customer.id))]
pub async fn order(
    State(state): State<AppState>,
    layout: Layout,
    RequireCustomer(customer): RequireCustomer,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse> {
    let order = customer_order(&state, &customer, &order_id).await?;
    Ok(OrderTemplate {
        layout,
        order: OrderView::new(&order),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use axum::Router;
    use axum::extract::{Path, Query};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use serde_json::{Value, json};

    use super::*;
    use crate::api::conversions::convert_order;
    use crate::test_support::{TestApp, backend, body_text, customer_json, location, order_json};

    #[test]
    fn test_order_view() {
        let dto = serde_json::from_value(order_json("order_1", 1001)).unwrap();
        let view = OrderView::new(&convert_order(dto).unwrap());

        assert_eq!(view.display_id, "#1001");
        assert_eq!(view.date, "May 4, 2026");
        assert_eq!(view.item_count, 2);
        assert_eq!(view.items[0].returnable, 2);
        assert_eq!(view.shipping_total, "Free");
        assert_eq!(view.ship_to[0], "Claire Moreau");
        assert!(view.discount_total.is_none());
        assert!(view.can_return);
    }

    #[test]
    fn test_profile_validation() {
        let form = ProfileForm {
            first_name: " Claire ".to_string(),
            last_name: String::new(),
            phone: String::new(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("last_name"), Some("Last name is required"));
        assert!(!errors.has("first_name"));
    }

    /// Backend with a signed-in customer and two pages of orders.
    pub(crate) fn account_backend() -> Router {
        backend()
            .route(
                "/store/auth",
                post(|| async {
                    axum::Json(json!({ "token": "tok_1", "customer": customer_json() }))
                }),
            )
            .route(
                "/store/customers/me",
                get(|| async { axum::Json(json!({ "customer": customer_json() })) }).post(
                    |axum::Json(body): axum::Json<Value>| async move {
                        let mut customer = customer_json();
                        customer["first_name"] = body["first_name"].clone();
                        customer["last_name"] = body["last_name"].clone();
                        axum::Json(json!({ "customer": customer }))
                    },
                ),
            )
            .route(
                "/store/customers/me/orders",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    let offset: u32 = params["offset"].parse().unwrap();
                    axum::Json(json!({
                        "orders": [order_json("order_1", 1001 + u64::from(offset))],
                        "count": 11,
                        "offset": offset,
                        "limit": params["limit"].parse::<u32>().unwrap()
                    }))
                }),
            )
            .route(
                "/store/orders/{id}",
                get(|Path(id): Path<String>| async move {
                    if id == "order_1" {
                        axum::Json(json!({ "order": order_json(&id, 1001) })).into_response()
                    } else {
                        (
                            StatusCode::NOT_FOUND,
                            axum::Json(json!({ "message": "Order not found" })),
                        )
                            .into_response()
                    }
                }),
            )
    }

    pub(crate) async fn signed_in(backend: Router) -> TestApp {
        let mut app = TestApp::new(backend).await;
        app.post_form(
            "/auth/login",
            &[("email", "claire@maison.fr"), ("password", "correct-horse")],
        )
        .await;
        app
    }

    #[tokio::test]
    async fn test_account_requires_sign_in() {
        let mut app = TestApp::new(account_backend()).await;
        let response = app.get("/account/orders?page=2").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            "/auth/login?next=%2Faccount%2Forders%3Fpage%3D2"
        );
    }

    #[tokio::test]
    async fn test_order_history_pages() {
        let mut app = signed_in(account_backend()).await;
        let body = body_text(app.get("/account/orders?page=2").await).await;
        assert!(body.contains("#1011"));
        assert!(body.contains("Page 2 of 2"));
        assert!(body.contains("/account/orders?page=1"));
    }

    #[tokio::test]
    async fn test_foreign_order_is_not_found() {
        let mut app = signed_in(account_backend()).await;
        let response = app.get("/account/orders/order_9").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.get("/account/orders/order_1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("12 Rue du Bac"));
    }

    #[tokio::test]
    async fn test_profile_update_refreshes_greeting() {
        let mut app = signed_in(account_backend()).await;
        let response = app
            .post_form(
                "/account/profile",
                &[("first_name", "Camille"), ("last_name", "Moreau")],
            )
            .await;
        assert_eq!(location(&response), "/account/profile?saved=1");

        let body = body_text(app.get("/account/profile?saved=1").await).await;
        assert!(body.contains("Camille"));
        assert!(body.contains("Your profile has been saved."));
    }

    #[tokio::test]
    async fn test_profile_errors_are_inline() {
        let mut app = signed_in(account_backend()).await;
        let response = app
            .post_form("/account/profile", &[("first_name", ""), ("last_name", "Moreau")])
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("First name is required"));
    }
}

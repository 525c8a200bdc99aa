//! Returns and exchanges.
//!
//! The storefront only collects the request; whether an order is still
//! eligible is decided by the backend, which rejects requests outside the
//! return window.
//!
//! # Form fields
//!
//! Each returnable order line `{id}` contributes `item_{id}` (checkbox),
//! `quantity_{id}`, `reason_{id}` and, for exchanges, `exchange_{id}` (the
//! replacement variant).

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
use vernont_core::{ReturnKind, VariantId};

use crate::api::{NewReturn, NewReturnItem, Order, ReturnReason, ReturnRequest};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::forms::{self, FieldErrors};
use crate::layout::Layout;
use crate::middleware::RequireCustomer;
use crate::state::AppState;

use super::account::{OrderView, customer_order};

const MAX_NOTE_LENGTH: usize = 500;

// =============================================================================
// Validation
// =============================================================================

/// Raw return form, keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct ReturnSubmission {
    fields: HashMap<String, String>,
}

impl ReturnSubmission {
    #[must_use]
    pub const fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    fn field(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", |v| v.trim())
    }

    fn item_field(&self, name: &str, item_id: &str) -> &str {
        self.field(&format!("{name}_{item_id}"))
    }

    /// Whether the line was ticked.
    #[must_use]
    pub fn is_selected(&self, item_id: &str) -> bool {
        !self.item_field("item", item_id).is_empty()
    }

    /// Requested kind; defaults to a plain return.
    #[must_use]
    pub fn kind(&self) -> Option<ReturnKind> {
        match self.field("kind") {
            "" => Some(ReturnKind::Return),
            value => ReturnKind::from_form(value),
        }
    }

    /// Validate against the order's returnable quantities and the backend's
    /// reasons.
    ///
    /// # Errors
    ///
    /// Returns every field that failed validation. `items` is set when no
    /// line was selected.
    pub fn validate(
        &self,
        order: &Order,
        reasons: &[ReturnReason],
    ) -> std::result::Result<NewReturn, FieldErrors> {
        let mut errors = FieldErrors::new();
        let kind = self.kind().unwrap_or_else(|| {
            errors.add("kind", "Choose a return or an exchange");
            ReturnKind::Return
        });

        let mut items = Vec::new();
        for line in &order.items {
            let id = line.id.as_str();
            let returnable = line.returnable_quantity();
            if returnable == 0 || !self.is_selected(id) {
                continue;
            }

            let quantity = match self.item_field("quantity", id).parse::<u32>() {
                Ok(quantity) if (1..=returnable).contains(&quantity) => quantity,
                _ => {
                    errors.add(
                        format!("quantity_{id}"),
                        format!("Choose a quantity from 1 to {returnable}"),
                    );
                    0
                }
            };

            let reason_id = self.item_field("reason", id);
            if !reasons.iter().any(|r| r.id == reason_id) {
                errors.add(format!("reason_{id}"), "Choose a reason");
            }

            let exchange_variant_id = match kind {
                ReturnKind::Exchange => {
                    let variant = self.item_field("exchange", id);
                    if variant.is_empty() {
                        errors.add(format!("exchange_{id}"), "Choose a replacement");
                    }
                    Some(VariantId::new(variant))
                }
                ReturnKind::Return => None,
            };

            items.push(NewReturnItem {
                item_id: line.id.clone(),
                quantity,
                reason_id: reason_id.to_string(),
                exchange_variant_id,
            });
        }

        if items.is_empty() {
            errors.add("items", "Select at least one item");
        }
        let note = forms::optional(
            &mut errors,
            "note",
            "Note",
            self.field("note"),
            MAX_NOTE_LENGTH,
        );

        errors.into_result(NewReturn {
            order_id: order.id.clone(),
            kind,
            items,
            note,
        })
    }
}

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Clone)]
pub struct ChoiceView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// One returnable order line in the request form.
#[derive(Debug, Clone)]
pub struct ReturnLineForm {
    pub id: String,
    pub title: String,
    pub variant_title: Option<String>,
    pub returnable: u32,
    pub selected: bool,
    pub quantities: Vec<ChoiceView>,
    pub reasons: Vec<ChoiceView>,
    /// Replacement sizes; empty when the product could not be loaded.
    pub exchange_options: Vec<ChoiceView>,
    pub quantity_error: Option<String>,
    pub reason_error: Option<String>,
    pub exchange_error: Option<String>,
}

fn choices(options: impl IntoIterator<Item = (String, String)>, current: &str) -> Vec<ChoiceView> {
    options
        .into_iter()
        .map(|(value, label)| ChoiceView {
            selected: value == current,
            value,
            label,
        })
        .collect()
}

/// Form state for an order's return request.
#[derive(Debug, Clone)]
pub struct ReturnFormView {
    pub exchange: bool,
    pub note: String,
    pub lines: Vec<ReturnLineForm>,
    pub errors: FieldErrors,
}

impl ReturnFormView {
    #[must_use]
    pub fn new(
        order: &Order,
        reasons: &[ReturnReason],
        exchange_options: &HashMap<String, Vec<(String, String)>>,
        submission: &ReturnSubmission,
        errors: FieldErrors,
    ) -> Self {
        let lines = order
            .items
            .iter()
            .filter(|item| item.returnable_quantity() > 0)
            .map(|item| {
                let id = item.id.as_str();
                let returnable = item.returnable_quantity();
                let quantity = match submission.item_field("quantity", id) {
                    "" => "1",
                    value => value,
                };
                let options = item
                    .product_handle
                    .as_ref()
                    .and_then(|h| exchange_options.get(h))
                    .cloned()
                    .unwrap_or_default();
                ReturnLineForm {
                    id: id.to_string(),
                    title: item.title.clone(),
                    variant_title: item.variant_title.clone(),
                    returnable,
                    selected: submission.is_selected(id),
                    quantities: choices(
                        (1..=returnable).map(|n| (n.to_string(), n.to_string())),
                        quantity,
                    ),
                    reasons: choices(
                        reasons.iter().map(|r| (r.id.clone(), r.label.clone())),
                        submission.item_field("reason", id),
                    ),
                    exchange_options: choices(options, submission.item_field("exchange", id)),
                    quantity_error: errors.get(&format!("quantity_{id}")).map(String::from),
                    reason_error: errors.get(&format!("reason_{id}")).map(String::from),
                    exchange_error: errors.get(&format!("exchange_{id}")).map(String::from),
                }
            })
            .collect();

        Self {
            exchange: submission.kind() == Some(ReturnKind::Exchange),
            note: submission.field("note").to_string(),
            lines,
            errors,
        }
    }
}

/// A submitted request in the returns list.
#[derive(Debug, Clone)]
pub struct ReturnView {
    pub id: String,
    pub order_id: String,
    pub order_label: String,
    pub kind: &'static str,
    pub status: &'static str,
    pub open: bool,
    pub date: String,
    pub items: Vec<String>,
    pub refund: Option<String>,
}

impl ReturnView {
    #[must_use]
    pub fn new(request: &ReturnRequest) -> Self {
        Self {
            id: request.id.to_string(),
            order_id: request.order_id.to_string(),
            order_label: request
                .order_display_id
                .map_or_else(|| request.order_id.to_string(), |id| format!("#{id}")),
            kind: request.kind.label(),
            status: request.status.label(),
            open: request.status.is_open(),
            date: request.created_at.format("%B %-d, %Y").to_string(),
            items: request
                .items
                .iter()
                .map(|line| format!("{} × {}", line.title, line.quantity))
                .collect(),
            refund: request.refund_amount.map(|m| m.to_string()),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "returns/index.html")]
pub struct ReturnsTemplate {
    pub layout: Layout,
    pub returns: Vec<ReturnView>,
    pub submitted: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "returns/new.html")]
pub struct ReturnFormTemplate {
    pub layout: Layout,
    pub order: OrderView,
    pub form: ReturnFormView,
    pub return_window_days: u32,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReturnsQuery {
    pub submitted: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Replacement variants per product handle, loaded best effort.
async fn exchange_options(
    state: &AppState,
    order: &Order,
) -> HashMap<String, Vec<(String, String)>> {
    let mut options = HashMap::new();
    for handle in order.items.iter().filter_map(|i| i.product_handle.as_ref()) {
        if options.contains_key(handle) {
            continue;
        }
        match state
            .commerce()
            .product_by_handle(handle, order.currency)
            .await
        {
            Ok(product) => {
                let variants = product
                    .variants
                    .iter()
                    .filter(|v| v.in_stock())
                    .map(|v| (v.id.to_string(), v.title.clone()))
                    .collect();
                options.insert(handle.clone(), variants);
            }
            Err(e) => {
                tracing::warn!(handle = %handle, error = %e, "Exchange options unavailable");
            }
        }
    }
    options
}

/// The customer's returns and exchanges.
#[instrument(skip_all, fields(customer_id = %customer.id))]
pub async fn index(
    State(state): State<AppState>,
    layout: Layout,
    RequireCustomer(customer): RequireCustomer,
    Query(query): Query<ReturnsQuery>,
) -> Result<impl IntoResponse> {
    let returns = state.commerce().customer_returns(&customer.token).await?;
    Ok(ReturnsTemplate {
        layout,
        returns: returns.iter().map(ReturnView::new).collect(),
        submitted: query.submitted.is_some(),
    })
}

/// Request form for one order.
#[instrument(skip(state, layout, customer), fields(customer_id = %customer.id))]
pub async fn new_page(
    State(state): State<AppState>,
    layout: Layout,
    RequireCustomer(customer): RequireCustomer,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse> {
    let order = customer_order(&state, &customer, &order_id).await?;
    let reasons = state.commerce().return_reasons().await?;
    let options = exchange_options(&state, &order).await;
    let settings = state.settings().await;

    Ok(ReturnFormTemplate {
        layout,
        form: ReturnFormView::new(
            &order,
            &reasons,
            &options,
            &ReturnSubmission::default(),
            FieldErrors::new(),
        ),
        order: OrderView::new(&order),
        return_window_days: settings.return_window_days,
        message: None,
    })
}

/// Submit a return or exchange request.
#[instrument(skip(state, layout, customer, fields), fields(customer_id = %customer.id))]
pub async fn create(
    State(state): State<AppState>,
    layout: Layout,
    RequireCustomer(customer): RequireCustomer,
    Path(order_id): Path<String>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response> {
    let order = customer_order(&state, &customer, &order_id).await?;
    let reasons = state.commerce().return_reasons().await?;
    let submission = ReturnSubmission::new(fields);

    let (errors, message) = match submission.validate(&order, &reasons) {
        Ok(request) => match state.commerce().create_return(&customer.token, &request).await {
            Ok(created) => {
                add_breadcrumb(
                    "returns",
                    "Return requested",
                    Some(&[("return_id", created.id.as_str())]),
                );
                return Ok(Redirect::to("/account/returns?submitted=1").into_response());
            }
            Err(e) if e.is_rejection() => (
                FieldErrors::new(),
                Some(
                    e.user_message()
                        .unwrap_or("This order is not eligible for a return")
                        .to_string(),
                ),
            ),
            Err(e) => return Err(e.into()),
        },
        Err(errors) => (errors, None),
    };

    let options = exchange_options(&state, &order).await;
    let settings = state.settings().await;
    Ok((
        StatusCode::UNPROCESSABLE_ENTITY,
        ReturnFormTemplate {
            layout,
            form: ReturnFormView::new(&order, &reasons, &options, &submission, errors),
            order: OrderView::new(&order),
            return_window_days: settings.return_window_days,
            message,
        },
    )
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::Router;
    use axum::routing::{get, post};
    use serde_json::{Value, json};

    use super::*;
    use crate::api::conversions::convert_order;
    use crate::routes::account::tests::{account_backend, signed_in};
    use crate::test_support::{body_text, location, order_json};

    fn order() -> Order {
        let mut json = order_json("order_1", 1001);
        json["items"][0]["returned_quantity"] = 1.into();
        convert_order(serde_json::from_value(json).unwrap()).unwrap()
    }

    fn reasons() -> Vec<ReturnReason> {
        vec![ReturnReason {
            id: "rr_scent".to_string(),
            label: "Not the scent I expected".to_string(),
        }]
    }

    fn submission(pairs: &[(&str, &str)]) -> ReturnSubmission {
        ReturnSubmission::new(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_valid_return() {
        let request = submission(&[
            ("item_item_1", "on"),
            ("quantity_item_1", "1"),
            ("reason_item_1", "rr_scent"),
        ])
        .validate(&order(), &reasons())
        .unwrap();

        assert_eq!(request.kind, ReturnKind::Return);
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].quantity, 1);
        assert!(request.items[0].exchange_variant_id.is_none());
        assert!(request.note.is_none());
    }

    #[test]
    fn test_nothing_selected() {
        let errors = submission(&[("quantity_item_1", "1")])
            .validate(&order(), &reasons())
            .unwrap_err();
        assert_eq!(errors.get("items"), Some("Select at least one item"));
    }

    #[test]
    fn test_quantity_limited_to_returnable_units() {
        // Two ordered, one already returned.
        let errors = submission(&[
            ("item_item_1", "on"),
            ("quantity_item_1", "2"),
            ("reason_item_1", "rr_other"),
        ])
        .validate(&order(), &reasons())
        .unwrap_err();
        assert_eq!(
            errors.get("quantity_item_1"),
            Some("Choose a quantity from 1 to 1")
        );
        assert_eq!(errors.get("reason_item_1"), Some("Choose a reason"));
    }

    #[test]
    fn test_exchange_needs_replacement() {
        let base = [
            ("kind", "exchange"),
            ("item_item_1", "on"),
            ("quantity_item_1", "1"),
            ("reason_item_1", "rr_scent"),
        ];
        let errors = submission(&base).validate(&order(), &reasons()).unwrap_err();
        assert_eq!(errors.get("exchange_item_1"), Some("Choose a replacement"));

        let mut pairs = base.to_vec();
        pairs.push(("exchange_item_1", "variant_100"));
        let request = submission(&pairs).validate(&order(), &reasons()).unwrap();
        assert_eq!(request.kind, ReturnKind::Exchange);
        assert_eq!(
            request.items[0].exchange_variant_id,
            Some(VariantId::new("variant_100"))
        );

        let errors = submission(&[("kind", "refund")])
            .validate(&order(), &reasons())
            .unwrap_err();
        assert!(errors.has("kind"));
    }

    fn returns_backend() -> Router {
        account_backend()
            .route(
                "/store/return-reasons",
                get(|| async {
                    axum::Json(json!({ "return_reasons": [
                        { "id": "rr_scent", "label": "Not the scent I expected" }
                    ]}))
                }),
            )
            .route(
                "/store/returns",
                post(|axum::Json(body): axum::Json<Value>| async move {
                    assert_eq!(body["items"][0]["quantity"], 2);
                    axum::Json(json!({ "return": {
                        "id": "ret_1", "order_id": "order_1", "kind": "return",
                        "status": "requested", "created_at": "2026-05-20T09:00:00Z",
                        "items": [{ "item_id": "item_1", "title": "Santal Noir", "quantity": 2 }]
                    }}))
                }),
            )
            .route(
                "/store/customers/me/returns",
                get(|| async {
                    axum::Json(json!({ "returns": [{
                        "id": "ret_1", "order_id": "order_1", "order_display_id": 1001,
                        "kind": "exchange", "status": "approved",
                        "created_at": "2026-05-20T09:00:00Z",
                        "items": [{ "item_id": "item_1", "title": "Santal Noir", "quantity": 1 }]
                    }]}))
                }),
            )
    }

    #[tokio::test]
    async fn test_request_form_lists_returnable_items() {
        let mut app = signed_in(returns_backend()).await;
        let body = body_text(app.get("/account/orders/order_1/return").await).await;
        assert!(body.contains("name=\"item_item_1\""));
        assert!(body.contains("Not the scent I expected"));
        assert!(body.contains("100 ml"));
        assert!(body.contains("30 days"));
    }

    #[tokio::test]
    async fn test_submit_return() {
        let mut app = signed_in(returns_backend()).await;
        let response = app
            .post_form(
                "/account/orders/order_1/return",
                &[
                    ("kind", "return"),
                    ("item_item_1", "on"),
                    ("quantity_item_1", "2"),
                    ("reason_item_1", "rr_scent"),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/account/returns?submitted=1");

        let body = body_text(app.get("/account/returns?submitted=1").await).await;
        assert!(body.contains("#1001"));
        assert!(body.contains("Approved"));
        assert!(body.contains("Santal Noir × 1"));
    }

    #[tokio::test]
    async fn test_invalid_request_is_shown_inline() {
        let mut app = signed_in(returns_backend()).await;
        let response = app
            .post_form("/account/orders/order_1/return", &[("kind", "return")])
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("Select at least one item"));
    }
}

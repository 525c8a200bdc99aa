//! Checkout wizard handlers.
//!
//! Every POST follows redirect-after-post back to `GET /checkout`, which
//! renders whatever step the backend cart allows. Validation failures and
//! backend rejections re-render the step inline with a 422.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use vernont_core::OrderId;

use crate::api::{ApiError, Cart, CartCompletion};
use crate::checkout::{
    self, BILLING_PREFIX, CheckoutProgress, CheckoutState, CheckoutStep, InformationInput,
};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::forms::{AddressFields, FieldErrors};
use crate::layout::Layout;
use crate::middleware::OptionalCustomer;
use crate::models::session;
use crate::state::AppState;

use super::account::OrderView;
use super::cart::{CartView, load_cart};
use super::is_htmx;

/// Path the hosted payment page returns to.
pub const PAYMENT_RETURN_PATH: &str = "/checkout/complete";

// =============================================================================
// Views
// =============================================================================

/// Progress indicator entry.
#[derive(Debug, Clone)]
pub struct StepLink {
    pub value: &'static str,
    pub label: &'static str,
    pub number: u8,
    pub current: bool,
    pub reachable: bool,
}

#[derive(Debug, Clone)]
pub struct InformationForm {
    pub email: String,
    pub billing_same: bool,
    pub shipping: AddressFields,
    pub billing: AddressFields,
    pub errors: FieldErrors,
}

impl InformationForm {
    fn new(input: InformationInput, errors: FieldErrors) -> Self {
        Self {
            email: input.email,
            billing_same: input.billing_same,
            shipping: AddressFields::new("", input.shipping, &errors),
            billing: AddressFields::new(BILLING_PREFIX, input.billing, &errors),
            errors,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShippingOptionView {
    pub id: String,
    pub name: String,
    pub amount: String,
    pub estimated_delivery: Option<String>,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct ProviderView {
    pub id: String,
    pub label: String,
    pub selected: bool,
}

/// Human label for a payment provider id.
fn provider_label(provider_id: &str) -> String {
    match provider_id {
        "stripe" | "pp_stripe_stripe" => "Credit or debit card".to_string(),
        "paypal" | "pp_paypal_paypal" => "PayPal".to_string(),
        "manual" | "pp_system_default" => "Pay on invoice".to_string(),
        other => other.replace('_', " "),
    }
}

#[derive(Debug, Clone)]
pub struct ShippingStepForm {
    pub options: Vec<ShippingOptionView>,
    pub errors: FieldErrors,
}

#[derive(Debug, Clone)]
pub struct PaymentStepForm {
    pub providers: Vec<ProviderView>,
    pub errors: FieldErrors,
}

/// What the visitor needs to see on the current step.
#[derive(Debug, Clone)]
pub enum StepForm {
    Information(InformationForm),
    Shipping(ShippingStepForm),
    Payment(PaymentStepForm),
}

/// Inline feedback from the last submission.
#[derive(Debug, Default)]
struct Feedback {
    /// Errors of the step form.
    errors: FieldErrors,
    /// Errors of the promo code and gift card forms in the summary.
    code_errors: FieldErrors,
    message: Option<String>,
    information: Option<InformationInput>,
}

impl Feedback {
    fn errors(errors: FieldErrors) -> Self {
        Self {
            errors,
            ..Self::default()
        }
    }

    fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    fn code_errors(code_errors: FieldErrors) -> Self {
        Self {
            code_errors,
            ..Self::default()
        }
    }

    fn is_failure(&self) -> bool {
        !self.errors.is_empty() || !self.code_errors.is_empty() || self.message.is_some()
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Checkout wizard page.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub steps: Vec<StepLink>,
    pub form: StepForm,
    pub summary: CartView,
    pub contact: Option<String>,
    pub ship_to: Vec<String>,
    pub shipping_method: Option<String>,
    pub code_errors: FieldErrors,
    pub message: Option<String>,
}

/// Order confirmation page.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmed.html")]
pub struct ConfirmedTemplate {
    pub layout: Layout,
    pub order: OrderView,
}

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub step: String,
}

#[derive(Debug, Deserialize)]
pub struct ShippingForm {
    #[serde(default)]
    pub shipping_option: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeForm {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub provider_id: Option<String>,
}

// =============================================================================
// Rendering
// =============================================================================

/// The open, non-empty cart, or a redirect to the cart page.
async fn checkout_cart(
    state: &AppState,
    session: &Session,
) -> Result<std::result::Result<Cart, Response>> {
    match load_cart(state, session).await? {
        Some(cart) if !cart.is_empty() => Ok(Ok(cart)),
        _ => Ok(Err(Redirect::to("/cart").into_response())),
    }
}

/// Resolve and persist the wizard position for `cart`.
async fn current_state(session: &Session, cart: &Cart) -> Result<CheckoutState> {
    let state = CheckoutState::resolve(session::checkout_state(session).await, cart);
    session::set_checkout_state(session, &state).await?;
    Ok(state)
}

async fn render(
    state: &AppState,
    layout: Layout,
    customer_email: Option<&str>,
    cart: &Cart,
    step: CheckoutStep,
    feedback: Feedback,
) -> Result<Response> {
    let progress = CheckoutProgress::from_cart(cart);
    let status = if feedback.is_failure() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };

    let form = match step {
        CheckoutStep::Information => {
            let input = feedback
                .information
                .unwrap_or_else(|| InformationInput::from_cart(cart, customer_email));
            StepForm::Information(InformationForm::new(input, feedback.errors))
        }
        CheckoutStep::Shipping => {
            let selected = cart.shipping_methods.first().map(|m| &m.shipping_option_id);
            let options = state
                .commerce()
                .shipping_options(&cart.id, cart.currency)
                .await?
                .into_iter()
                .map(|option| ShippingOptionView {
                    selected: selected == Some(&option.id),
                    id: option.id.to_string(),
                    name: option.name,
                    amount: if option.amount.is_zero() {
                        "Free".to_string()
                    } else {
                        option.amount.to_string()
                    },
                    estimated_delivery: option.estimated_delivery,
                })
                .collect();
            StepForm::Shipping(ShippingStepForm {
                options,
                errors: feedback.errors,
            })
        }
        CheckoutStep::Payment => {
            let current = cart.payment_session.as_ref().map(|p| p.provider_id.as_str());
            let only_one = cart.payment_providers.len() == 1;
            let providers = cart
                .payment_providers
                .iter()
                .map(|id| ProviderView {
                    label: provider_label(id),
                    selected: only_one || current == Some(id.as_str()),
                    id: id.clone(),
                })
                .collect();
            StepForm::Payment(PaymentStepForm {
                providers,
                errors: feedback.errors,
            })
        }
    };

    let steps = CheckoutStep::ALL
        .into_iter()
        .map(|s| StepLink {
            value: s.as_str(),
            label: s.label(),
            number: s.number(),
            current: s == step,
            reachable: progress.allows(s),
        })
        .collect();

    let threshold = state.settings().await.free_shipping_threshold(cart.currency);
    let template = CheckoutTemplate {
        layout,
        steps,
        form,
        summary: CartView::new(cart, threshold),
        contact: cart.email.clone(),
        ship_to: cart
            .shipping_address
            .as_ref()
            .map(crate::api::Address::lines)
            .unwrap_or_default(),
        shipping_method: cart.shipping_methods.first().map(|m| {
            if m.amount.is_zero() {
                format!("{} (Free)", m.name)
            } else {
                format!("{} ({})", m.name, m.amount)
            }
        }),
        code_errors: feedback.code_errors,
        message: feedback.message,
    };
    Ok((status, template).into_response())
}

/// Redirect back to the wizard after a successful mutation.
fn back_to_checkout() -> Response {
    Redirect::to("/checkout").into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Render the current step.
#[instrument(skip(state, session, layout, customer))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    OptionalCustomer(customer): OptionalCustomer,
) -> Result<Response> {
    let cart = match checkout_cart(&state, &session).await? {
        Ok(cart) => cart,
        Err(redirect) => return Ok(redirect),
    };
    let wizard = current_state(&session, &cart).await?;
    let email = customer.as_ref().map(|c| c.email.as_str());
    render(&state, layout, email, &cart, wizard.step, Feedback::default()).await
}

/// Navigate between steps. Moving past an incomplete step is refused.
#[instrument(skip(state, session))]
pub async fn step(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<StepRequest>,
) -> Result<Response> {
    let cart = match checkout_cart(&state, &session).await? {
        Ok(cart) => cart,
        Err(redirect) => return Ok(redirect),
    };
    let Some(requested) = CheckoutStep::parse(form.step.trim()) else {
        return Err(AppError::BadRequest("Unknown checkout step".to_string()));
    };

    let mut wizard = current_state(&session, &cart).await?;
    match wizard.go_to(requested, CheckoutProgress::from_cart(&cart)) {
        Ok(()) => session::set_checkout_state(&session, &wizard).await?,
        Err(e) => tracing::debug!(error = %e, "Checkout step refused"),
    }
    Ok(back_to_checkout())
}

/// Submit contact details and addresses.
#[instrument(skip(state, session, layout, customer, fields))]
pub async fn information(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    OptionalCustomer(customer): OptionalCustomer,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response> {
    let cart = match checkout_cart(&state, &session).await? {
        Ok(cart) => cart,
        Err(redirect) => return Ok(redirect),
    };
    let email = customer.as_ref().map(|c| c.email.as_str());
    let input = InformationInput::from_fields(&fields);

    let update = match input.validate() {
        Ok(update) => update,
        Err(errors) => {
            let feedback = Feedback {
                errors,
                information: Some(input),
                ..Feedback::default()
            };
            return render(&state, layout, email, &cart, CheckoutStep::Information, feedback)
                .await;
        }
    };

    let cart = match state.commerce().update_cart(&cart.id, &update).await {
        Ok(cart) => cart,
        Err(e) if e.is_rejection() => {
            let feedback = Feedback {
                message: Some(
                    e.user_message()
                        .unwrap_or("We could not save these details")
                        .to_string(),
                ),
                information: Some(input),
                ..Feedback::default()
            };
            return render(&state, layout, email, &cart, CheckoutStep::Information, feedback)
                .await;
        }
        Err(e) => return Err(e.into()),
    };

    let mut wizard = current_state(&session, &cart).await?;
    if wizard
        .go_to(CheckoutStep::Shipping, CheckoutProgress::from_cart(&cart))
        .is_ok()
    {
        session::set_checkout_state(&session, &wizard).await?;
    }
    add_breadcrumb("checkout", "Information saved", None);
    Ok(back_to_checkout())
}

/// Select a shipping option.
#[instrument(skip(state, session, layout, customer))]
pub async fn shipping(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    OptionalCustomer(customer): OptionalCustomer,
    Form(form): Form<ShippingForm>,
) -> Result<Response> {
    let cart = match checkout_cart(&state, &session).await? {
        Ok(cart) => cart,
        Err(redirect) => return Ok(redirect),
    };
    if !CheckoutProgress::from_cart(&cart).allows(CheckoutStep::Shipping) {
        return Ok(back_to_checkout());
    }
    let email = customer.as_ref().map(|c| c.email.as_str());

    let options = state
        .commerce()
        .shipping_options(&cart.id, cart.currency)
        .await?;
    let option_id = match checkout::choose_shipping_option(&options, &form.shipping_option) {
        Ok(id) => id,
        Err(errors) => {
            return render(&state, layout, email, &cart, CheckoutStep::Shipping, Feedback::errors(errors))
                .await;
        }
    };

    let cart = match state.commerce().add_shipping_method(&cart.id, &option_id).await {
        Ok(cart) => cart,
        Err(e) if e.is_rejection() => {
            let message = e
                .user_message()
                .unwrap_or("This shipping method is not available")
                .to_string();
            return render(&state, layout, email, &cart, CheckoutStep::Shipping, Feedback::message(message))
                .await;
        }
        Err(e) => return Err(e.into()),
    };

    let mut wizard = current_state(&session, &cart).await?;
    if wizard
        .go_to(CheckoutStep::Payment, CheckoutProgress::from_cart(&cart))
        .is_ok()
    {
        session::set_checkout_state(&session, &wizard).await?;
    }
    Ok(back_to_checkout())
}

/// Which cart adjustment a code form targets.
#[derive(Debug, Clone, Copy)]
enum CodeAction {
    ApplyDiscount,
    RemoveDiscount,
    ApplyGiftCard,
    RemoveGiftCard,
}

impl CodeAction {
    const fn field(self) -> (&'static str, &'static str) {
        match self {
            Self::ApplyDiscount | Self::RemoveDiscount => ("code", "Promo code"),
            Self::ApplyGiftCard | Self::RemoveGiftCard => ("gift_card", "Gift card code"),
        }
    }
}

async fn adjust(
    state: &AppState,
    session: &Session,
    layout: Layout,
    customer_email: Option<&str>,
    action: CodeAction,
    code: &str,
) -> Result<Response> {
    let cart = match checkout_cart(state, session).await? {
        Ok(cart) => cart,
        Err(redirect) => return Ok(redirect),
    };
    let step = CheckoutState::resolve(session::checkout_state(session).await, &cart).step;
    let (field, label) = action.field();
    let code = match checkout::normalize_code(field, label, code) {
        Ok(code) => code,
        Err(errors) => {
            return render(state, layout, customer_email, &cart, step, Feedback::code_errors(errors))
                .await;
        }
    };

    let commerce = state.commerce();
    let result = match action {
        CodeAction::ApplyDiscount => commerce.apply_discount(&cart.id, &code).await,
        CodeAction::RemoveDiscount => commerce.remove_discount(&cart.id, &code).await,
        CodeAction::ApplyGiftCard => commerce.apply_gift_card(&cart.id, &code).await,
        CodeAction::RemoveGiftCard => commerce.remove_gift_card(&cart.id, &code).await,
    };

    match result {
        Ok(_) => Ok(back_to_checkout()),
        Err(e) if e.is_rejection() => {
            let mut errors = FieldErrors::new();
            errors.add(
                field,
                e.user_message().unwrap_or("This code could not be applied"),
            );
            render(state, layout, customer_email, &cart, step, Feedback::code_errors(errors)).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Apply a promo code.
#[instrument(skip(state, session, layout, customer, form))]
pub async fn discount(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    OptionalCustomer(customer): OptionalCustomer,
    Form(form): Form<CodeForm>,
) -> Result<Response> {
    let email = customer.as_ref().map(|c| c.email.as_str());
    adjust(&state, &session, layout, email, CodeAction::ApplyDiscount, &form.code).await
}

/// Remove a promo code.
#[instrument(skip(state, session, layout, customer, form))]
pub async fn remove_discount(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    OptionalCustomer(customer): OptionalCustomer,
    Form(form): Form<CodeForm>,
) -> Result<Response> {
    let email = customer.as_ref().map(|c| c.email.as_str());
    adjust(&state, &session, layout, email, CodeAction::RemoveDiscount, &form.code).await
}

/// Apply a gift card.
#[instrument(skip(state, session, layout, customer, form))]
pub async fn gift_card(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    OptionalCustomer(customer): OptionalCustomer,
    Form(form): Form<CodeForm>,
) -> Result<Response> {
    let email = customer.as_ref().map(|c| c.email.as_str());
    adjust(&state, &session, layout, email, CodeAction::ApplyGiftCard, &form.code).await
}

/// Remove a gift card.
#[instrument(skip(state, session, layout, customer, form))]
pub async fn remove_gift_card(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    OptionalCustomer(customer): OptionalCustomer,
    Form(form): Form<CodeForm>,
) -> Result<Response> {
    let email = customer.as_ref().map(|c| c.email.as_str());
    adjust(&state, &session, layout, email, CodeAction::RemoveGiftCard, &form.code).await
}

/// Place the order.
///
/// Opens a payment session with the chosen provider. A hosted payment page
/// (`redirect_url`) takes the customer away and back to
/// [`PAYMENT_RETURN_PATH`]; otherwise the cart is completed right away.
#[instrument(skip(state, session, layout, customer, headers))]
pub async fn payment(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    OptionalCustomer(customer): OptionalCustomer,
    headers: HeaderMap,
    Form(form): Form<PaymentForm>,
) -> Result<Response> {
    let cart = match checkout_cart(&state, &session).await? {
        Ok(cart) => cart,
        Err(redirect) => return Ok(redirect),
    };
    if !CheckoutProgress::from_cart(&cart).allows(CheckoutStep::Payment) {
        return Ok(back_to_checkout());
    }
    let email = customer.as_ref().map(|c| c.email.as_str());

    let provider_id = match checkout::choose_payment_provider(&cart, form.provider_id.as_deref()) {
        Ok(provider) => provider,
        Err(errors) => {
            return render(&state, layout, email, &cart, CheckoutStep::Payment, Feedback::errors(errors))
                .await;
        }
    };

    let return_url = state
        .config()
        .base_url
        .join(PAYMENT_RETURN_PATH)
        .map_err(|e| AppError::Internal(format!("Invalid payment return URL: {e}")))?;

    let cart = match state
        .commerce()
        .create_payment_session(&cart.id, &provider_id, return_url.as_str())
        .await
    {
        Ok(cart) => cart,
        Err(e) if e.is_rejection() => {
            let message = e
                .user_message()
                .unwrap_or("This payment method is unavailable, please try again")
                .to_string();
            return render(&state, layout, email, &cart, CheckoutStep::Payment, Feedback::message(message))
                .await;
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(url) = cart
        .payment_session
        .as_ref()
        .and_then(|p| p.redirect_url.as_deref())
    {
        tracing::info!(cart_id = %cart.id, provider_id, "Sending customer to hosted payment page");
        return Ok(external_redirect(&headers, url));
    }

    finish(&state, &session, layout, email, &cart).await
}

/// Return from a hosted payment page.
#[instrument(skip(state, session, layout, customer))]
pub async fn complete(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    OptionalCustomer(customer): OptionalCustomer,
) -> Result<Response> {
    let cart = match checkout_cart(&state, &session).await? {
        Ok(cart) => cart,
        Err(redirect) => {
            // The cart was already completed, e.g. on a reload.
            if let Some(order_id) = session::last_order_id(&session).await {
                return Ok(Redirect::to(&format!("/order/confirmed/{order_id}")).into_response());
            }
            return Ok(redirect);
        }
    };
    if !CheckoutProgress::from_cart(&cart).allows(CheckoutStep::Payment) {
        return Ok(back_to_checkout());
    }
    let email = customer.as_ref().map(|c| c.email.as_str());
    finish(&state, &session, layout, email, &cart).await
}

/// Complete the cart: an order goes to the confirmation page, a failed
/// payment is shown inline on the payment step.
async fn finish(
    state: &AppState,
    session: &Session,
    layout: Layout,
    customer_email: Option<&str>,
    cart: &Cart,
) -> Result<Response> {
    match state.commerce().complete_cart(&cart.id).await? {
        CartCompletion::Order(order) => {
            session::clear_cart(session).await?;
            session::set_last_order_id(session, &order.id).await?;
            add_breadcrumb(
                "checkout",
                "Order placed",
                Some(&[("order_id", order.id.as_str())]),
            );
            Ok(Redirect::to(&format!("/order/confirmed/{}", order.id)).into_response())
        }
        CartCompletion::Cart { cart, message } => {
            tracing::warn!(cart_id = %cart.id, message, "Cart completion failed");
            render(
                state,
                layout,
                customer_email,
                &cart,
                CheckoutStep::Payment,
                Feedback::message(message),
            )
            .await
        }
    }
}

/// Send the browser to an external URL. HTMX requests need `HX-Redirect`
/// since a 303 would be followed inside the XHR.
fn external_redirect(headers: &HeaderMap, url: &str) -> Response {
    if is_htmx(headers) {
        (StatusCode::OK, [("HX-Redirect", url.to_string())]).into_response()
    } else {
        Redirect::to(url).into_response()
    }
}

/// Order confirmation.
///
/// Visible to the session that placed the order, or to the signed-in
/// customer who owns it.
#[instrument(skip(state, session, layout, customer))]
pub async fn confirmed(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    OptionalCustomer(customer): OptionalCustomer,
    Path(order_id): Path<String>,
) -> Result<Response> {
    let order_id = OrderId::new(order_id);
    let placed_here = session::last_order_id(&session).await.as_ref() == Some(&order_id);
    let token = customer.as_ref().map(|c| c.token.as_str());
    if !placed_here && token.is_none() {
        return Err(AppError::NotFound(format!("order {order_id}")));
    }

    let order = match state.commerce().order(&order_id, token).await {
        Ok(order) => order,
        Err(ApiError::NotFound(_)) => return Err(AppError::NotFound(format!("order {order_id}"))),
        Err(e) => return Err(e.into()),
    };

    Ok(ConfirmedTemplate {
        layout,
        order: OrderView::new(&order),
    }
    .into_response())
}

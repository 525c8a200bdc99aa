//! Authentication route handlers.
//!
//! Handles login, registration, password reset and logout against the
//! commerce backend. The customer's bearer token is kept in the session;
//! the session id is cycled whenever a customer signs in.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{ApiError, AuthSession, Registration};
use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::forms::{self, FieldErrors};
use crate::layout::Layout;
use crate::models::{CurrentCustomer, session};
use crate::state::AppState;

use super::safe_return_path;

const MAX_NAME_LENGTH: usize = 80;

/// Where a customer lands after signing in without a `next`.
const DEFAULT_AFTER_LOGIN: &str = "/account";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
    pub next: Option<String>,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default)]
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters of the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
    pub reset: Option<String>,
    pub next: Option<String>,
}

/// Parameters of the emailed reset link.
#[derive(Debug, Default, Deserialize)]
pub struct ResetQuery {
    pub token: Option<String>,
    pub email: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub email: String,
    pub next: Option<String>,
    pub errors: FieldErrors,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub next: Option<String>,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub layout: Layout,
    pub email: String,
    pub errors: FieldErrors,
    pub sent: bool,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub layout: Layout,
    pub token: String,
    pub email: String,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

fn unprocessable(template: impl IntoResponse) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
}

// =============================================================================
// Sign-in
// =============================================================================

/// Store the customer in a fresh session and attach the visitor's cart.
async fn sign_in(state: &AppState, session: &Session, auth: AuthSession) -> Result<()> {
    session.cycle_id().await?;
    let customer = CurrentCustomer::from_auth(auth);
    session::set_current_customer(session, &customer).await?;

    if let Some(cart_id) = session::cart_id(session).await
        && let Err(e) = state
            .commerce()
            .transfer_cart(&cart_id, &customer.token)
            .await
    {
        tracing::warn!(cart_id = %cart_id, error = %e, "Could not attach cart to customer");
    }

    set_sentry_user(&customer.id, Some(&customer.email));
    add_breadcrumb("auth", "Customer signed in", None);
    tracing::info!(customer_id = %customer.id, "Customer signed in");
    Ok(())
}

fn after_login(next: Option<&str>) -> Redirect {
    Redirect::to(&safe_return_path(next).unwrap_or_else(|| DEFAULT_AFTER_LOGIN.to_string()))
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(layout: Layout, Query(query): Query<LoginQuery>) -> impl IntoResponse {
    let error = match query.error.as_deref() {
        Some("session_expired") => Some("Your session has expired. Please sign in again."),
        Some(_) => Some("Please sign in to continue."),
        None => None,
    };
    LoginTemplate {
        layout,
        email: String::new(),
        next: safe_return_path(query.next.as_deref()),
        errors: FieldErrors::new(),
        error: error.map(String::from),
        success: query
            .reset
            .is_some()
            .then(|| "Your password has been reset. You can now sign in.".to_string()),
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, layout, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let mut errors = FieldErrors::new();
    forms::email(&mut errors, "email", &form.email);
    if form.password.is_empty() {
        errors.add("password", "Password is required");
    }

    let page = |errors: FieldErrors, error: Option<String>| LoginTemplate {
        layout: layout.clone(),
        email: form.email.trim().to_string(),
        next: safe_return_path(form.next.as_deref()),
        errors,
        error,
        success: None,
    };

    if !errors.is_empty() {
        return Ok(unprocessable(page(errors, None)));
    }

    match state.commerce().login(form.email.trim(), &form.password).await {
        Ok(auth) => {
            sign_in(&state, &session, auth).await?;
            Ok(after_login(form.next.as_deref()).into_response())
        }
        Err(ApiError::Unauthorized) => {
            tracing::info!("Login rejected");
            Ok(unprocessable(page(
                FieldErrors::new(),
                Some("Incorrect email or password".to_string()),
            )))
        }
        Err(e) if e.is_rejection() => Ok(unprocessable(page(
            FieldErrors::new(),
            e.user_message().map(String::from),
        ))),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(layout: Layout, Query(query): Query<LoginQuery>) -> impl IntoResponse {
    RegisterTemplate {
        layout,
        first_name: String::new(),
        last_name: String::new(),
        email: String::new(),
        next: safe_return_path(query.next.as_deref()),
        errors: FieldErrors::new(),
        error: None,
    }
}

impl RegisterForm {
    /// Validate into a registration. Password problems never reach the
    /// backend.
    ///
    /// # Errors
    ///
    /// Returns every field that failed validation.
    pub fn validate(&self) -> std::result::Result<Registration, FieldErrors> {
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
        let email = forms::email(&mut errors, "email", &self.email);
        forms::new_password(&mut errors, &self.password, &self.password_confirm);

        match email {
            Some(email) if errors.is_empty() => Ok(Registration {
                email: email.into_inner(),
                password: self.password.clone(),
                first_name,
                last_name,
            }),
            _ => Err(errors),
        }
    }
}

/// Handle registration form submission. The new customer is signed in.
#[instrument(skip(state, session, layout, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let page = |errors: FieldErrors, error: Option<String>| RegisterTemplate {
        layout: layout.clone(),
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        email: form.email.trim().to_string(),
        next: safe_return_path(form.next.as_deref()),
        errors,
        error,
    };

    let registration = match form.validate() {
        Ok(registration) => registration,
        Err(errors) => return Ok(unprocessable(page(errors, None))),
    };

    match state.commerce().register(&registration).await {
        Ok(auth) => {
            sign_in(&state, &session, auth).await?;
            Ok(after_login(form.next.as_deref()).into_response())
        }
        Err(e) if e.is_rejection() => {
            let message = e
                .user_message()
                .unwrap_or("We could not create your account")
                .to_string();
            Ok(unprocessable(page(FieldErrors::new(), Some(message))))
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(layout: Layout) -> impl IntoResponse {
    ForgotPasswordTemplate {
        layout,
        email: String::new(),
        errors: FieldErrors::new(),
        sent: false,
    }
}

/// Request a reset link.
///
/// The outcome is the same whether or not the email has an account, so the
/// form cannot be used to probe for customers.
#[instrument(skip(state, layout, form))]
pub async fn forgot_password(
    State(state): State<AppState>,
    layout: Layout,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    let mut errors = FieldErrors::new();
    let Some(email) = forms::email(&mut errors, "email", &form.email) else {
        return unprocessable(ForgotPasswordTemplate {
            layout,
            email: form.email.trim().to_string(),
            errors,
            sent: false,
        });
    };

    if let Err(e) = state.commerce().request_password_reset(email.as_str()).await {
        tracing::warn!(error = %e, "Password reset request failed");
    }

    ForgotPasswordTemplate {
        layout,
        email: String::new(),
        errors,
        sent: true,
    }
    .into_response()
}

/// Display the reset form from the emailed link.
pub async fn reset_password_page(
    layout: Layout,
    Query(query): Query<ResetQuery>,
) -> impl IntoResponse {
    let token = query.token.unwrap_or_default();
    let error = token
        .trim()
        .is_empty()
        .then(|| "This reset link is invalid. Please request a new one.".to_string());
    ResetPasswordTemplate {
        layout,
        token,
        email: query.email.unwrap_or_default(),
        errors: FieldErrors::new(),
        error,
    }
}

/// Set a new password.
#[instrument(skip(state, layout, form))]
pub async fn reset_password(
    State(state): State<AppState>,
    layout: Layout,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response> {
    let mut errors = FieldErrors::new();
    let email = forms::email(&mut errors, "email", &form.email);
    forms::new_password(&mut errors, &form.password, &form.password_confirm);
    if form.token.trim().is_empty() {
        errors.add("token", "This reset link is invalid. Please request a new one.");
    }

    let page = |errors: FieldErrors, error: Option<String>| ResetPasswordTemplate {
        layout: layout.clone(),
        token: form.token.clone(),
        email: form.email.trim().to_string(),
        errors,
        error,
    };

    let Some(email) = email.filter(|_| errors.is_empty()) else {
        return Ok(unprocessable(page(errors, None)));
    };

    match state
        .commerce()
        .reset_password(form.token.trim(), email.as_str(), &form.password)
        .await
    {
        Ok(()) => {
            tracing::info!("Password reset");
            Ok(Redirect::to("/auth/login?reset=1").into_response())
        }
        Err(e) if e.is_rejection() || matches!(e, ApiError::Unauthorized) => Ok(unprocessable(page(
            FieldErrors::new(),
            Some("This reset link has expired. Please request a new one.".to_string()),
        ))),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out: revoke the token (best effort) and drop the whole session.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Response> {
    if let Some(customer) = session::current_customer(&session).await {
        if let Err(e) = state.commerce().logout(&customer.token).await {
            tracing::warn!(error = %e, "Token revocation failed");
        }
        tracing::info!(customer_id = %customer.id, "Customer signed out");
    }
    session.flush().await?;
    clear_sentry_user();
    Ok(Redirect::to("/").into_response())
}

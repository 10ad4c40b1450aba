//! Authentication route handlers.
//!
//! Login, registration and Google sign-in all follow the same shape: check
//! the form locally, call the backend only if every field passes, then either
//! store the session and go to the dashboard or re-render the auth view with
//! a message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use eduplatform_core::{
    Session,
    api::ApiError,
    view::NavEntry,
    validation::{self, ValidationReport},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::{CONNECTION_ERROR, Notice};
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalLearner, clear_current_session, set_current_session};
use crate::state::AppState;

/// Shown on the login tab after a successful registration.
pub const REGISTERED_MESSAGE: &str = "註冊成功！請登入";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Credential posted by the Google sign-in widget.
#[derive(Deserialize)]
pub struct GoogleForm {
    #[serde(default)]
    pub credential: String,
}

/// Query parameters of the login tab.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub registered: Option<String>,
    pub email: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Which tab of the auth view is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTab {
    Login,
    Register,
}

/// Auth view: login and register tabs plus the Google button.
#[derive(Template, WebTemplate)]
#[template(path = "auth.html")]
pub struct AuthTemplate {
    pub user_name: Option<String>,
    /// Always empty: the auth view shows no nav.
    pub nav: Vec<NavEntry>,
    pub register_tab: bool,
    pub login_email: String,
    pub register_name: String,
    pub register_email: String,
    pub report: ValidationReport,
    pub notice: Option<Notice>,
    pub google_client_id: Option<String>,
    /// Where the Google widget posts its credential.
    pub google_login_uri: String,
}

impl AuthTemplate {
    fn new(state: &AppState, tab: AuthTab) -> Self {
        Self {
            user_name: None,
            nav: Vec::new(),
            register_tab: tab == AuthTab::Register,
            login_email: String::new(),
            register_name: String::new(),
            register_email: String::new(),
            report: ValidationReport::default(),
            notice: None,
            google_client_id: state.config().google_client_id.clone(),
            google_login_uri: state.config().absolute_url("/auth/google"),
        }
    }

    fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }
}

/// Message for a failed backend call on the auth view.
///
/// Rejections show `prefix` plus the backend message (or `fallback`);
/// anything else shows the generic connection error.
fn failure_notice(prefix: &str, fallback: &str, err: &ApiError) -> Notice {
    match err {
        ApiError::Rejected { .. } => {
            Notice::error(format!("{prefix}{}", err.display_message(fallback)))
        }
        _ => Notice::error(CONNECTION_ERROR),
    }
}

// =============================================================================
// Login
// =============================================================================

/// Display the login tab.
pub async fn login_page(
    State(state): State<AppState>,
    OptionalLearner(session): OptionalLearner,
    Query(query): Query<LoginQuery>,
) -> Response {
    if session.is_some() {
        return Redirect::to("/dashboard").into_response();
    }

    let mut page = AuthTemplate::new(&state, AuthTab::Login);
    page.login_email = query.email.unwrap_or_default();
    if query.registered.is_some() {
        page = page.with_notice(Notice::success(REGISTERED_MESSAGE));
    }
    page.into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    store: tower_sessions::Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let password = SecretString::from(form.password);
    let email = match validation::check_login(&form.email, password.expose_secret()) {
        Ok(email) => email,
        Err(report) => {
            let mut page = AuthTemplate::new(&state, AuthTab::Login);
            page.login_email = form.email;
            page.report = report;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let outcome = state.api().login(&email, &password).await;
    finish_login(&state, &store, outcome, "登入失敗: ", "請檢查您的帳號密碼", |page| {
        page.login_email = email.into_inner();
    })
    .await
}

// =============================================================================
// Registration
// =============================================================================

/// Display the register tab.
pub async fn register_page(
    State(state): State<AppState>,
    OptionalLearner(session): OptionalLearner,
) -> Response {
    if session.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    AuthTemplate::new(&state, AuthTab::Register).into_response()
}

/// Handle registration form submission.
///
/// Registration does not sign the learner in; on success the login tab is
/// shown with the email filled in.
#[instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let password = SecretString::from(form.password);
    let registration = match validation::check_registration(
        &form.name,
        &form.email,
        password.expose_secret(),
    ) {
        Ok(registration) => registration,
        Err(report) => {
            let mut page = AuthTemplate::new(&state, AuthTab::Register);
            page.register_name = form.name;
            page.register_email = form.email;
            page.report = report;
            return (StatusCode::UNPROCESSABLE_ENTITY, page).into_response();
        }
    };

    match state
        .api()
        .register(&registration.name, &registration.email, &password)
        .await
    {
        Ok(()) => {
            tracing::info!(email = %registration.email, "Learner registered");
            let target = format!(
                "/auth/login?registered=1&email={}",
                urlencoding::encode(registration.email.as_str())
            );
            Redirect::to(&target).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            let mut page = AuthTemplate::new(&state, AuthTab::Register)
                .with_notice(failure_notice("註冊失敗: ", "請稍後再試", &e));
            page.register_name = registration.name;
            page.register_email = registration.email.into_inner();
            page.into_response()
        }
    }
}

// =============================================================================
// Google sign-in
// =============================================================================

/// Exchange the widget's credential for a session.
#[instrument(skip_all)]
pub async fn google(
    State(state): State<AppState>,
    store: tower_sessions::Session,
    Form(form): Form<GoogleForm>,
) -> Result<Response> {
    if form.credential.trim().is_empty() {
        return Ok(AuthTemplate::new(&state, AuthTab::Login)
            .with_notice(Notice::error("Google 登入失敗: 缺少憑證"))
            .into_response());
    }

    let outcome = state.api().google_login(&form.credential).await;
    finish_login(&state, &store, outcome, "Google 登入失敗: ", "請稍後再試", |_| {}).await
}

/// Store a fresh session and go to the dashboard, or re-render the login tab.
async fn finish_login(
    state: &AppState,
    store: &tower_sessions::Session,
    outcome: std::result::Result<Session, ApiError>,
    prefix: &str,
    fallback: &str,
    refill: impl FnOnce(&mut AuthTemplate),
) -> Result<Response> {
    let notice = match outcome {
        Ok(session) if session.is_authenticated() => {
            // Rotate the cookie on privilege change.
            store.cycle_id().await?;
            set_current_session(store, &session).await?;
            set_sentry_user(session.user_id.as_ref(), session.email.as_deref());
            tracing::info!(user_id = ?session.user_id, "Learner signed in");
            return Ok(Redirect::to("/dashboard").into_response());
        }
        Ok(_) => {
            tracing::warn!("Backend returned a session without token or identity");
            Notice::error(format!("{prefix}{fallback}"))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            failure_notice(prefix, fallback, &e)
        }
    };

    let mut page = AuthTemplate::new(state, AuthTab::Login).with_notice(notice);
    refill(&mut page);
    Ok(page.into_response())
}

// =============================================================================
// Logout
// =============================================================================

/// Clear the session and return to the login tab.
#[instrument(skip_all)]
pub async fn logout(store: tower_sessions::Session) -> Result<Redirect> {
    clear_current_session(&store).await?;
    clear_sentry_user();
    Ok(Redirect::to("/auth/login"))
}

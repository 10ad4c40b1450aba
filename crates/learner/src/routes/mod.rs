//! HTTP route handlers for the learner site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Redirect to /dashboard or /auth/login
//! GET  /health                 - Health check (registered in lib.rs)
//!
//! # Auth
//! GET  /auth/login             - Auth view, login tab (?registered=1&email=...)
//! POST /auth/login             - Validate + login
//! GET  /auth/register          - Auth view, register tab
//! POST /auth/register          - Validate + register
//! POST /auth/google            - Google sign-in with the widget credential
//! POST /auth/logout            - Clear the session
//!
//! # Signed-in views
//! GET  /dashboard              - Content grid (?open=<content_id> opens the player)
//! GET  /about                  - About view
//! ```

pub mod auth;
pub mod dashboard;

use axum::{
    Router,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};

use crate::middleware::OptionalLearner;
use crate::state::AppState;

/// Generic message for a backend that cannot be reached.
pub const CONNECTION_ERROR: &str = "連線錯誤，請稍後再試";

/// A one-line status message above a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// CSS modifier: `error`, `success` or `info`.
    pub kind: &'static str,
    pub text: String,
}

impl Notice {
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: "error",
            text: text.into(),
        }
    }

    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: "success",
            text: text.into(),
        }
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/google", post(auth::google))
        .route("/logout", post(auth::logout))
}

/// Create all routes for the learner site.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/about", get(dashboard::about))
        .nest("/auth", auth_routes())
}

/// Send signed-in learners to the dashboard, everyone else to login.
async fn root(OptionalLearner(session): OptionalLearner) -> impl IntoResponse {
    if session.is_some() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/auth/login")
    }
}

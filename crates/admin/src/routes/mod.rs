//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                               - Redirect to /users
//! GET  /health                         - Health check (registered in lib.rs)
//!
//! # Auth
//! GET  /auth/login                     - Login page
//! POST /auth/login                     - adminLogin
//! POST /auth/logout                    - Logout
//!
//! # Users
//! GET  /users?q=                       - Users table, local counts, search
//! GET  /users/{id}                     - Users table with the detail modal open
//! POST /users/{id}/close               - Close the detail modal
//! POST /users/{id}/status              - Set is_paid / is_active (confirm)
//! POST /users/{id}/delete              - Delete user (confirm)
//!
//! # Content
//! GET  /content                        - Content table
//! GET  /content/new                    - Content editor (create)
//! GET  /content/{id}/edit              - Content editor (edit)
//! POST /content                        - addContent
//! POST /content/close                  - Close the editor
//! POST /content/{id}                   - updateContent
//! POST /content/{id}/delete            - Delete content (confirm)
//!
//! # Permissions
//! GET  /permissions                    - Placeholder, or the open editor
//! GET  /permissions/{user_id}          - Open the editor for a user
//! POST /permissions/{user_id}          - Local ops, save, save types
//! POST /permissions/close              - Close the editor
//!
//! # Stats
//! GET  /stats                          - Platform totals
//! ```

pub mod auth;
pub mod content;
pub mod permissions;
pub mod stats;
pub mod users;

use askama::Template;
use axum::{
    Router,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
};
use eduplatform_core::{
    Session,
    api::ApiError,
    view::{AdminView, NavEntry, switch_view},
};
use serde::Deserialize;

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAdmin;
use crate::models::{Flash, session::take_flash};
use crate::state::AppState;

/// Generic message for a backend that cannot be reached.
pub const CONNECTION_ERROR: &str = "連線錯誤，請稍後再試";

/// Signed-in admin as shown in the navbar.
#[derive(Debug, Clone)]
pub struct AdminUserView {
    pub name: String,
    pub email: String,
}

impl From<&Session> for AdminUserView {
    fn from(admin: &Session) -> Self {
        Self {
            name: admin.display_name("Admin").to_string(),
            email: admin.email.clone().unwrap_or_default(),
        }
    }
}

/// Chrome shared by every panel page: navbar, active view and flash.
#[derive(Debug, Clone)]
pub struct Page {
    pub admin_user: AdminUserView,
    pub nav: Vec<NavEntry>,
    pub flash: Option<Flash>,
}

impl Page {
    /// Enter `view` and take any pending flash message.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn enter(
        store: &tower_sessions::Session,
        admin: &Session,
        view: AdminView,
    ) -> Result<Self> {
        let switch = switch_view(view);
        if let Some(collection) = switch.reload {
            tracing::debug!(view = %view, ?collection, "Reloading view data");
        }

        Ok(Self {
            admin_user: AdminUserView::from(admin),
            nav: switch.nav,
            flash: take_flash(store).await?,
        })
    }

    /// Replace the flash with an inline message.
    #[must_use]
    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flash = Some(flash);
        self
    }
}

/// Generic confirmation step for destructive actions.
///
/// Re-posts `fields` to `action` with `confirmed=true`.
#[derive(Template)]
#[template(path = "confirm.html")]
pub struct ConfirmTemplate {
    pub page: Page,
    pub message: String,
    pub action: String,
    pub fields: Vec<(String, String)>,
    pub cancel_href: String,
}

/// Form of a destructive action; only the confirmation flag.
#[derive(Debug, Deserialize)]
pub struct ConfirmForm {
    pub confirmed: Option<String>,
}

/// Whether a form carried the confirmation flag.
#[must_use]
pub fn is_confirmed(flag: Option<&str>) -> bool {
    flag == Some("true")
}

/// Failure text for a backend write: `"{prefix}: {message}"` for a rejection
/// that carries a message, the bare prefix otherwise.
#[must_use]
pub fn failure_text(prefix: &str, err: &ApiError) -> String {
    match err.rejection_message() {
        Some(message) if !message.is_empty() => format!("{prefix}: {message}"),
        _ => prefix.to_string(),
    }
}

/// `"{prefix}/{id}"` with `id` percent-encoded as one path segment.
#[must_use]
pub fn id_path(prefix: &str, id: &impl AsRef<str>) -> String {
    format!("{prefix}/{}", urlencoding::encode(id.as_ref()))
}

/// Render a template into an HTML response.
///
/// # Errors
///
/// Returns [`crate::error::AppError::Template`] if rendering fails.
pub fn render(template: &impl Template) -> Result<Html<String>> {
    Ok(Html(template.render()?))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create all routes for the admin panel.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        // Users
        .route("/users", get(users::index))
        .route("/users/{id}", get(users::show))
        .route("/users/{id}/close", post(users::close))
        .route("/users/{id}/status", post(users::update_status))
        .route("/users/{id}/delete", post(users::delete))
        // Content
        .route("/content", get(content::index).post(content::create))
        .route("/content/new", get(content::new))
        .route("/content/close", post(content::close))
        .route("/content/{id}", post(content::update))
        .route("/content/{id}/edit", get(content::edit))
        .route("/content/{id}/delete", post(content::delete))
        // Permissions
        .route("/permissions", get(permissions::index))
        .route("/permissions/close", post(permissions::close))
        .route(
            "/permissions/{user_id}",
            get(permissions::open).post(permissions::submit),
        )
        // Stats
        .route("/stats", get(stats::index))
        .nest("/auth", auth_routes())
}

/// Signed-in admins land on the users view.
async fn root(OptionalAdmin(admin): OptionalAdmin) -> impl IntoResponse {
    if admin.is_some() {
        Redirect::to("/users")
    } else {
        Redirect::to("/auth/login")
    }
}

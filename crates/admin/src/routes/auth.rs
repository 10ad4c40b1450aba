//! Admin authentication route handlers.

use askama::Template;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use eduplatform_core::api::ApiError;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;

use super::{CONNECTION_ERROR, render};
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAdmin, clear_current_admin, set_current_admin};
use crate::models::{Flash, session::clear_panel_state};
use crate::state::AppState;

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login page template.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub message: Option<Flash>,
}

/// Login failure text: the backend message, or a connection error.
fn failure_message(err: &ApiError) -> String {
    match err {
        ApiError::Rejected { .. } => format!("登入失敗: {}", err.display_message("請檢查您的帳號密碼")),
        _ => CONNECTION_ERROR.to_string(),
    }
}

/// Display the login page.
pub async fn login_page(OptionalAdmin(admin): OptionalAdmin) -> Result<Response> {
    if admin.is_some() {
        return Ok(Redirect::to("/users").into_response());
    }

    let template = LoginTemplate {
        email: String::new(),
        message: None,
    };
    Ok(render(&template)?.into_response())
}

/// Handle the login form.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    store: tower_sessions::Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let password = SecretString::from(form.password);
    // Admin email goes to the backend as typed, only trimmed.
    let email = form.email.trim().to_string();

    let message = match state.api().admin_login(&email, &password).await {
        Ok(admin) if admin.is_authenticated() => {
            // Fresh session id on privilege change
            store.cycle_id().await?;
            clear_panel_state(&store).await?;
            set_current_admin(&store, &admin).await?;
            set_sentry_user(admin.user_id.as_ref(), admin.email.as_deref());
            tracing::info!(email = %email, "Admin signed in");
            return Ok(Redirect::to("/users").into_response());
        }
        Ok(_) => {
            tracing::warn!("Backend returned an admin session without token or identity");
            "登入失敗: 請稍後再試".to_string()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Admin login failed");
            failure_message(&e)
        }
    };

    let template = LoginTemplate {
        email,
        message: Some(Flash::error(message)),
    };
    Ok(render(&template)?.into_response())
}

/// Clear the admin session and every piece of panel state.
#[instrument(skip_all)]
pub async fn logout(store: tower_sessions::Session) -> Result<Redirect> {
    clear_current_admin(&store).await?;
    clear_panel_state(&store).await?;
    clear_sentry_user();
    Ok(Redirect::to("/auth/login"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use eduplatform_core::ErrorKind;

    #[test]
    fn test_failure_message() {
        let rejected = ApiError::Rejected {
            kind: ErrorKind::Rejected,
            message: "Not an admin".to_string(),
        };
        assert_eq!(failure_message(&rejected), "登入失敗: Not an admin");

        let transport = ApiError::Decode {
            status: 200,
            source: serde_json::from_str::<serde_json::Value>("nope").unwrap_err(),
        };
        assert_eq!(failure_message(&transport), CONNECTION_ERROR);
    }

    #[test]
    fn test_login_template_keeps_email() {
        let html = LoginTemplate {
            email: "root@example.com".to_string(),
            message: Some(Flash::error("登入失敗: Not an admin")),
        }
        .render()
        .unwrap();

        assert!(html.contains("value=\"root@example.com\""));
        assert!(html.contains("message error"));
        assert!(html.contains("登入失敗: Not an admin"));
    }
}

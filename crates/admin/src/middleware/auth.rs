//! Authentication middleware and extractors for admin.
//!
//! Provides extractors for requiring admin authentication in route handlers.
//! The admin shares the learner's [`Session`] shape and session key; only the
//! backend decides whether the account may use admin actions.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use eduplatform_core::{SESSION_KEY, Session};

/// Extractor that requires admin authentication.
///
/// If the admin is not logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdmin(admin): RequireAdmin,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.display_name("Admin"))
/// }
/// ```
pub struct RequireAdmin(pub Session);

/// Error returned when admin authentication is required but the user is not logged in.
pub enum AdminAuthRejection {
    /// Redirect to login page.
    RedirectToLogin,
    /// The session layer is missing (misconfigured router).
    MissingSessionLayer,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::MissingSessionLayer => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let store = parts
            .extensions
            .get::<tower_sessions::Session>()
            .ok_or(AdminAuthRejection::MissingSessionLayer)?;

        let admin = load_admin(store)
            .await
            .ok_or(AdminAuthRejection::RedirectToLogin)?;

        Ok(Self(admin))
    }
}

/// Extractor that optionally gets the current admin.
///
/// Unlike `RequireAdmin`, this does not reject the request if the admin is not logged in.
pub struct OptionalAdmin(pub Option<Session>);

impl<S> FromRequestParts<S> for OptionalAdmin
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = match parts.extensions.get::<tower_sessions::Session>() {
            Some(store) => load_admin(store).await,
            None => None,
        };

        Ok(Self(admin))
    }
}

async fn load_admin(store: &tower_sessions::Session) -> Option<Session> {
    store
        .get::<Session>(SESSION_KEY)
        .await
        .ok()
        .flatten()
        .filter(Session::is_authenticated)
}

/// Helper to set the current admin in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    store: &tower_sessions::Session,
    admin: &Session,
) -> Result<(), tower_sessions::session::Error> {
    store.insert(SESSION_KEY, admin).await
}

/// Helper to clear the current admin from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(
    store: &tower_sessions::Session,
) -> Result<(), tower_sessions::session::Error> {
    store.remove::<Session>(SESSION_KEY).await?;
    Ok(())
}

//! Authentication extractors.
//!
//! The learner is "authenticated" exactly when the session holds a
//! [`Session`] with a token and a name or email. Anything else is the auth
//! view.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use eduplatform_core::{SESSION_KEY, Session};

/// Extractor that requires a signed-in learner.
///
/// If the learner is not logged in, redirects to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireLearner(session): RequireLearner) -> impl IntoResponse {
///     format!("Hello, {}!", session.name)
/// }
/// ```
pub struct RequireLearner(pub Session);

/// Error returned when a learner session is required but absent.
pub enum AuthRejection {
    /// Redirect to login page.
    RedirectToLogin,
    /// The session layer is missing (misconfigured router).
    MissingSessionLayer,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::MissingSessionLayer => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireLearner
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let store = parts
            .extensions
            .get::<tower_sessions::Session>()
            .ok_or(AuthRejection::MissingSessionLayer)?;

        let session = load_session(store)
            .await
            .ok_or(AuthRejection::RedirectToLogin)?;

        Ok(Self(session))
    }
}

/// Extractor that optionally gets the signed-in learner.
///
/// Unlike `RequireLearner`, this does not reject the request.
pub struct OptionalLearner(pub Option<Session>);

impl<S> FromRequestParts<S> for OptionalLearner
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = match parts.extensions.get::<tower_sessions::Session>() {
            Some(store) => load_session(store).await,
            None => None,
        };

        Ok(Self(session))
    }
}

/// Read the stored session, treating incomplete records as signed out.
async fn load_session(store: &tower_sessions::Session) -> Option<Session> {
    store
        .get::<Session>(SESSION_KEY)
        .await
        .ok()
        .flatten()
        .filter(Session::is_authenticated)
}

/// Store the session after a successful login (replaces any previous one).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_session(
    store: &tower_sessions::Session,
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    store.insert(SESSION_KEY, session).await
}

/// Remove the session (logout or expiry).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_session(
    store: &tower_sessions::Session,
) -> Result<(), tower_sessions::session::Error> {
    store.remove::<Session>(SESSION_KEY).await?;
    Ok(())
}

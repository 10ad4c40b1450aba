//! Learner actions: login, registration, Google sign-in and the content grid.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::instrument;

use super::{ApiClient, ApiError, TokenOnly};
use crate::types::{Email, LearnerContent, Session, SessionToken};

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct NewAccount<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct GoogleCredential<'a> {
    credential: &'a str,
}

impl ApiClient {
    /// `login`: email/password sign-in.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] for wrong credentials, or a transport
    /// error.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &Email, password: &SecretString) -> Result<Session, ApiError> {
        let credentials = Credentials {
            email: email.as_str(),
            password: password.expose_secret(),
        };
        Ok(self.call_ok("login", &credentials).await?.data_as()?)
    }

    /// `register`: create an account. The learner must log in afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] (for example a duplicate email), or a
    /// transport error.
    #[instrument(skip(self, name, password), fields(email = %email))]
    pub async fn register(
        &self,
        name: &str,
        email: &Email,
        password: &SecretString,
    ) -> Result<(), ApiError> {
        let account = NewAccount {
            name,
            email: email.as_str(),
            password: password.expose_secret(),
        };
        self.call_ok("register", &account).await?;
        Ok(())
    }

    /// `googleLogin`: exchange a Google identity credential for a session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] when the backend refuses the credential,
    /// or a transport error.
    #[instrument(skip_all)]
    pub async fn google_login(&self, credential: &str) -> Result<Session, ApiError> {
        Ok(self
            .call_ok("googleLogin", &GoogleCredential { credential })
            .await?
            .data_as()?)
    }

    /// `getContent`: the learner's grid, with unlock state per item.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] (including an expired session), or a
    /// transport error.
    #[instrument(skip_all)]
    pub async fn get_content(&self, token: &SessionToken) -> Result<Vec<LearnerContent>, ApiError> {
        Ok(self
            .call_ok("getContent", &TokenOnly { token })
            .await?
            .data_field("content")?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::api::tests::stub_backend;
    use crate::types::ContentType;

    #[tokio::test]
    async fn test_login_sends_credentials_and_parses_session() {
        let (client, stub) = stub_backend(
            StatusCode::OK,
            json!({
                "status": "success",
                "data": {"token": "tok-1", "name": "小明", "email": "ming@example.com", "userId": "U1"}
            }),
        )
        .await;

        let email = Email::parse("ming@example.com").unwrap();
        let session = client
            .login(&email, &SecretString::from("secret1"))
            .await
            .unwrap();

        assert_eq!(session.token.expose(), "tok-1");
        assert_eq!(session.name, "小明");
        assert!(session.is_authenticated());
        assert_eq!(
            stub.bodies(),
            vec![json!({"action": "login", "email": "ming@example.com", "password": "secret1"})]
        );
    }

    #[tokio::test]
    async fn test_register_rejection_keeps_message() {
        let (client, _stub) = stub_backend(
            StatusCode::OK,
            json!({"status": "error", "message": "Email already registered"}),
        )
        .await;

        let email = Email::parse("ming@example.com").unwrap();
        let err = client
            .register("小明", &email, &SecretString::from("secret1"))
            .await
            .unwrap_err();
        assert_eq!(err.rejection_message(), Some("Email already registered"));
    }

    #[tokio::test]
    async fn test_get_content_accepts_type_alias() {
        let (client, stub) = stub_backend(
            StatusCode::OK,
            json!({
                "status": "success",
                "data": {"content": [
                    {"content_id": "C1", "title": "Intro", "url": "https://youtu.be/dQw4w9WgXcQ", "type": "free", "isUnlocked": true},
                    {"content_id": "C2", "title": "Deep dive", "url": "", "content_type": "vip", "isUnlocked": false}
                ]}
            }),
        )
        .await;

        let items = client.get_content(&SessionToken::new("tok")).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content_type, ContentType::Free);
        assert!(!items[1].is_unlocked);
        assert_eq!(
            stub.bodies(),
            vec![json!({"action": "getContent", "token": "tok"})]
        );
    }

    #[tokio::test]
    async fn test_get_content_session_expired() {
        let (client, _stub) = stub_backend(
            StatusCode::OK,
            json!({"status": "error", "message": "Session expired"}),
        )
        .await;

        let err = client
            .get_content(&SessionToken::new("stale"))
            .await
            .unwrap_err();
        assert!(err.is_session_expired());
    }
}

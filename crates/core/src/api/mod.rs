//! Backend gateway shared by the learner and admin apps.
//!
//! Every backend operation is one POST of `{"action": ..., ...params}` to a
//! single configured URL. The response is always the
//! [`Envelope`](crate::Envelope) wrapper, whatever the HTTP status.
//!
//! # Error tiers
//!
//! - Transport: network failure or a body that is not JSON. Logged here and
//!   returned as [`ApiError::Http`] / [`ApiError::Decode`].
//! - Application: `status != "success"`. The typed wrappers turn these into
//!   [`ApiError::Rejected`], with the message exactly as sent.
//!
//! There is no retry and no request timeout.

mod admin;
mod learner;

pub use admin::PermissionSave;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

use crate::envelope::{DataError, Envelope, ErrorKind};

/// Marker left in the URL of an unconfigured deployment.
pub const PLACEHOLDER_MARKER: &str = "YOUR_GOOGLE_APPS_SCRIPT";

/// Errors when validating the backend URL.
#[derive(Debug, Error)]
pub enum ApiConfigError {
    /// Not a parseable absolute URL.
    #[error("invalid backend URL: {0}")]
    Invalid(#[from] url::ParseError),

    /// Scheme other than http/https.
    #[error("backend URL must use http or https, got {0}")]
    UnsupportedScheme(String),

    /// The deployment placeholder was never replaced.
    #[error("backend URL still contains the {PLACEHOLDER_MARKER} placeholder")]
    Placeholder,
}

/// Backend location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    url: Url,
}

impl ApiConfig {
    /// Validate a backend URL.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparseable URL, a non-http(s) scheme, or a URL
    /// that still contains [`PLACEHOLDER_MARKER`].
    pub fn new(raw: &str) -> Result<Self, ApiConfigError> {
        let raw = raw.trim();
        if raw.contains(PLACEHOLDER_MARKER) {
            return Err(ApiConfigError::Placeholder);
        }

        let url = Url::parse(raw)?;
        match url.scheme() {
            "http" | "https" => Ok(Self { url }),
            other => Err(ApiConfigError::UnsupportedScheme(other.to_string())),
        }
    }

    /// The endpoint URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

/// Errors returned by the gateway.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, reset).
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body is not a JSON envelope.
    #[error("invalid backend response (HTTP {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// Parameters could not be encoded as a JSON object.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// The backend answered with a non-success envelope.
    #[error("{message}")]
    Rejected { kind: ErrorKind, message: String },

    /// The success payload is missing or has an unexpected shape.
    #[error(transparent)]
    Data(#[from] DataError),
}

impl ApiError {
    /// Whether this is a transport-tier failure (shown as a generic message).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Decode { .. } | Self::Encode(_))
    }

    /// Whether the backend reported the session token as expired.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(
            self,
            Self::Rejected {
                kind: ErrorKind::SessionExpired,
                ..
            }
        )
    }

    /// Backend message of an application-tier failure.
    #[must_use]
    pub fn rejection_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Text for an inline failure panel.
    ///
    /// Rejections show the backend message verbatim (or `fallback` when it
    /// is empty); every other failure shows `fallback`.
    #[must_use]
    pub fn display_message<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.rejection_message()
            .filter(|message| !message.is_empty())
            .unwrap_or(fallback)
    }
}

/// Client for the backend endpoint.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    url: Url,
}

impl ApiClient {
    /// Create a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        // No timeout: requests wait as long as the backend takes.
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                url: config.url.clone(),
            }),
        })
    }

    /// The endpoint this client posts to.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Send one action and return the parsed envelope.
    ///
    /// The envelope is returned as-is even when `status != "success"`.
    ///
    /// # Errors
    ///
    /// Returns a transport-tier [`ApiError`] when the request fails or the
    /// body is not a JSON envelope.
    #[instrument(skip_all, fields(action = %action))]
    pub async fn call<P: Serialize + ?Sized>(
        &self,
        action: &str,
        params: &P,
    ) -> Result<Envelope, ApiError> {
        let body = request_body(action, params)?;

        let response = self
            .inner
            .client
            .post(self.inner.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Backend request failed");
                ApiError::Http(e)
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            error!(error = %e, %status, "Failed to read backend response");
            ApiError::Http(e)
        })?;

        let envelope: Envelope = serde_json::from_slice(&bytes).map_err(|source| {
            error!(error = %source, %status, "Backend response is not a JSON envelope");
            ApiError::Decode {
                status: status.as_u16(),
                source,
            }
        })?;

        debug!(%status, backend_status = %envelope.status, "Backend call finished");
        Ok(envelope)
    }

    /// [`call`](Self::call), then reject non-success envelopes.
    async fn call_ok<P: Serialize + ?Sized>(
        &self,
        action: &str,
        params: &P,
    ) -> Result<Envelope, ApiError> {
        expect_success(self.call(action, params).await?)
    }
}

/// Merge `action` into the serialized parameter object.
fn request_body<P: Serialize + ?Sized>(action: &str, params: &P) -> Result<Value, ApiError> {
    let mut body = match serde_json::to_value(params).map_err(ApiError::Encode)? {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => {
            return Err(ApiError::Encode(serde::ser::Error::custom(
                "parameters must serialize to a JSON object",
            )));
        }
    };
    body.insert("action".to_string(), Value::String(action.to_string()));
    Ok(Value::Object(body))
}

fn expect_success(envelope: Envelope) -> Result<Envelope, ApiError> {
    match envelope.error_kind() {
        None => Ok(envelope),
        Some(kind) => Err(ApiError::Rejected {
            kind,
            message: envelope.message.unwrap_or_default(),
        }),
    }
}

/// Request body carrying only the session token.
#[derive(Serialize)]
struct TokenOnly<'a> {
    token: &'a crate::SessionToken,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    use std::sync::Mutex;

    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

    /// One canned response plus the bodies the stub received.
    #[derive(Clone)]
    pub(crate) struct Stub {
        pub(crate) requests: Arc<Mutex<Vec<Value>>>,
    }

    impl Stub {
        pub(crate) fn bodies(&self) -> Vec<Value> {
            self.requests.lock().unwrap().clone()
        }
    }

    /// Serve `reply` (with `status`) to every POST, on a random port.
    pub(crate) async fn stub_backend(status: StatusCode, reply: Value) -> (ApiClient, Stub) {
        async fn handle(
            State((recorded, status, reply)): State<(Arc<Mutex<Vec<Value>>>, StatusCode, Value)>,
            Json(body): Json<Value>,
        ) -> (StatusCode, Json<Value>) {
            recorded.lock().unwrap().push(body);
            (status, Json(reply))
        }

        let stub = Stub {
            requests: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/exec", post(handle))
            .with_state((stub.requests.clone(), status, reply));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = ApiConfig::new(&format!("http://{addr}/exec")).unwrap();
        (ApiClient::new(&config).unwrap(), stub)
    }

    #[test]
    fn test_config_rejects_placeholder() {
        let err =
            ApiConfig::new("https://script.google.com/macros/s/YOUR_GOOGLE_APPS_SCRIPT_ID/exec")
                .unwrap_err();
        assert!(matches!(err, ApiConfigError::Placeholder));
    }

    #[test]
    fn test_config_schemes() {
        assert!(ApiConfig::new("https://script.google.com/macros/s/abc/exec").is_ok());
        assert!(ApiConfig::new("http://127.0.0.1:8080/").is_ok());
        assert!(matches!(
            ApiConfig::new("ftp://example.com/"),
            Err(ApiConfigError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(matches!(
            ApiConfig::new("not a url"),
            Err(ApiConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_request_body_merges_action() {
        let body = request_body("getStats", &json!({"token": "t"})).unwrap();
        assert_eq!(body, json!({"action": "getStats", "token": "t"}));

        let body = request_body("ping", &()).unwrap();
        assert_eq!(body, json!({"action": "ping"}));

        assert!(matches!(
            request_body("bad", &[1, 2]),
            Err(ApiError::Encode(_))
        ));
    }

    #[test]
    fn test_expect_success_classifies() {
        let err = expect_success(Envelope::failure("Session expired")).unwrap_err();
        assert!(err.is_session_expired());
        assert!(!err.is_transport());

        let err = expect_success(Envelope::failure("Email already registered")).unwrap_err();
        assert_eq!(err.rejection_message(), Some("Email already registered"));
        assert_eq!(err.display_message("x"), "Email already registered");
    }

    #[tokio::test]
    async fn test_call_returns_failure_envelope_on_http_error_status() {
        let (client, stub) = stub_backend(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"status": "error", "message": "boom"}),
        )
        .await;

        let envelope = client.call("getStats", &json!({"token": "t"})).await.unwrap();
        assert!(!envelope.is_success());
        assert_eq!(envelope.message.as_deref(), Some("boom"));
        assert_eq!(stub.bodies(), vec![json!({"action": "getStats", "token": "t"})]);
    }

    #[tokio::test]
    async fn test_call_non_json_is_transport_error() {
        let (client, _stub) = stub_backend(StatusCode::OK, json!("<html>")).await;
        // A bare JSON string is not an envelope.
        let err = client.call("getStats", &()).await.unwrap_err();
        assert!(err.is_transport());
        assert!(matches!(err, ApiError::Decode { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_call_unreachable_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ApiConfig::new(&format!("http://{addr}/exec")).unwrap();
        let client = ApiClient::new(&config).unwrap();
        let err = client.call("getStats", &()).await.unwrap_err();
        assert!(matches!(err, ApiError::Http(_)));
        assert_eq!(err.display_message("連線錯誤，請稍後再試"), "連線錯誤，請稍後再試");
    }
}

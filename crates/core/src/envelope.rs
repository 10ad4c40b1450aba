//! The `{status, message, data}` wrapper returned by every backend action.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `status` value of a successful call.
pub const STATUS_SUCCESS: &str = "success";

/// Message the backend sends when the token is no longer valid.
///
/// The backend has no structured error codes; this exact string is the only
/// signal for an expired session.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired";

/// Classification of a non-success envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The token was rejected as expired; the client must log out.
    SessionExpired,
    /// Any other application-level refusal. The message is shown verbatim.
    Rejected,
}

impl ErrorKind {
    /// Classify a failure message.
    #[must_use]
    pub fn from_message(message: Option<&str>) -> Self {
        match message {
            Some(SESSION_EXPIRED_MESSAGE) => Self::SessionExpired,
            _ => Self::Rejected,
        }
    }
}

/// Failure to pull a typed payload out of a successful envelope.
#[derive(Debug, Error)]
pub enum DataError {
    /// `data` (or the named field inside it) is absent.
    #[error("response has no {0}")]
    Missing(String),
    /// The payload does not match the expected shape.
    #[error("malformed {field}: {source}")]
    Malformed {
        field: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Parsed response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Envelope {
    /// Successful envelope carrying `data`.
    #[must_use]
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: None,
            data: Some(data),
        }
    }

    /// Failed envelope carrying a message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
            data: None,
        }
    }

    /// Whether `status` is exactly `"success"`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Failure classification, or `None` for a successful envelope.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        (!self.is_success()).then(|| ErrorKind::from_message(self.message.as_deref()))
    }

    /// The message, or `fallback` when the backend sent none.
    #[must_use]
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.message.as_deref().filter(|m| !m.is_empty()).unwrap_or(fallback)
    }

    /// Deserialize the whole `data` object.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Missing`] without `data`, or
    /// [`DataError::Malformed`] when it does not fit `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, DataError> {
        let data = self
            .data
            .clone()
            .ok_or_else(|| DataError::Missing("data".to_string()))?;
        serde_json::from_value(data).map_err(|source| DataError::Malformed {
            field: "data".to_string(),
            source,
        })
    }

    /// Deserialize one field of the `data` object, such as `users`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Missing`] when `data` or the field is absent, or
    /// [`DataError::Malformed`] when it does not fit `T`.
    pub fn data_field<T: DeserializeOwned>(&self, field: &str) -> Result<T, DataError> {
        let value = self
            .data
            .as_ref()
            .and_then(|data| data.get(field))
            .cloned()
            .ok_or_else(|| DataError::Missing(field.to_string()))?;
        serde_json::from_value(value).map_err(|source| DataError::Malformed {
            field: field.to_string(),
            source,
        })
    }
}

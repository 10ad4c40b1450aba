//! Authenticated identity held for the lifetime of a browser session.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Key the [`Session`] is stored under in the server-side session.
pub const SESSION_KEY: &str = "session";

/// Opaque bearer token issued by the backend.
///
/// `Debug` is redacted so the token never reaches logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Expose the raw token for a backend call.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the backend returned an empty token.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Session-stored identity, as returned by `login`, `googleLogin` and
/// `adminLogin`.
///
/// Both apps store this same shape under the same session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        rename = "userId",
        alias = "user_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<UserId>,
}

impl Session {
    /// A session counts as authenticated only with both a token and a name.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty() && !self.name.trim().is_empty()
    }

    /// Name for the greeting / navbar, falling back to the email, then `fallback`.
    #[must_use]
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        if !self.name.trim().is_empty() {
            &self.name
        } else {
            self.email.as_deref().filter(|e| !e.is_empty()).unwrap_or(fallback)
        }
    }
}

//! Types kept in the admin's server-side session between requests.
//!
//! Besides the signed-in [`eduplatform_core::Session`], the panel keeps which
//! entity pending actions target ([`Selection`]), the phase of each editor,
//! and a one-shot flash message shown after a redirect.

use eduplatform_core::{editor::EditorPhase, view::Selection};
use serde::{Deserialize, Serialize};

/// Session keys for admin panel state.
pub mod keys {
    /// Key for the single-slot [`super::Selection`].
    pub const SELECTION: &str = "selection";

    /// Key for the permissions editor phase.
    pub const PERMISSIONS_EDITOR: &str = "permissions_editor";

    /// Key for the content editor phase.
    pub const CONTENT_EDITOR: &str = "content_editor";

    /// Key for the one-shot flash message.
    pub const FLASH: &str = "flash";
}

/// Style of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    /// CSS modifier.
    #[must_use]
    pub const fn class(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub text: String,
}

impl Flash {
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            text: text.into(),
        }
    }

    /// CSS modifier for templates.
    #[must_use]
    pub const fn class(&self) -> &'static str {
        self.kind.class()
    }
}

type SessionResult<T> = Result<T, tower_sessions::session::Error>;

/// Current selection; empty when nothing is stored.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn load_selection(store: &tower_sessions::Session) -> SessionResult<Selection> {
    Ok(store.get(keys::SELECTION).await?.unwrap_or_default())
}

/// Replace the selection.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn store_selection(
    store: &tower_sessions::Session,
    selection: &Selection,
) -> SessionResult<()> {
    store.insert(keys::SELECTION, selection).await
}

/// Phase of the editor stored under `key`; closed when nothing is stored.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn load_phase(store: &tower_sessions::Session, key: &str) -> SessionResult<EditorPhase> {
    Ok(store.get(key).await?.unwrap_or_default())
}

/// Store the phase of the editor under `key`.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn store_phase(
    store: &tower_sessions::Session,
    key: &str,
    phase: &EditorPhase,
) -> SessionResult<()> {
    tracing::debug!(editor = key, phase = phase.name(), "Editor phase");
    store.insert(key, phase).await
}

/// Queue a message for the next page.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn push_flash(store: &tower_sessions::Session, flash: Flash) -> SessionResult<()> {
    store.insert(keys::FLASH, flash).await
}

/// Take the queued message, if any.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn take_flash(store: &tower_sessions::Session) -> SessionResult<Option<Flash>> {
    store.remove(keys::FLASH).await
}

/// Forget every piece of panel state (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_panel_state(store: &tower_sessions::Session) -> SessionResult<()> {
    for key in [
        keys::SELECTION,
        keys::PERMISSIONS_EDITOR,
        keys::CONTENT_EDITOR,
        keys::FLASH,
    ] {
        store.remove_value(key).await?;
    }
    Ok(())
}

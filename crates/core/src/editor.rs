//! Lifecycle shared by the admin editors (permissions, content, user detail).
//!
//! ```text
//! closed → loading → loaded → [edited]* → saving → closed | loaded
//!             ↓                             ↓
//!         load_failed                 loaded (edits kept)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current phase of an editor.
///
/// Stored in the admin's session between requests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum EditorPhase {
    #[default]
    Closed,
    /// Opened, waiting for the backend.
    Loading,
    /// Load failed; the editor stays open with an inline message.
    LoadFailed { message: String },
    /// Data is on screen. `edited` is set once the admin changes anything.
    Loaded { edited: bool },
    /// A full-replacement write is in flight.
    Saving,
}

/// Input to [`EditorPhase::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    Open,
    LoadSucceeded,
    LoadFailed(String),
    Edit,
    Save,
    /// The write succeeded. Editors that stay on screen pass `keep_open`.
    SaveSucceeded { keep_open: bool },
    /// The write failed; local edits must survive.
    SaveFailed,
    Close,
}

/// An event that is not valid in the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot apply {event} while {phase}")]
pub struct TransitionError {
    pub phase: &'static str,
    pub event: &'static str,
}

impl EditorPhase {
    /// Short phase name for logs and CSS.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Loading => "loading",
            Self::LoadFailed { .. } => "load_failed",
            Self::Loaded { .. } => "loaded",
            Self::Saving => "saving",
        }
    }

    /// Whether the editor is visible.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// Whether there are unsaved local edits.
    #[must_use]
    pub const fn has_unsaved_edits(&self) -> bool {
        matches!(self, Self::Loaded { edited: true })
    }

    /// Inline load failure message, if any.
    #[must_use]
    pub fn load_error(&self) -> Option<&str> {
        match self {
            Self::LoadFailed { message } => Some(message),
            _ => None,
        }
    }

    /// Advance the machine.
    ///
    /// `Open` is accepted from any phase so a failed or stale editor can be
    /// reloaded, and `Close` is always accepted.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] for an event that does not apply to the
    /// current phase, such as saving before the data has loaded.
    pub fn apply(self, event: EditorEvent) -> Result<Self, TransitionError> {
        match (self, event) {
            (_, EditorEvent::Open) => Ok(Self::Loading),
            (_, EditorEvent::Close) => Ok(Self::Closed),
            (Self::Loading, EditorEvent::LoadSucceeded) => Ok(Self::Loaded { edited: false }),
            (Self::Loading, EditorEvent::LoadFailed(message)) => Ok(Self::LoadFailed { message }),
            (Self::Loaded { .. }, EditorEvent::Edit) => Ok(Self::Loaded { edited: true }),
            (Self::Loaded { .. }, EditorEvent::Save) => Ok(Self::Saving),
            (Self::Saving, EditorEvent::SaveSucceeded { keep_open: true }) => {
                Ok(Self::Loaded { edited: false })
            }
            (Self::Saving, EditorEvent::SaveSucceeded { keep_open: false }) => Ok(Self::Closed),
            (Self::Saving, EditorEvent::SaveFailed) => Ok(Self::Loaded { edited: true }),
            (phase, event) => Err(TransitionError {
                phase: phase.name(),
                event: event.name(),
            }),
        }
    }
}

impl EditorEvent {
    const fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::LoadSucceeded => "load_succeeded",
            Self::LoadFailed(_) => "load_failed",
            Self::Edit => "edit",
            Self::Save => "save",
            Self::SaveSucceeded { .. } => "save_succeeded",
            Self::SaveFailed => "save_failed",
            Self::Close => "close",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn run(events: Vec<EditorEvent>) -> Result<EditorPhase, TransitionError> {
        events
            .into_iter()
            .try_fold(EditorPhase::Closed, EditorPhase::apply)
    }

    #[test]
    fn test_happy_path_keeps_open() {
        let phase = run(vec![
            EditorEvent::Open,
            EditorEvent::LoadSucceeded,
            EditorEvent::Edit,
            EditorEvent::Edit,
            EditorEvent::Save,
            EditorEvent::SaveSucceeded { keep_open: true },
        ])
        .unwrap();
        assert_eq!(phase, EditorPhase::Loaded { edited: false });
    }

    #[test]
    fn test_save_success_can_close() {
        let phase = run(vec![
            EditorEvent::Open,
            EditorEvent::LoadSucceeded,
            EditorEvent::Save,
            EditorEvent::SaveSucceeded { keep_open: false },
        ])
        .unwrap();
        assert!(!phase.is_open());
    }

    #[test]
    fn test_load_failure_stays_open() {
        let phase = run(vec![
            EditorEvent::Open,
            EditorEvent::LoadFailed("載入失敗".to_string()),
        ])
        .unwrap();
        assert!(phase.is_open());
        assert_eq!(phase.load_error(), Some("載入失敗"));

        // Retry re-enters loading.
        assert_eq!(phase.apply(EditorEvent::Open).unwrap(), EditorPhase::Loading);
    }

    #[test]
    fn test_save_failure_keeps_edits() {
        let phase = run(vec![
            EditorEvent::Open,
            EditorEvent::LoadSucceeded,
            EditorEvent::Save,
            EditorEvent::SaveFailed,
        ])
        .unwrap();
        assert!(phase.has_unsaved_edits());
    }

    #[test]
    fn test_invalid_transitions() {
        let err = run(vec![EditorEvent::Save]).unwrap_err();
        assert_eq!(err.phase, "closed");
        assert_eq!(err.event, "save");

        let err = run(vec![EditorEvent::Open, EditorEvent::Edit]).unwrap_err();
        assert_eq!(err.phase, "loading");

        let err = run(vec![
            EditorEvent::Open,
            EditorEvent::LoadFailed(String::new()),
            EditorEvent::Save,
        ])
        .unwrap_err();
        assert_eq!(err.phase, "load_failed");
    }

    #[test]
    fn test_session_representation() {
        let phase = EditorPhase::LoadFailed {
            message: "載入失敗".to_string(),
        };
        let json = serde_json::to_string(&phase).unwrap();
        assert_eq!(json, r#"{"phase":"load_failed","message":"載入失敗"}"#);
        assert_eq!(serde_json::from_str::<EditorPhase>(&json).unwrap(), phase);
    }
}

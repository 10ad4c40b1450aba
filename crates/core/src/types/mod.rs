//! Core types for EduPlatform.
//!
//! This module provides type-safe wrappers for the records exchanged with the
//! backend.

pub mod content;
pub mod email;
pub mod id;
pub mod permission;
pub mod session;
pub mod stats;
pub mod user;

pub use content::{
    ContentDraft, ContentItem, ContentType, ContentTypeUpdate, LearnerContent, UnknownContentType,
};
pub use email::{Email, EmailError};
pub use id::*;
pub use permission::{
    BACKEND_UTC_OFFSET_SECS, PermissionRecord, PermissionUpdate, ReleaseDateEntry, parse_lenient_date,
};
pub use session::{SESSION_KEY, Session, SessionToken};
pub use stats::{PlatformStats, UserCounts};
pub use user::{StatusField, User};

//! EduPlatform Core - Shared types library.
//!
//! This crate provides the pieces shared by both EduPlatform front-ends:
//! - `learner` - Learner-facing site (login, content grid, video player)
//! - `admin` - Administration panel (users, content, permissions, stats)
//!
//! # Architecture
//!
//! Everything except the [`api`] module is pure: types, validation, and the
//! view-state machines. The [`api`] module (behind the `client` feature) is the
//! one place that talks to the external backend, so both binaries share a
//! single gateway instead of keeping their own copies.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, email, session, users, content, permissions, stats
//! - [`envelope`] - The `{status, message, data}` response wrapper
//! - [`validation`] - Learner auth form checks
//! - [`video`] - Accepted video-link shapes and embed URLs
//! - [`view`] - Named views, navigation and admin selection slots
//! - [`editor`] - Editor lifecycle state machine
//! - [`api`] - Backend gateway (feature `client`)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod editor;
pub mod envelope;
pub mod types;
pub mod validation;
pub mod video;
pub mod view;

#[cfg(feature = "client")]
pub mod api;

pub use envelope::{DataError, Envelope, ErrorKind, SESSION_EXPIRED_MESSAGE};
pub use types::*;

//! HTTP middleware stack for the learner site.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. Session layer (tower-sessions with in-memory store)

pub mod auth;
pub mod session;

pub use auth::{OptionalLearner, RequireLearner, clear_current_session, set_current_session};
pub use session::create_session_layer;

//! Session management module.
//!
//! This module tracks which browsers have logged in. Sessions are created on
//! a successful login, refreshed on every authenticated request, and dropped
//! after the configured idle timeout.

pub mod store;

pub use store::{MemorySessionStore, Session, SessionError, SessionId, SessionStore};

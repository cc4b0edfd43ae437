//! # FileDeck Daemon Library
//!
//! This crate provides the server side of FileDeck, a password-gated web
//! file manager for a single directory tree.
//!
//! ## Overview
//!
//! The daemon serves one HTML endpoint. After logging in, a user can:
//!
//! - **Browse**: list directories, directories ahead of files
//! - **Edit**: load a file into a text area and save it back
//! - **Manage**: delete (recursively), rename, create files and folders
//! - **Transfer**: upload files and download them as attachments
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Server                            │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────────────────────────────────┐ │
//! │  │  web: extract -> decode (protocol) -> gate -> render  │ │
//! │  └──────────────────────────────────────────────────────┘ │
//! │  ┌────────────┐  ┌────────────┐  ┌─────────────────────┐ │
//! │  │    auth    │  │  session   │  │  files: browser,    │ │
//! │  │  (bcrypt)  │  │  (DashMap) │  │  ops, transfer      │ │
//! │  └────────────┘  └────────────┘  └─────────────────────┘ │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daemon::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     config.validate()?;
//!
//!     let mut server = Server::new(config)?;
//!     let addr = server.start().await?;
//!     println!("listening on http://{}", addr);
//!
//!     // Wait for shutdown signal...
//!
//!     server.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`auth`]: Credential checking
//! - [`session`]: Logged-in session store
//! - [`files`]: Directory browsing, file operations and transfers
//! - [`web`]: HTTP router, request extraction and page rendering
//! - [`state`]: Shared application state
//! - [`server`]: Server lifecycle

pub mod auth;
pub mod config;
pub mod files;
pub mod server;
pub mod session;
pub mod state;
pub mod web;

// Re-export protocol for convenience
pub use protocol;

pub use auth::{hash_password, Credentials};
pub use config::Config;
pub use files::{DirectoryBrowser, DirectoryEntry, FileOps, FileTransfer, Listing};
pub use server::{Server, ServerState};
pub use session::{MemorySessionStore, SessionError, SessionId, SessionStore};
pub use state::{AppState, SharedState};
pub use web::build_router;

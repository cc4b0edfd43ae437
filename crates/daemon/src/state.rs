//! Shared state handed to every request handler.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::auth::Credentials;
use crate::config::Config;
use crate::files::{DirectoryBrowser, FileOps, FileTransfer};
use crate::session::MemorySessionStore;

/// Everything a request handler needs, built once from the configuration.
#[derive(Debug)]
pub struct AppState {
    /// Validated configuration.
    pub config: Config,
    /// Directory resolution and listing.
    pub browser: DirectoryBrowser,
    /// File and directory mutators.
    pub ops: FileOps,
    /// Upload and download handling.
    pub transfer: FileTransfer,
    /// The account allowed to log in.
    pub credentials: Credentials,
    /// Logged-in sessions.
    pub sessions: Arc<MemorySessionStore>,
}

/// Handle to the application state shared across handlers.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Build the state from a configuration.
    ///
    /// Fails when the configured root is not an existing directory.
    pub fn new(config: Config) -> Result<Self> {
        let browser = DirectoryBrowser::new(&config.file.root, config.file.confine_to_root)
            .with_context(|| format!("Invalid root directory: {}", config.file.root.display()))?;
        let ops = FileOps::new(browser.clone());
        let transfer = FileTransfer::new(browser.clone(), config.file.max_upload_size);
        let credentials = Credentials::from(&config.auth);
        let sessions = Arc::new(MemorySessionStore::new(config.session.idle_timeout()));

        Ok(Self {
            config,
            browser,
            ops,
            transfer,
            credentials,
            sessions,
        })
    }

    /// Wrap the state for sharing.
    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}

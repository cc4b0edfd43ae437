//! Server lifecycle: binding, background tasks and graceful shutdown.
//!
//! The `Server` owns the shared application state, the HTTP listener task
//! and the session cleanup task, and stops them together.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::state::{AppState, SharedState};
use crate::web;

/// How long `stop` waits for in-flight requests to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Server lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Initial state, not started.
    Stopped,
    /// Binding the listener and starting tasks.
    Starting,
    /// Accepting requests.
    Running,
    /// Draining requests.
    ShuttingDown,
}

/// The file manager server.
pub struct Server {
    /// Shared application state.
    app: SharedState,
    /// Current state.
    state: Arc<RwLock<ServerState>>,
    /// Address actually bound, once running.
    local_addr: Option<SocketAddr>,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
    /// HTTP server task.
    serve_task: Option<JoinHandle<()>>,
    /// Session cleanup task.
    cleanup_task: Option<JoinHandle<()>>,
}

impl Server {
    /// Creates a server from a validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        let app = AppState::new(config)?.shared();
        info!(
            root = %app.browser.root().display(),
            confined = app.browser.is_confined(),
            username = app.credentials.username(),
            "Serving directory"
        );

        Ok(Self {
            app,
            state: Arc::new(RwLock::new(ServerState::Stopped)),
            local_addr: None,
            shutdown_token: CancellationToken::new(),
            serve_task: None,
            cleanup_task: None,
        })
    }

    /// Returns the current state.
    pub async fn state(&self) -> ServerState {
        *self.state.read().await
    }

    /// Returns the bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Returns the shutdown token for external tasks to observe shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Binds the configured address and starts serving.
    ///
    /// Returns the bound address, which differs from the configured one when
    /// port 0 was requested.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        {
            let mut state = self.state.write().await;
            if *state != ServerState::Stopped {
                anyhow::bail!("Server is already running");
            }
            *state = ServerState::Starting;
        }

        let (listener, local_addr) = match self.bind().await {
            Ok(bound) => bound,
            Err(e) => {
                *self.state.write().await = ServerState::Stopped;
                return Err(e);
            }
        };
        self.local_addr = Some(local_addr);

        let cleanup_interval = self.app.config.session.cleanup_interval();
        self.cleanup_task = Some(
            self.app
                .sessions
                .start_cleanup_task(cleanup_interval, self.shutdown_token.clone()),
        );
        debug!(interval = ?cleanup_interval, "Started session cleanup task");

        let router = web::build_router(Arc::clone(&self.app));
        let token = self.shutdown_token.clone();
        self.serve_task = Some(tokio::spawn(async move {
            let shutdown = async move { token.cancelled().await };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("HTTP server error: {}", e);
            }
        }));

        *self.state.write().await = ServerState::Running;
        info!(addr = %local_addr, "Server started");
        Ok(local_addr)
    }

    async fn bind(&self) -> Result<(TcpListener, SocketAddr)> {
        let bind = self.app.config.bind_addr()?;
        let listener = TcpListener::bind(bind)
            .await
            .with_context(|| format!("Failed to bind {}", bind))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read bound address")?;
        Ok((listener, local_addr))
    }

    /// Stops the server, letting in-flight requests finish.
    pub async fn stop(&mut self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state == ServerState::Stopped {
                return Ok(());
            }
            if *state == ServerState::ShuttingDown {
                anyhow::bail!("Server is already shutting down");
            }
            *state = ServerState::ShuttingDown;
        }

        info!("Stopping server...");
        self.shutdown_token.cancel();

        if let Some(task) = self.serve_task.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("HTTP server task failed: {}", e),
                Err(_) => warn!(grace = ?SHUTDOWN_GRACE, "Requests still running after grace period"),
            }
        }
        if let Some(task) = self.cleanup_task.take() {
            if let Err(e) = task.await {
                warn!("Session cleanup task failed: {}", e);
            }
        }

        self.local_addr = None;
        *self.state.write().await = ServerState::Stopped;
        info!("Server stopped");
        Ok(())
    }
}

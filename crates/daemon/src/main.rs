//! FileDeck
//!
//! Password-gated web file manager.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use daemon::config::{default_config_path, Config};
use daemon::Server;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// FileDeck - password-gated web file manager.
#[derive(Parser, Debug)]
#[command(name = "filedeck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve the file manager until SIGINT/SIGTERM
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Directory to serve (overrides file.root)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },

    /// Read a password from stdin and print its bcrypt hash
    HashPassword {
        /// bcrypt cost (defaults to auth.hash_cost)
        #[arg(long)]
        cost: Option<u32>,
    },

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Serve { bind, root } => {
            let mut config = Config::load(&config_path)?;
            let overridden = config.apply_env_overrides();
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(root) = root {
                config.file.root = root;
            }
            config.validate()?;

            let _guard = init_tracing(cli.verbose, &config)?;
            tracing::info!("Using config file: {:?}", config_path);
            if !overridden.is_empty() {
                tracing::info!(settings = ?overridden, "Applied environment overrides");
            }
            serve(config).await?;
        }
        Commands::HashPassword { cost } => {
            init_tracing(cli.verbose, &Config::default())?;
            let config = Config::load(&config_path)?;
            let cost = cost.unwrap_or(config.auth.hash_cost);

            let password = read_password()?;
            let hash = tokio::task::spawn_blocking(move || daemon::hash_password(&password, cost))
                .await
                .context("Hashing task failed")?
                .context("Failed to hash password")?;
            println!("{}", hash);
        }
        Commands::InitConfig { force } => {
            init_tracing(cli.verbose, &Config::default())?;
            init_config(&config_path, force)?;
            println!("Wrote default configuration to {}", config_path.display());
            println!("Set auth.username and auth.password_hash (see `filedeck hash-password`).");
        }
    }

    Ok(())
}

/// Set up logging.
///
/// `--verbose` forces debug; otherwise `RUST_LOG` wins over the configured
/// level. The returned guard must live as long as file logging is needed.
fn init_tracing(verbose: bool, config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.daemon.log_level))
    };

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer());

    let Some(log_file) = &config.daemon.log_file else {
        registry.init();
        return Ok(None);
    };

    let directory = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", log_file.display()))?;

    let appender = tracing_appender::rolling::daily(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    registry
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

async fn serve(config: Config) -> Result<()> {
    let mut server = Server::new(config)?;
    let addr = server.start().await?;
    tracing::info!("FileDeck listening on http://{}", addr);

    wait_for_shutdown_signal().await?;
    tracing::info!("Received shutdown signal");

    server.stop().await
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }
    Ok(())
}

/// Read one line from stdin, without its line ending.
fn read_password() -> Result<String> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;

    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    Ok(password)
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }
    Config::default().save(path)
}

//! flickr-login -- demo web app that logs users in with Flickr.
//!
//! This is the application entry point. It wires together:
//!   - Configuration loading
//!   - Flickr API credentials (config, env or system keychain)
//!   - The HTTP server
//!   - Graceful shutdown on SIGTERM / SIGINT

use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use flickr_login::config::Config;
use flickr_login::{AppState, build_app, credentials};

// ---------------------------------------------------------------------------
// CLI argument parsing (minimal, no clap dependency)
// ---------------------------------------------------------------------------

struct CliArgs {
    config_path: Option<PathBuf>,
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.next() {
                    config_path = Some(PathBuf::from(path));
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("flickr-login {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                eprintln!("Run with --help for usage information.");
                std::process::exit(1);
            }
        }
    }

    CliArgs { config_path }
}

fn print_usage() {
    println!(
        "\
flickr-login {version} -- log in with Flickr over OAuth 1.0a

USAGE:
    flickr-login [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file [default: {default}]
    -h, --help             Print this help message
    -V, --version          Print version information

ENVIRONMENT:
    RUST_LOG                      Override log level (e.g. RUST_LOG=debug)
    FLICKR_LOGIN_CONFIG           Alternative to --config flag
    FLICKR_LOGIN_CLIENT_ID        Flickr API key (otherwise read from the keychain)
    FLICKR_LOGIN_CLIENT_SECRET    Flickr API secret (otherwise read from the keychain)
",
        version = env!("CARGO_PKG_VERSION"),
        default = DEFAULT_CONFIG_PATH,
    );
}

const DEFAULT_CONFIG_PATH: &str = "flickr-login.toml";

/// `--config` wins over `FLICKR_LOGIN_CONFIG`, which wins over the default.
fn resolve_config_path(cli: Option<PathBuf>, env: Option<String>) -> PathBuf {
    cli.or_else(|| env.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    // 1. Parse CLI arguments
    let cli = parse_args();
    let config_path = resolve_config_path(
        cli.config_path,
        std::env::var("FLICKR_LOGIN_CONFIG").ok(),
    );

    // 2. Load configuration
    let config = Config::load(&config_path)?;

    // 3. Initialize tracing/logging
    init_tracing(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Starting flickr-login"
    );
    if config.source.is_none() {
        tracing::warn!("Config file not found at {}, using defaults", config_path.display());
    }
    for key in ["credentials.client_id", "credentials.client_secret"] {
        if let Some(var) = config.env_overrides.env_var_for(key) {
            tracing::debug!(setting = key, env = var, "Setting taken from environment");
        }
    }

    // 4. Resolve Flickr API credentials; refuse to start without them.
    // Keychain calls block, so they get a thread of their own.
    let credentials_config = config.credentials.clone();
    let credentials = tokio::task::spawn_blocking(move || {
        let store = credentials::default_store();
        credentials::load(&credentials_config, store.as_ref())
    })
    .await??;

    // 5. Build shared application state
    let state = AppState::new(config.clone(), credentials)?;
    tracing::info!(
        callback = %state.handshake.callback_url(),
        perms = %config.flickr.perms,
        "Flickr OAuth configured"
    );
    if !config.session.secure_cookies {
        tracing::warn!("session.secure_cookies is off -- cookies will be sent over plain HTTP");
    }

    // 6. Bind and serve
    let app = build_app(state);
    let listen_addr = config.listen_addr();
    let listener = TcpListener::bind(&listen_addr).await?;
    tracing::info!(addr = %listen_addr, "Listening");

    println!();
    println!("  flickr-login v{} is running", env!("CARGO_PKG_VERSION"));
    println!("  Open {}/ to log in", config.public_url());
    println!();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down gracefully");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tracing initialization
// ---------------------------------------------------------------------------

/// Set up the tracing subscriber based on configuration.
fn init_tracing(config: &Config) {
    // RUST_LOG env var takes precedence over config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        // Set this crate to the configured level, dependencies to warn
        EnvFilter::new(format!("flickr_login={level},tower_http={level},warn"))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

// ---------------------------------------------------------------------------
// Graceful shutdown
// ---------------------------------------------------------------------------

/// Wait for a shutdown signal (SIGTERM or SIGINT / Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C)");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

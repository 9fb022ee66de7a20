use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::Notify;
use tracing::{info, warn};

use roombook_crypto::{ExposeSecret, PasswordHasher, SecretString};
use roombook_gateway::{Clock, SystemClock};
use roombook_server::api::{AppState, router};
use roombook_server::config::RoomBookConfig;
use roombook_server::ratelimit::RateLimiter;
use roombook_server::state_factory;

/// RoomBook reservation gateway HTTP server.
#[derive(Parser, Debug)]
#[command(name = "roombook-server", about = "Standalone HTTP server for the RoomBook gateway")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "roombook.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the peppered hash of a password read from stdin.
    HashPassword,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = RoomBookConfig::load(Path::new(&cli.config))?;
    config.apply_process_env();

    if let Some(Commands::HashPassword) = cli.command {
        return run_hash_password(&config);
    }

    roombook_server::telemetry::init(&config.logging);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let datastore = state_factory::create_datastore(&config.database)?;
    if datastore.is_none() {
        info!("managed datastore not configured, all actions go to the legacy backend");
    }
    let gateway = Arc::new(state_factory::build_gateway(
        &config,
        datastore,
        Arc::clone(&clock),
    )?);
    if gateway.ensure_configured().is_err() {
        warn!("legacy backend URL is not set; every request will fail with 500");
    }
    let flags = gateway.flags();
    info!(
        read_enabled = flags.read_enabled,
        write_enabled = flags.write_enabled,
        "gateway initialized"
    );

    let rate_limiter = if config.rate_limit.enabled {
        let limiter = Arc::new(RateLimiter::new(
            state_factory::create_counter_store(),
            Arc::clone(&clock),
            &config.rate_limit,
        ));
        spawn_pruner(
            Arc::clone(&limiter),
            Duration::from_secs(config.rate_limit.prune_interval_seconds.max(1)),
        );
        info!(
            max_requests = config.rate_limit.max_requests,
            window_seconds = config.rate_limit.window_seconds,
            "rate limiter enabled"
        );
        Some(limiter)
    } else {
        None
    };

    let state = AppState {
        gateway,
        rate_limiter,
        max_body_bytes: config.server.max_body_bytes,
    };
    let app = router(state);

    let host = cli.host.unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "roombook-server listening");

    // Serve with graceful shutdown on SIGINT / SIGTERM, bounded by the drain timeout.
    let stopping = Arc::new(Notify::new());
    let signalled = Arc::clone(&stopping);
    let serve = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        signalled.notify_one();
    })
    .into_future();

    let drain = Duration::from_secs(config.server.shutdown_timeout_seconds);
    tokio::select! {
        result = serve => result?,
        () = async {
            stopping.notified().await;
            tokio::time::sleep(drain).await;
        } => {
            warn!(
                timeout_secs = config.server.shutdown_timeout_seconds,
                "shutdown timeout elapsed, dropping open connections"
            );
        }
    }

    info!("roombook-server stopped");
    Ok(())
}

fn spawn_pruner(limiter: Arc<RateLimiter>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let pruned = limiter.prune().await;
            if pruned > 0 {
                tracing::debug!(pruned, "expired rate limit buckets dropped");
            }
        }
    });
}

/// Run the `hash-password` subcommand: read a password from stdin, print its hash.
fn run_hash_password(config: &RoomBookConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pepper = config
        .security
        .password_pepper
        .as_ref()
        .map(|p| p.expose_secret().clone())
        .unwrap_or_default();
    if pepper.is_empty() {
        eprintln!("warning: no password pepper configured");
    }

    let mut password = String::new();
    std::io::Read::read_to_string(&mut std::io::stdin(), &mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    let hasher = PasswordHasher::new(SecretString::new(pepper));
    println!("{}", hasher.hash(password));
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}

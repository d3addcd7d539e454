//! Bracket server backed by PostgreSQL.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use pico_args::Arguments;
use tourney::db::Database;
use tourney_server::{
    api::{self, AppState},
    config::ServerConfig,
    identity::TokenVerifier,
    logging, metrics,
};

const HELP: &str = "\
Run the tournament bracket server

USAGE:
  tourney_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:5000]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/tourney]

FLAGS:
  -h, --help               Print help information
  --skip-migrations        Do not apply the bundled schema on startup

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               Secret shared with the token issuer (at least 32 characters)
  FRONTEND_URL             Base of share links [default: http://localhost:3000]
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  CREATE_MISSING_MATCHES   Create placeholder matches for unknown results [default: true]
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let skip_migrations = pargs.contains("--skip-migrations");
    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url_override: Option<String> = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind_override, database_url_override)?;
    tracing::info!("Starting bracket server at {}", config.bind);

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        tracing::info!("Prometheus metrics exposed at http://{}/metrics", metrics_bind);
    }

    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    tracing::info!("Database connected successfully");

    let store = db.store();
    if skip_migrations {
        tracing::warn!("Skipping schema migrations");
    } else {
        store
            .migrate()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to apply migrations: {}", e))?;
        tracing::info!("Schema is up to date");
    }

    let state = AppState::new(
        Arc::new(store),
        TokenVerifier::new(&config.security.jwt_secret),
    )
    .with_share_base_url(config.brackets.frontend_url.clone())
    .with_ledger_policy(config.brackets.ledger_policy());

    if !state.brackets.policy().create_missing_matches {
        tracing::info!("Results for unknown matches will be rejected");
    }

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    tracing::info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", err);
        std::future::pending::<()>().await;
    }
}

use std::sync::Arc;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use goalkeeper::config::Config;
use goalkeeper::db::{create_pool, init_db, AppState, SqliteGoalStore};
use goalkeeper::handlers;
use goalkeeper::payments::StripeClient;

#[derive(Parser, Debug)]
#[command(name = "goalkeeper")]
#[command(about = "Reconciles checkout completions with commitment goals")]
struct Cli {
    /// SQLite database file (overrides DATABASE_PATH)
    #[arg(long)]
    database_path: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Delete the database on exit (useful for fresh local runs)
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "goalkeeper=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env();
    if let Some(path) = cli.database_path {
        config.database_path = path;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let secret_key = config.stripe_secret_key.clone().unwrap_or_else(|| {
        tracing::warn!("STRIPE_SECRET_KEY not set - payment methods will not be attached to goals");
        String::new()
    });

    let state = AppState {
        goals: Arc::new(SqliteGoalStore::new(db_pool)),
        checkout: Arc::new(StripeClient::with_api_base(
            secret_key,
            config.stripe_api_base.clone(),
        )),
    };

    let app = handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    if cli.ephemeral {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Goalkeeper server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cli.ephemeral {
        let db_path = &config.database_path;
        if let Err(e) = std::fs::remove_file(db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}

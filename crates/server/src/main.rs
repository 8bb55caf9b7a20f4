//! Foodgram server entry point.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use axum::{Router, extract::DefaultBodyLimit, middleware};
use clap::{Parser, Subcommand};
use foodgram_api::{AppState, auth_middleware, router as api_router};
use foodgram_common::{Config, LocalStorage, StorageBackend};
use foodgram_core::{ImportReport, ImportService};
use foodgram_db::repositories::{IngredientRepository, TagRepository};
use sea_orm::DatabaseConnection;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Headroom on top of the base64-inflated image for the rest of a recipe body.
const BODY_OVERHEAD_BYTES: usize = 256 * 1024;

#[derive(Debug, Parser)]
#[command(name = "foodgram", version, about = "Foodgram recipe-sharing API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Load ingredients from a `name,measurement_unit` CSV file.
    LoadIngredients {
        /// Path to the CSV file.
        path: PathBuf,
    },
    /// Load tags from a `name,color,slug` CSV file.
    LoadTags {
        /// Path to the CSV file.
        path: PathBuf,
    },
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=debug,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("failed to load configuration")?;

    let db = foodgram_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    foodgram_db::migrate(&db).await?;
    info!("Migrations completed");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(db, &config).await,
        Command::LoadIngredients { path } => {
            let db = Arc::new(db);
            let importer = import_service(&db);
            let file = open(&path)?;
            let report = importer.load_ingredients(file).await?;
            log_report("ingredients", &path, report);
            Ok(())
        }
        Command::LoadTags { path } => {
            let db = Arc::new(db);
            let importer = import_service(&db);
            let file = open(&path)?;
            let report = importer.load_tags(file).await?;
            log_report("tags", &path, report);
            Ok(())
        }
    }
}

fn import_service(db: &Arc<DatabaseConnection>) -> ImportService {
    ImportService::new(
        TagRepository::new(Arc::clone(db)),
        IngredientRepository::new(Arc::clone(db)),
    )
}

fn open(path: &Path) -> anyhow::Result<File> {
    File::open(path).with_context(|| format!("failed to open {}", path.display()))
}

fn log_report(kind: &str, path: &Path, report: ImportReport) {
    info!(
        kind,
        path = %path.display(),
        inserted = report.inserted,
        skipped = report.skipped,
        "Import finished"
    );
}

async fn serve(db: DatabaseConnection, config: &Config) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.media.root)
        .await
        .with_context(|| format!("failed to create {}", config.media.root.display()))?;

    let media_base_url = format!(
        "{}{}",
        config.server.url.trim_end_matches('/'),
        config.media.url
    );
    let storage: Arc<dyn StorageBackend> =
        Arc::new(LocalStorage::new(config.media.root.clone(), media_base_url));

    let state = AppState::new(Arc::new(db), storage, config);

    // Images arrive base64-encoded inside the JSON body.
    let body_limit = config.media.max_upload_bytes / 3 * 4 + BODY_OVERHEAD_BYTES;

    let app = Router::new()
        .nest("/api", api_router())
        .nest_service(&config.media.url, ServeDir::new(&config.media.root))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

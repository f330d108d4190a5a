use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stockdata::config::Settings;
use stockdata::store::{PgQuoteStore, QuoteStore};
use stockdata::{api, ingest, snapshot};

#[derive(Parser)]
#[command(name = "stockdata", about = "Stock snapshot ingestion and quote API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP quote API server
    Serve,
    /// Run one snapshot ingestion batch
    Ingest,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    init_tracing();
    if !dotenv_loaded {
        warn!("⚠️  No .env file found, using environment variables");
    }

    match Cli::parse().command {
        Command::Serve => run_api_server().await,
        Command::Ingest => run_ingest().await,
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stockdata=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

/// HTTP API server mode
async fn run_api_server() -> anyhow::Result<()> {
    info!("🌐 Starting stock data API server");

    let settings = Settings::new().context("failed to load configuration")?;
    info!("📋 Configuration loaded successfully");

    info!("🔌 Connecting to database...");
    let store = PgQuoteStore::connect(&settings.database.url, settings.database.max_connections)
        .await
        .context("failed to connect to database")?;
    store
        .ping()
        .await
        .context("database connection test failed")?;
    info!("✅ Database connection established");

    let store: Arc<dyn QuoteStore> = Arc::new(store);
    let app = api::create_router(store);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    info!("🚀 HTTP API server listening on http://{}", addr);
    info!("📡 Available endpoints:");
    info!("   GET /stocks - List stocks (query params: limit, type)");
    info!("   GET /stocks/AAPL - Single quote by ticker");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

/// One-shot ingestion mode
async fn run_ingest() -> anyhow::Result<()> {
    info!("📥 Starting snapshot ingestion run");

    let settings = Settings::new().context("failed to load configuration")?;
    info!("📋 Configuration loaded successfully");
    info!("📊 Snapshot source: {}", settings.snapshot.url);

    let outcome = ingest_outcome(&settings).await;
    let envelope = ingest::RunEnvelope::from_outcome(&outcome)?;
    println!("{}", serde_json::to_string(&envelope)?);

    match outcome {
        Ok(summary) => {
            info!(
                "✅ Ingestion run complete: {} stored, {} failed",
                summary.processed_count, summary.failed_count
            );
            Ok(())
        }
        Err(err) => {
            error!("❌ Ingestion run failed: {}", err);
            std::process::exit(1);
        }
    }
}

async fn ingest_outcome(
    settings: &Settings,
) -> Result<ingest::IngestSummary, ingest::IngestError> {
    let store =
        PgQuoteStore::connect(&settings.database.url, settings.database.max_connections).await?;
    let source = snapshot::source_for(&settings.snapshot.url);
    ingest::run(source.as_ref(), &store).await
}

//! CivicSnap - civic issue reporting gateway

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use civicsnap::{
    config::Args,
    db::{MemoryStore, MongoClient, MongoStore, RecordStore},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("civicsnap={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  CivicSnap - Issue Reporting Gateway");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Identity provider: {}", args.supabase_url);
    info!("Storage bucket: {}", args.storage_bucket);
    info!("Max upload: {} bytes", args.max_upload_bytes);
    info!("======================================");

    // Connect to MongoDB (optional in dev mode, in-memory store instead)
    let (store, store_kind): (Arc<dyn RecordStore>, &'static str) =
        match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(client) => {
                let store = MongoStore::new(&client).await?;
                info!("MongoDB connected successfully");
                (Arc::new(store), "mongodb")
            }
            Err(e) => {
                if args.dev_mode {
                    warn!(
                        "MongoDB connection failed (dev mode, using in-memory store): {}",
                        e
                    );
                    (Arc::new(MemoryStore::new()), "memory")
                } else {
                    error!("MongoDB connection failed: {}", e);
                    std::process::exit(1);
                }
            }
        };

    let state = Arc::new(AppState::new(args, store, store_kind)?);

    server::run(state).await?;

    Ok(())
}

//! Configuration for the CivicSnap gateway
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;

/// CivicSnap - civic issue reporting gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "civicsnap")]
#[command(about = "Civic issue reporting gateway")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (continue without MongoDB, in-memory store)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "civicsnap")]
    pub mongodb_db: String,

    /// Supabase project base URL (identity provider + object storage)
    #[arg(long, env = "SUPABASE_URL", default_value = "https://example.supabase.co")]
    pub supabase_url: String,

    /// Supabase anon key (citizen auth requests)
    #[arg(long, env = "SUPABASE_ANON_KEY", default_value = "dev-anon-key")]
    pub supabase_anon_key: String,

    /// Supabase service role key (storage uploads)
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", default_value = "dev-service-role-key")]
    pub supabase_service_role_key: String,

    /// Object storage bucket for issue images
    #[arg(long, env = "STORAGE_BUCKET", default_value = "public")]
    pub storage_bucket: String,

    /// Signing secret for citizen tokens (issued by the identity provider,
    /// verified here). Secrets shorter than 32 bytes are zero-padded.
    #[arg(
        long,
        env = "CITIZEN_JWT_SECRET",
        default_value = "supabase-jwt-secret-key-minimum-32-bytes-long"
    )]
    pub citizen_jwt_secret: String,

    /// Signing secret for locally issued authority session tokens.
    /// Secrets shorter than 32 bytes are zero-padded.
    #[arg(
        long,
        env = "AUTHORITY_JWT_SECRET",
        default_value = "civicsnap-authority-secret-key-min-32-bytes"
    )]
    pub authority_jwt_secret: String,

    /// Maximum accepted multipart upload size in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value = "10485760")]
    pub max_upload_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_upload_bytes == 0 {
            return Err("MAX_UPLOAD_BYTES must be greater than zero".to_string());
        }

        if self.supabase_url.ends_with('/') {
            return Err("SUPABASE_URL must not end with a trailing slash".to_string());
        }

        Ok(())
    }
}

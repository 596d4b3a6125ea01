//! CLI and environment configuration.

use clap::Parser;

/// Beacon event ingestion server.
#[derive(Debug, Parser)]
#[command(name = "beacon", version, about = "Beacon event ingestion server")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(long, default_value = "3000", env = "BEACON_PORT")]
    pub port: u16,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0", env = "BEACON_BIND")]
    pub bind: String,

    /// Path to the SQLite database file.
    #[arg(long, default_value = "beacon.db", env = "BEACON_DB_PATH")]
    pub db_path: String,

    /// Bearer token every request must present.
    #[arg(long, env = "BEACON_API_KEY")]
    pub api_key: String,

    /// Log filter when RUST_LOG is unset.
    #[arg(long, default_value = "info", env = "BEACON_LOG_LEVEL")]
    pub log_level: String,

    /// Path to the APNS ES256 private key (.p8).
    #[arg(long, env = "BEACON_APNS_KEY_PATH")]
    pub apns_key_path: Option<String>,

    /// APNS key id.
    #[arg(long, env = "BEACON_APNS_KEY_ID")]
    pub apns_key_id: Option<String>,

    /// Apple developer team id.
    #[arg(long, env = "BEACON_APNS_TEAM_ID")]
    pub apns_team_id: Option<String>,

    /// App bundle id for the apns-topic header.
    #[arg(long, env = "BEACON_APNS_BUNDLE_ID")]
    pub apns_bundle_id: Option<String>,
}

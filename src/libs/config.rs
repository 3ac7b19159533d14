use std::net::SocketAddr;

use clap::Parser;

/// Runtime settings. Every flag falls back to an environment variable, and
/// a `.env` file is loaded before parsing.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tabledesk",
    version,
    about = "Browse, edit and design Postgres tables over a JSON API."
)]
pub struct AppConfig {
    /// Postgres connection string.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://postgres@localhost:5432/postgres"
    )]
    pub database_url: String,

    /// Address the HTTP API listens on.
    #[arg(long, env = "TABLEDESK_BIND_ADDR", default_value = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    #[arg(long, env = "TABLEDESK_DB_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    #[arg(long, env = "TABLEDESK_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Schema whose tables are listed and edited.
    #[arg(long, env = "TABLEDESK_SCHEMA", default_value = "public")]
    pub schema: String,

    /// Serve an empty in-memory database instead of connecting to Postgres.
    #[arg(long, env = "TABLEDESK_IN_MEMORY")]
    pub in_memory: bool,
}

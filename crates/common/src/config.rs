use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string (the delivery queue store)
    pub redis_url: String,

    /// Pause between dispatched deliveries, in seconds (default: 1)
    pub dispatch_throttle_seconds: u64,

    /// Pause between queue drain passes of the dispatch daemon, in seconds (default: 5)
    pub dispatch_poll_interval_seconds: u64,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            dispatch_throttle_seconds: std::env::var("DISPATCH_THROTTLE_SECONDS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DISPATCH_THROTTLE_SECONDS must be a valid u64"))?,
            dispatch_poll_interval_seconds: std::env::var("DISPATCH_POLL_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("DISPATCH_POLL_INTERVAL_SECONDS must be a valid u64")
                })?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
        })
    }
}

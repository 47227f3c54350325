use std::time::Duration;

use herald_common::config::AppConfig;
use herald_common::db;
use herald_common::redis_pool::create_redis_pool;
use herald_dispatch::gateway::GatewayClient;
use herald_dispatch::processor::ItemProcessor;
use herald_dispatch::worker::DispatchWorker;
use herald_queue::DeliveryQueue;
use herald_queue::store::RedisListStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herald_dispatch=info,herald_queue=info".into()),
        )
        .json()
        .init();

    tracing::info!("BoardHerald dispatch worker starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Connect to database
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;

    // Connect to the delivery queue store
    let redis = create_redis_pool(&config.redis_url).await?;

    let queue = DeliveryQueue::new(RedisListStore::new(redis));
    let processor = ItemProcessor::new(pool, GatewayClient::new()?);
    let mut worker = DispatchWorker::new(
        queue,
        processor,
        Duration::from_secs(config.dispatch_throttle_seconds),
    );

    let poll_interval = Duration::from_secs(config.dispatch_poll_interval_seconds);

    tracing::info!(
        throttle_seconds = config.dispatch_throttle_seconds,
        poll_interval_seconds = config.dispatch_poll_interval_seconds,
        "Dispatch worker started"
    );

    // Run with graceful shutdown on Ctrl+C
    tokio::select! {
        _ = worker.run(poll_interval) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
        }
    }

    tracing::info!("BoardHerald dispatch worker stopped.");
    Ok(())
}

//! pagewarp server entry point.
//!
//! Boots the rewriting proxy over HTTP. Logs are JSON on stderr; `RUST_LOG`
//! overrides the default `info` filter.

use std::sync::Arc;

use anyhow::Result;
use pagewarp_client::{FetchClient, FetchConfig};
use pagewarp_core::{AppConfig, ResponseCache};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

mod error;
mod proxy;
mod routes;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let addr = config.socket_addr()?;

    let cache = Arc::new(ResponseCache::from_config(&config));
    let sweeper = spawn_sweeper(Arc::clone(&cache));
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let proxy = Arc::new(proxy::Proxy::new(cache, fetcher));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        "pagewarp listening on http://{} (cache ttl {}s)",
        listener.local_addr()?,
        config.cache_ttl_secs
    );

    axum::serve(listener, routes::router(proxy))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("pagewarp stopped");
    Ok(())
}

/// Drop expired cache entries once per TTL.
fn spawn_sweeper(cache: Arc<ResponseCache>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(cache.ttl());
        ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            let purged = cache.purge_expired().await;
            if purged > 0 {
                tracing::debug!("purged {} expired cache entries", purged);
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewarp_core::Payload;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sweeper_purges_expired_entries() {
        let cache = Arc::new(ResponseCache::new(Duration::from_millis(20)));
        cache.put("https://ex.com/", "text/plain", Payload::Text("hi".into())).await;
        assert_eq!(cache.len().await, 1);

        let sweeper = spawn_sweeper(Arc::clone(&cache));
        tokio::time::sleep(Duration::from_millis(120)).await;
        sweeper.abort();

        assert!(cache.is_empty().await);
    }
}

//! Cache Probe - startup check for the cache service
//!
//! Builds the cache exactly as the site does and runs one round trip through the
//! selected backend.

use std::process::ExitCode;

use anyhow::{bail, Context};
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_service::{CacheConfig, CacheService, Ttl};

const PROBE_KEY: &str = "cache-probe";
const PROBE_TTL_SECONDS: u64 = 30;

/// Main entry point for the cache probe.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache service with the enabled backends
/// 4. Write, read, re-time and delete a probe key
/// 5. Stop the background sweeper
#[tokio::main]
async fn main() -> ExitCode {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_service=info,cache_probe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("cache probe failed: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: enabled={}, memory={}, redis={}, prefix={:?}",
        config.enable_cache,
        config.enable_memory_cache,
        config.enable_redis_cache,
        config.cache_prefix
    );

    let mut service = CacheService::from_config(&config)
        .await
        .context("building cache service")?;

    let Some(backend) = service.backend_name() else {
        warn!("No cache backend enabled, nothing to probe");
        return Ok(());
    };

    let written = service
        .set(PROBE_KEY, json!({ "probe": true }), PROBE_TTL_SECONDS)
        .await
        .context("set")?;
    info!(backend, entry = ?written, "probe written");

    let Some(entry) = service.get(PROBE_KEY).await.context("get")? else {
        bail!("probe key vanished right after set");
    };
    if entry.value != json!({ "probe": true }) {
        bail!("probe value came back altered: {}", entry.value);
    }

    let provider_ttl = service.provider_ttl(PROBE_KEY).await.context("provider ttl")?;
    let data_ttl = service.data_ttl(PROBE_KEY).await.context("data ttl")?;
    info!(?provider_ttl, ?data_ttl, "probe ttl");
    if !matches!(provider_ttl, Ttl::Remaining(s) if s <= PROBE_TTL_SECONDS) {
        bail!("unexpected provider ttl {:?}", provider_ttl);
    }

    let changed = service
        .change_data_ttl(PROBE_KEY, PROBE_TTL_SECONDS * 2)
        .await
        .context("change data ttl")?;
    info!(expiration = ?changed, "probe ttl extended");

    service.del(PROBE_KEY).await.context("del")?;
    if service.get(PROBE_KEY).await.context("get after del")?.is_some() {
        bail!("probe key still present after del");
    }

    service.shutdown();
    info!(backend, "Cache probe passed");
    Ok(())
}

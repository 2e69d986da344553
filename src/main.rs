//! # news_relay
//!
//! A content-relay pipeline that periodically visits a list of target web
//! pages, extracts readable article text through a fallback chain of
//! third-party extraction providers, filters out content already delivered
//! in prior runs, and forwards new items to an external content-store API
//! with a target platform and a randomized future schedule time.
//!
//! ## Architecture
//!
//! Each cycle runs the pipeline per target URL:
//! 1. **Chain building**: order the extraction providers for the URL's
//!    domain (preferred provider first, browser fallback last)
//! 2. **Extraction**: walk the chain with pacing and bounded retries until
//!    one provider yields enough readable text
//! 3. **Dedup**: skip content whose hash is already in the shared seen-set
//! 4. **Composition**: build the record (promo fragment, platform rotation,
//!    randomized schedule time)
//! 5. **Delivery**: POST the record to the content store, then record the
//!    hash
//!
//! Cycles are driven by a periodic timer and an on-demand HTTP trigger,
//! serialized so only one runs at a time.
//!
//! ## Usage
//!
//! ```sh
//! REDIS_URL=redis://localhost:6379 \
//! CONTENT_STORE_URL=https://store.example/api/records \
//! news_relay -t ./target_sites.txt -p ./promos.txt
//! ```

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod compose;
mod config;
mod cycle;
mod dedup;
mod extract;
mod models;
mod orchestrator;
mod providers;
mod publish;
mod sources;
mod web;

use cli::Cli;
use compose::PostComposer;
use config::Config;
use cycle::{CycleController, SweepPolicy};
use dedup::RedisSeenStore;
use orchestrator::{DelayPolicy, Orchestrator};
use providers::{Provider, ProviderRegistry};
use publish::Publisher;

/// Per-attempt network timeout for provider requests.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for the HEAD liveness probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("news_relay starting up");

    let args = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration incomplete; refusing to start");
            return Err(e.into());
        }
    };

    let promos = sources::load_promo_fragments(&args.promos).await;

    let client = reqwest::Client::builder().timeout(ATTEMPT_TIMEOUT).build()?;
    let probe_client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;

    let store = match RedisSeenStore::connect(&config.redis_url, config.seen_set_key.clone()).await
    {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(error = %e, "Could not reach the dedup store; refusing to start");
            return Err(e.into());
        }
    };
    info!(set_key = %config.seen_set_key, "Connected to dedup store");

    let registry_providers: Vec<Arc<dyn Provider>> = vec![
        Arc::new(providers::proxy::ScrapeProxy::new(
            client.clone(),
            config.proxy_fetch_base.clone(),
            config.proxy_fetch_api_key.clone(),
        )),
        Arc::new(providers::render::RenderApi::new(
            client.clone(),
            config.render_api_base.clone(),
            config.render_api_key.clone(),
        )),
    ];
    let registry = ProviderRegistry::with_default_preferences(
        registry_providers,
        Arc::new(providers::browser::BrowserFetch::new(client.clone())),
    );

    let policy = if args.early_stop {
        SweepPolicy::EarlyStop
    } else {
        SweepPolicy::FullSweep
    };

    let controller = CycleController::new(
        Orchestrator::new(registry, DelayPolicy::default_policy()),
        store,
        PostComposer::new(promos),
        Publisher::new(client.clone(), config.content_store_url.clone()),
        probe_client,
        args.target_sites.clone(),
        policy,
        !args.no_probe,
    );
    let controller = Arc::new(Mutex::new(controller));

    // Periodic cycles: first run at startup, then every interval. The
    // periodic task awaits the guard, so a manual cycle in flight delays
    // rather than overlaps it.
    let periodic = Arc::clone(&controller);
    let interval_secs = args.interval_secs;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let mut guard = periodic.lock().await;
            match guard.run_cycle().await {
                Ok(stats) => info!(?stats, "Periodic cycle finished"),
                Err(e) => error!(error = %e, "Periodic cycle aborted"),
            }
        }
    });

    let app = web::router(controller);
    let listener = tokio::net::TcpListener::bind(&args.bind_addr).await?;
    info!(addr = %args.bind_addr, interval_secs, "Trigger surface listening");
    axum::serve(listener, app).await?;

    Ok(())
}

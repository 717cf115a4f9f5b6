//! Grinder Keeper - Entry Point
//!
//! Initializes configuration, logging, chain connection and the
//! keeper's periodic tasks. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load .env, config.toml + env overrides + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Load signer from GRINDER_PRIVATE_KEY
//! 4. Connect RPC, validate chain id and contract code
//! 5. Open the intent index (data/intents.json)
//! 6. Build use cases (grinder, orchestrator, iterator, indexer)
//! 7. Spawn price refresher, orchestrator and HTTP control surface
//! 8. Wait for SIGINT → graceful shutdown (readiness off → drain → exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use grinder_keeper::adapters::chain::{signer_from_env, ChainProvider, GrinderContracts};
use grinder_keeper::adapters::feeds::CoinGeckoFeed;
use grinder_keeper::adapters::http::{self, AppState};
use grinder_keeper::adapters::metrics::{HealthState, MetricsRegistry};
use grinder_keeper::adapters::persistence::JsonIntentStore;
use grinder_keeper::config;
use grinder_keeper::usecases::{
  BatchGrinder, GrindContext, GrindOrchestrator, GrindSettings, IntentIndexer, PoolIterator,
  PriceCell, PriceRefresher, Schedule,
};

#[tokio::main]
async fn main() -> Result<()> {
  // ── 1. Load configuration ───────────────────────────────
  // A missing .env is fine; the variables may come from the environment.
  let _ = dotenvy::dotenv();
  let config = config::loader::load_config("config.toml")
    .context("Failed to load configuration")?;

  // ── 2. Initialize structured JSON logging ───────────────
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.bot.log_level)),
    )
    .json()
    .init();

  info!(
    name = %config.bot.name,
    version = env!("CARGO_PKG_VERSION"),
    dry_run = config.bot.dry_run,
    policy = ?config.grind.partial_ladder_policy,
    source = ?config.grind.intent_source,
    "Starting Grinder Keeper"
  );

  if config.bot.dry_run {
    warn!("Dry-run mode: cycles run fully but NO transactions are sent");
  }

  // ── 3. Signer ───────────────────────────────────────────
  let signer = signer_from_env()?;

  // ── 4. Chain connection + contract validation ───────────
  let provider = Arc::new(
    ChainProvider::connect(&config.chain, signer)
      .await
      .context("Failed to connect to RPC")?,
  );
  let ledger = Arc::new(
    GrinderContracts::new(Arc::clone(&provider), &config.chain)
      .await
      .context("Contract validation failed")?,
  );

  // ── 5. Intent index ─────────────────────────────────────
  let store = Arc::new(JsonIntentStore::open(&config.persistence.data_dir).await?);

  // ── 6. Use cases ────────────────────────────────────────
  let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
  let settings = GrindSettings::from_config(&config);
  let context = Arc::new(GrindContext::new(
    PriceCell::new(
      config.price.fallback_usd,
      Duration::from_secs(config.price.max_age_secs),
    ),
    config.grind.intents_per_grind,
  ));

  let orchestrator = Arc::new(GrindOrchestrator::new(
    Arc::clone(&ledger),
    Arc::clone(&store),
    BatchGrinder::new(Arc::clone(&ledger), settings, Arc::clone(&metrics)),
    Arc::clone(&context),
    config.eligibility,
    config.grind.intent_source,
    Arc::clone(&metrics),
  ));

  let oracle = Arc::new(CoinGeckoFeed::new(&config.price)?);
  let refresher = PriceRefresher::new(
    oracle,
    Arc::clone(&context),
    Arc::clone(&metrics),
    Duration::from_secs(config.price.refresh_secs),
  );

  let health = Arc::new(HealthState::new(ledger.clone()));
  let state = Arc::new(AppState {
    iterator: PoolIterator::new(
      Arc::clone(&ledger),
      Arc::clone(&store),
      settings,
      Arc::clone(&metrics),
    ),
    indexer: IntentIndexer::new(
      Arc::clone(&ledger),
      Arc::clone(&store),
      config.persistence.index_batch_size,
    ),
    store: Arc::clone(&store),
    context: Arc::clone(&context),
    health: Arc::clone(&health),
    metrics: Arc::clone(&metrics),
  });

  // ── 7. Spawn tasks ──────────────────────────────────────
  let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

  let price_handle = tokio::spawn(refresher.run(shutdown_tx.subscribe()));

  let schedule = Schedule {
    cycle: Duration::from_secs(config.grind.interval_secs),
    population: Duration::from_secs(config.grind.population_refresh_secs),
  };
  let grind_handle = tokio::spawn(orchestrator.run(schedule, shutdown_tx.subscribe()));

  let http_shutdown = shutdown_tx.subscribe();
  let bind_address = config.server.bind_address.clone();
  let http_handle = tokio::spawn(async move {
    if let Err(e) = http::serve(http::router(state), bind_address, http_shutdown).await {
      error!(error = %e, "Control surface failed");
    }
  });

  info!("All tasks spawned, keeper is running");

  // ── 8. Wait for SIGINT ──────────────────────────────────
  if let Err(e) = signal::ctrl_c().await {
    error!(error = %e, "Failed to listen for SIGINT, shutting down");
  } else {
    info!("SIGINT received, initiating graceful shutdown");
  }

  health.begin_shutdown();
  let _ = shutdown_tx.send(());

  let _ = tokio::time::timeout(Duration::from_secs(35), grind_handle).await;
  let _ = tokio::time::timeout(Duration::from_secs(5), price_handle).await;
  let _ = tokio::time::timeout(Duration::from_secs(10), http_handle).await;

  info!("Shutdown complete");
  Ok(())
}

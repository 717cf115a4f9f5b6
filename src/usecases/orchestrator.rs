//! Grind Cycle Orchestrator - Clock-driven Round-robin over Intents
//!
//! Per tick:
//! 1. Take the single-flight guard (skip the tick if a cycle is running)
//! 2. Slice the population at the cursor
//! 3. Load the slice's intents (registry or local index) and drop
//!    ineligible ones
//! 4. Flatten and de-duplicate their pools, run the batch grinder
//! 5. Advance the cursor, whatever happened
//!
//! Nothing inside a cycle propagates out of `tick`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::metrics::MetricsRegistry;
use crate::config::IntentSource;
use crate::domain::{EligibilityPolicy, Intent, IntentId, PoolId};
use crate::ports::intent_store::IntentStore;
use crate::ports::ledger::Ledger;

use super::context::GrindContext;
use super::grinder::{BatchGrinder, CycleOutcome};

/// Timing of the orchestrator's two tickers.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
  pub cycle: Duration,
  /// Population refresh (registry source only).
  pub population: Duration,
}

pub struct GrindOrchestrator<L: Ledger, S: IntentStore> {
  ledger: Arc<L>,
  store: Arc<S>,
  grinder: BatchGrinder<L>,
  context: Arc<GrindContext>,
  eligibility: EligibilityPolicy,
  source: IntentSource,
  metrics: Arc<MetricsRegistry>,
}

/// Keep the first occurrence of each id.
fn dedupe<T: Copy + Eq + std::hash::Hash>(ids: impl IntoIterator<Item = T>) -> Vec<T> {
  let mut seen = HashSet::new();
  ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn unix_now() -> u64 {
  u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

impl<L: Ledger, S: IntentStore> GrindOrchestrator<L, S> {
  pub fn new(
    ledger: Arc<L>,
    store: Arc<S>,
    grinder: BatchGrinder<L>,
    context: Arc<GrindContext>,
    eligibility: EligibilityPolicy,
    source: IntentSource,
    metrics: Arc<MetricsRegistry>,
  ) -> Self {
    Self {
      ledger,
      store,
      grinder,
      context,
      eligibility,
      source,
      metrics,
    }
  }

  pub fn context(&self) -> &Arc<GrindContext> {
    &self.context
  }

  /// Re-read the population size from the configured source.
  #[instrument(skip(self))]
  pub async fn refresh_population(&self) -> Result<u64> {
    let population = match self.source {
      IntentSource::Ledger => self.ledger.total_intents().await?,
      IntentSource::Cache => self.store.len().await? as u64,
    };
    self.context.set_population(population);
    debug!(population, "Population refreshed");
    Ok(population)
  }

  /// Run one grind cycle. `None` if another cycle held the guard.
  pub async fn tick(&self) -> Option<CycleOutcome> {
    let Some(mut cursor) = self.context.try_begin_cycle() else {
      warn!("Previous grind cycle still running, tick skipped");
      self.metrics.cycles.with_label_values(&["skipped"]).inc();
      return None;
    };

    let cycle_id = Uuid::new_v4();

    if self.source == IntentSource::Cache {
      if let Err(e) = self.refresh_population().await {
        error!(%cycle_id, error = format!("{e:#}"), "Index size unavailable");
      }
    }

    let population = self.context.population();
    let slice = dedupe(cursor.slice(population));
    info!(%cycle_id, cursor = cursor.position(), population, slice = ?slice, "Grind cycle started");

    let outcome = match self.run_slice(&slice).await {
      Ok(outcome) => outcome,
      Err(e) => {
        error!(%cycle_id, error = format!("{e:#}"), "Grind cycle failed");
        CycleOutcome::Failed(e.to_string())
      }
    };

    cursor.advance(population);
    self.metrics.cycles.with_label_values(&[outcome.label()]).inc();
    self
      .metrics
      .cursor_position
      .set(i64::try_from(cursor.position()).unwrap_or(i64::MAX));
    info!(%cycle_id, outcome = outcome.label(), next_cursor = cursor.position(), "Grind cycle finished");

    Some(outcome)
  }

  async fn load_slice(&self, slice: &[u64]) -> Result<Vec<Intent>> {
    match self.source {
      IntentSource::Ledger => {
        let ids: Vec<IntentId> = slice.to_vec();
        self.ledger.intents(&ids).await
      }
      IntentSource::Cache => {
        let cached = self.store.list().await?;
        Ok(
          slice
            .iter()
            .filter_map(|&index| usize::try_from(index).ok().and_then(|i| cached.get(i).cloned()))
            .collect(),
        )
      }
    }
  }

  async fn run_slice(&self, slice: &[u64]) -> Result<CycleOutcome> {
    if slice.is_empty() {
      return Ok(CycleOutcome::Empty);
    }

    let now = unix_now();
    let intents = self.load_slice(slice).await?;

    let pool_ids: Vec<PoolId> = dedupe(
      intents
        .iter()
        .filter(|intent| match self.eligibility.check(intent, now) {
          Ok(()) => true,
          Err(reason) => {
            info!(intent_id = intent.intent_id, %reason, "Intent skipped");
            false
          }
        })
        .flat_map(|intent| intent.pool_ids.iter().copied()),
    );

    let price = self.context.price.current().await;
    self.grinder.run(&pool_ids, price.usd).await
  }

  /// Drive cycles and population refreshes until shutdown.
  ///
  /// Each cycle runs on its own task so a slow cycle never delays the
  /// ticker; overlapping ticks hit the single-flight guard.
  pub async fn run(self: Arc<Self>, schedule: Schedule, mut shutdown_rx: broadcast::Receiver<()>) {
    if let Err(e) = self.refresh_population().await {
      error!(error = format!("{e:#}"), "Initial population read failed");
    }

    let mut cycle_ticker = interval(schedule.cycle);
    cycle_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut population_ticker = interval(schedule.population);
    population_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // Both fire immediately; the population was just read.
    population_ticker.tick().await;

    let mut cycles: JoinSet<()> = JoinSet::new();

    info!(
      interval_secs = schedule.cycle.as_secs(),
      source = ?self.source,
      "Grind orchestrator started"
    );

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Grind orchestrator received shutdown signal");
          break;
        }
        _ = cycle_ticker.tick() => {
          while cycles.try_join_next().is_some() {}
          let this = Arc::clone(&self);
          cycles.spawn(async move {
            this.tick().await;
          });
        }
        _ = population_ticker.tick(), if self.source == IntentSource::Ledger => {
          if let Err(e) = self.refresh_population().await {
            error!(error = format!("{e:#}"), "Population refresh failed, keeping previous");
          }
        }
      }
    }

    // The guard holder is not necessarily the latest spawn.
    let drain = async { while cycles.join_next().await.is_some() {} };
    if tokio::time::timeout(Duration::from_secs(30), drain).await.is_err() {
      warn!(remaining = cycles.len(), "In-flight grind cycle did not finish within 30s, aborting");
    }

    info!("Grind orchestrator stopped cleanly");
  }
}

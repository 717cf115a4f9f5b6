//! Batch Grinder - Select, Probe, Gate, Submit
//!
//! One pass over a set of positions:
//! 1. Read all snapshots in one call
//! 2. Per position, walk the selector's priority list and keep the first
//!    operation whose dry-run succeeds (all positions concurrently)
//! 3. Estimate the whole batch, price it, compare with `n * per_op_budget`
//! 4. Dry-run the whole batch
//! 5. Submit with the gas limit scaled by the safety multiplier
//!
//! Budget and batch rejections are outcomes, not errors. Remote failures
//! propagate to the caller's cycle boundary.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::future::join_all;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::config::AppConfig;
use crate::domain::{
  CostAssessment, CostGate, GasMultiplier, GrindBatch, GrindOp, OperationSelector, PoolId,
  PositionSnapshot,
};
use crate::ports::ledger::{Ledger, TxHash};

/// Decision parameters shared by the batch and single-position paths.
#[derive(Debug, Clone, Copy)]
pub struct GrindSettings {
  pub selector: OperationSelector,
  pub gate: CostGate,
  pub multiplier: GasMultiplier,
  /// Stop before sending; log what would have been sent.
  pub dry_run: bool,
}

impl GrindSettings {
  pub const fn from_config(config: &AppConfig) -> Self {
    Self {
      selector: OperationSelector::new(config.grind.partial_ladder_policy),
      gate: CostGate::new(config.grind.per_op_budget_usd),
      multiplier: config.grind.gas_multiplier(),
      dry_run: config.bot.dry_run,
    }
  }
}

/// Terminal state of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
  /// No position produced a validated candidate.
  Empty,
  /// The batch would cost at least its budget.
  OverBudget(CostAssessment),
  /// The batch-level dry-run said no.
  Rejected { batch: GrindBatch },
  /// Dry-run mode: everything passed, nothing sent.
  DryRun { batch: GrindBatch, gas_limit: u64 },
  Submitted { batch: GrindBatch, tx_hash: TxHash },
  /// A remote failure ended the cycle early.
  Failed(String),
}

impl CycleOutcome {
  /// Metric label.
  pub const fn label(&self) -> &'static str {
    match self {
      Self::Empty => "empty",
      Self::OverBudget(_) => "over_budget",
      Self::Rejected { .. } => "rejected",
      Self::DryRun { .. } => "dry_run",
      Self::Submitted { .. } => "submitted",
      Self::Failed(_) => "failed",
    }
  }
}

/// Probe a position's priority list in order; first success wins.
///
/// A probe that errors is logged and treated like a `false` answer.
pub(crate) async fn first_valid_op<L: Ledger>(
  ledger: &L,
  metrics: &MetricsRegistry,
  pool_id: PoolId,
  candidates: &[GrindOp],
) -> Option<GrindOp> {
  for &op in candidates {
    match ledger.probe_op(pool_id, op).await {
      Ok(true) => {
        metrics.candidates_accepted.with_label_values(&[op.label()]).inc();
        return Some(op);
      }
      Ok(false) => debug!(pool_id, %op, "Dry-run rejected"),
      Err(e) => {
        metrics.probe_failures.inc();
        warn!(pool_id, %op, error = %e, "Dry-run failed, treating as rejected");
      }
    }
  }
  None
}

/// Cost-gated batch submitter.
pub struct BatchGrinder<L: Ledger> {
  ledger: Arc<L>,
  settings: GrindSettings,
  metrics: Arc<MetricsRegistry>,
}

impl<L: Ledger> BatchGrinder<L> {
  pub fn new(ledger: Arc<L>, settings: GrindSettings, metrics: Arc<MetricsRegistry>) -> Self {
    Self {
      ledger,
      settings,
      metrics,
    }
  }

  pub const fn settings(&self) -> &GrindSettings {
    &self.settings
  }

  /// Run the full pipeline over `pool_ids`, priced at `native_usd`.
  #[instrument(skip(self, pool_ids), fields(pools = pool_ids.len()))]
  pub async fn run(&self, pool_ids: &[PoolId], native_usd: Decimal) -> Result<CycleOutcome> {
    if pool_ids.is_empty() {
      return Ok(CycleOutcome::Empty);
    }

    let positions = self
      .ledger
      .positions(pool_ids)
      .await
      .context("Position snapshot read failed")?;

    let batch = self.accumulate(&positions).await;
    self.settle(batch, native_usd).await
  }

  /// Select at most one validated operation per position.
  ///
  /// Positions are probed concurrently; the batch keeps input order.
  pub async fn accumulate(&self, positions: &[PositionSnapshot]) -> GrindBatch {
    let decisions = join_all(positions.iter().map(|position| {
      first_valid_op(
        self.ledger.as_ref(),
        &self.metrics,
        position.pool_id,
        self.settings.selector.candidates(position),
      )
    }))
    .await;

    positions
      .iter()
      .zip(decisions)
      .filter_map(|(position, op)| op.map(|op| (position.pool_id, op)))
      .collect()
  }

  /// Estimate, gate, dry-run and submit an accumulated batch.
  #[instrument(skip(self, batch), fields(batch_size = batch.len()))]
  pub async fn settle(&self, batch: GrindBatch, native_usd: Decimal) -> Result<CycleOutcome> {
    if batch.is_empty() {
      debug!("No validated candidates, nothing to submit");
      return Ok(CycleOutcome::Empty);
    }

    let estimate = self
      .ledger
      .estimate_batch(&batch)
      .await
      .context("Batch gas estimate failed")?;
    let gas_price = self.ledger.gas_price().await.context("Gas price read failed")?;
    self.record_gas_price(gas_price);

    let assessment = self
      .settings
      .gate
      .assess(estimate, gas_price, native_usd, batch.len());
    if let Some(cost) = assessment.cost_usd.and_then(|c| c.to_f64()) {
      self.metrics.batch_cost_usd.observe(cost);
    }

    if !assessment.affordable {
      info!(
        gas_estimate = estimate,
        cost_usd = ?assessment.cost_usd,
        budget_usd = %assessment.budget_usd,
        "Batch over budget, not submitting"
      );
      return Ok(CycleOutcome::OverBudget(assessment));
    }

    if !self
      .ledger
      .probe_batch(&batch)
      .await
      .context("Batch dry-run failed")?
    {
      warn!(pools = ?batch.pool_ids(), "Batch dry-run rejected");
      return Ok(CycleOutcome::Rejected { batch });
    }

    let gas_limit = self.settings.multiplier.apply(estimate);

    if self.settings.dry_run {
      info!(
        pools = ?batch.pool_ids(),
        ops = ?batch.ops(),
        gas_limit,
        cost_usd = ?assessment.cost_usd,
        "Dry-run mode, batch not sent"
      );
      return Ok(CycleOutcome::DryRun { batch, gas_limit });
    }

    let tx_hash = self.ledger.submit_batch(&batch, gas_limit).await?;
    self.metrics.batches_submitted.inc();
    info!(
      tx_hash = %tx_hash,
      pools = ?batch.pool_ids(),
      ops = ?batch.ops(),
      gas_limit,
      cost_usd = ?assessment.cost_usd,
      "Batch submitted"
    );

    Ok(CycleOutcome::Submitted { batch, tx_hash })
  }

  #[allow(clippy::cast_precision_loss)]
  fn record_gas_price(&self, gas_price_wei: u128) {
    self.metrics.gas_price_gwei.set(gas_price_wei as f64 / 1e9);
  }
}

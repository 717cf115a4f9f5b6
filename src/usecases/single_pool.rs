//! Single-Position Iteration - Manual Trigger Path
//!
//! Same decision procedure as the batch grinder, applied to one pool
//! and submitted through the pools contract's own `grindOp` instead of
//! the batch executor. Driven by the HTTP control surface.

use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::{IntentId, PoolId};
use crate::ports::intent_store::IntentStore;
use crate::ports::ledger::{Ledger, TxHash};

use super::grinder::{first_valid_op, GrindSettings};

/// Result of iterating every pool of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountIteration {
  /// The local index has no intent for this owner.
  NoIntent,
  /// The owner's intent expired at the given unix time.
  Expired { intent_id: IntentId, expire: u64 },
  Completed {
    intent_id: IntentId,
    attempted: usize,
    submitted: Vec<TxHash>,
  },
}

pub struct PoolIterator<L: Ledger, S: IntentStore> {
  ledger: Arc<L>,
  store: Arc<S>,
  settings: GrindSettings,
  metrics: Arc<MetricsRegistry>,
}

impl<L: Ledger, S: IntentStore> PoolIterator<L, S> {
  pub fn new(
    ledger: Arc<L>,
    store: Arc<S>,
    settings: GrindSettings,
    metrics: Arc<MetricsRegistry>,
  ) -> Self {
    Self {
      ledger,
      store,
      settings,
      metrics,
    }
  }

  /// Select, probe, gate and submit one operation on `pool_id`.
  ///
  /// `Ok(None)` when no operation validated, the cost gate refused, or
  /// dry-run mode is on.
  #[instrument(skip(self, native_usd))]
  pub async fn iterate_pool(&self, pool_id: PoolId, native_usd: Decimal) -> Result<Option<TxHash>> {
    let position = self
      .ledger
      .positions(&[pool_id])
      .await?
      .into_iter()
      .next()
      .with_context(|| format!("No position returned for pool {pool_id}"))?;

    let candidates = self.settings.selector.candidates(&position);
    let Some(op) =
      first_valid_op(self.ledger.as_ref(), &self.metrics, pool_id, candidates).await
    else {
      warn!(candidates = ?candidates, "No operation passed the dry-run");
      return Ok(None);
    };

    let estimate = self
      .ledger
      .estimate_op(pool_id, op)
      .await
      .context("Gas estimate failed")?;
    let gas_price = self.ledger.gas_price().await.context("Gas price read failed")?;

    let assessment = self.settings.gate.assess(estimate, gas_price, native_usd, 1);
    if !assessment.affordable {
      info!(
        %op,
        gas_estimate = estimate,
        cost_usd = ?assessment.cost_usd,
        budget_usd = %assessment.budget_usd,
        "Operation over budget, not submitting"
      );
      return Ok(None);
    }

    let gas_limit = self.settings.multiplier.apply(estimate);

    if self.settings.dry_run {
      info!(%op, gas_limit, "Dry-run mode, operation not sent");
      return Ok(None);
    }

    let tx_hash = self.ledger.submit_op(pool_id, op, gas_limit).await?;
    info!(%op, tx_hash = %tx_hash, gas_limit, "Operation submitted");
    Ok(Some(tx_hash))
  }

  /// Iterate every pool of the owner's cached intent.
  ///
  /// Per-pool failures are logged and skipped.
  #[instrument(skip(self, native_usd), fields(owner = %owner))]
  pub async fn iterate_account(
    &self,
    owner: Address,
    native_usd: Decimal,
    now_secs: u64,
  ) -> Result<AccountIteration> {
    let Some(intent) = self.store.find_by_owner(owner).await? else {
      error!("No cached intent for account");
      return Ok(AccountIteration::NoIntent);
    };

    if intent.is_expired(now_secs) {
      warn!(intent_id = intent.intent_id, expire = intent.expire, "Intent expired");
      return Ok(AccountIteration::Expired {
        intent_id: intent.intent_id,
        expire: intent.expire,
      });
    }

    let mut submitted = Vec::new();
    for &pool_id in &intent.pool_ids {
      match self.iterate_pool(pool_id, native_usd).await {
        Ok(Some(tx_hash)) => submitted.push(tx_hash),
        Ok(None) => {}
        Err(e) => error!(pool_id, error = format!("{e:#}"), "Pool iteration failed"),
      }
    }

    Ok(AccountIteration::Completed {
      intent_id: intent.intent_id,
      attempted: intent.pool_ids.len(),
      submitted,
    })
  }
}

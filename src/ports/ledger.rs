//! Ledger Port - Remote Registry and Pools Contract Interface
//!
//! Everything the keeper needs from the chain: reading the intent
//! registry and position ladders, side-effect-free probes of single
//! operations and whole batches, gas estimation, and the one mutating
//! submission per cycle.

use async_trait::async_trait;

use crate::domain::{GrindBatch, GrindOp, Intent, IntentId, PoolId, PositionSnapshot};

/// Hash of a submitted transaction, `0x`-prefixed hex.
pub type TxHash = String;

/// Request/response contract with the remote ledger.
///
/// Probe methods distinguish `Ok(false)` (the contract would reject the
/// call) from `Err` (the probe itself failed).
#[async_trait]
pub trait Ledger: Send + Sync + 'static {
  /// Number of intents in the registry.
  async fn total_intents(&self) -> anyhow::Result<u64>;

  /// Batch-read intents by id, in request order.
  async fn intents(&self, intent_ids: &[IntentId]) -> anyhow::Result<Vec<Intent>>;

  /// Batch-read position ladders, in request order, in one round trip.
  async fn positions(&self, pool_ids: &[PoolId]) -> anyhow::Result<Vec<PositionSnapshot>>;

  /// Current network gas price in wei.
  async fn gas_price(&self) -> anyhow::Result<u128>;

  /// Dry-run a single operation on one pool.
  async fn probe_op(&self, pool_id: PoolId, op: GrindOp) -> anyhow::Result<bool>;

  /// Gas estimate for a single-operation transaction.
  async fn estimate_op(&self, pool_id: PoolId, op: GrindOp) -> anyhow::Result<u64>;

  /// Submit a single operation with an explicit gas limit.
  async fn submit_op(&self, pool_id: PoolId, op: GrindOp, gas_limit: u64)
    -> anyhow::Result<TxHash>;

  /// Gas estimate for the batch submission call.
  async fn estimate_batch(&self, batch: &GrindBatch) -> anyhow::Result<u64>;

  /// Dry-run the batch as a whole.
  async fn probe_batch(&self, batch: &GrindBatch) -> anyhow::Result<bool>;

  /// Submit the batch with an explicit gas limit.
  async fn submit_batch(&self, batch: &GrindBatch, gas_limit: u64) -> anyhow::Result<TxHash>;

  /// Lightweight connectivity check.
  async fn is_healthy(&self) -> bool;
}

//! Shared mocks and fixtures for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use mockall::mock;
use rust_decimal_macros::dec;

use grinder_keeper::adapters::metrics::MetricsRegistry;
use grinder_keeper::domain::{
    CostGate, GasMultiplier, GrindBatch, GrindOp, Intent, IntentId, Ladder, OperationSelector,
    PartialLadderPolicy, PoolId, PositionSnapshot,
};
use grinder_keeper::ports::ledger::TxHash;
use grinder_keeper::usecases::{GrindContext, GrindSettings, PriceCell};

// ---- Mock Definitions ----

mock! {
    pub Chain {}

    #[async_trait::async_trait]
    impl grinder_keeper::ports::ledger::Ledger for Chain {
        async fn total_intents(&self) -> anyhow::Result<u64>;
        async fn intents(&self, intent_ids: &[IntentId]) -> anyhow::Result<Vec<Intent>>;
        async fn positions(&self, pool_ids: &[PoolId]) -> anyhow::Result<Vec<PositionSnapshot>>;
        async fn gas_price(&self) -> anyhow::Result<u128>;
        async fn probe_op(&self, pool_id: PoolId, op: GrindOp) -> anyhow::Result<bool>;
        async fn estimate_op(&self, pool_id: PoolId, op: GrindOp) -> anyhow::Result<u64>;
        async fn submit_op(&self, pool_id: PoolId, op: GrindOp, gas_limit: u64)
            -> anyhow::Result<TxHash>;
        async fn estimate_batch(&self, batch: &GrindBatch) -> anyhow::Result<u64>;
        async fn probe_batch(&self, batch: &GrindBatch) -> anyhow::Result<bool>;
        async fn submit_batch(&self, batch: &GrindBatch, gas_limit: u64) -> anyhow::Result<TxHash>;
        async fn is_healthy(&self) -> bool;
    }
}

mock! {
    pub Store {}

    #[async_trait::async_trait]
    impl grinder_keeper::ports::intent_store::IntentStore for Store {
        async fn get(&self, intent_id: IntentId) -> anyhow::Result<Option<Intent>>;
        async fn find_by_owner(&self, owner: Address) -> anyhow::Result<Option<Intent>>;
        async fn put(&self, intent: Intent) -> anyhow::Result<()>;
        async fn list(&self) -> anyhow::Result<Vec<Intent>>;
        async fn replace_all(&self, intents: Vec<Intent>) -> anyhow::Result<()>;
        async fn len(&self) -> anyhow::Result<usize>;
    }
}

mock! {
    pub Oracle {}

    #[async_trait::async_trait]
    impl grinder_keeper::ports::price_feed::PriceOracle for Oracle {
        async fn native_usd(&self) -> anyhow::Result<grinder_keeper::ports::price_feed::PriceQuote>;
    }
}

// ---- Fixtures ----

/// 0.02 gwei: 100k gas costs $0.0054 at $2700.
pub const CHEAP_GAS_WEI: u128 = 20_000_000;
/// 20 gwei: 100k gas costs $5.40 at $2700.
pub const EXPENSIVE_GAS_WEI: u128 = 20_000_000_000;

pub fn snapshot(pool_id: PoolId, long: u32, long_max: u32, hedge: u32) -> PositionSnapshot {
    PositionSnapshot {
        pool_id,
        long: Ladder::with_counts(long, long_max),
        hedge: Ladder::with_counts(hedge, 0),
    }
}

pub fn intent(intent_id: IntentId, pool_ids: Vec<PoolId>) -> Intent {
    Intent {
        intent_id,
        owner: Address::repeat_byte(0xAB),
        pool_ids,
        expire: 0,
        grinds: 10,
        spent_grinds: 0,
        unspent_grinds: 10,
    }
}

pub fn settings(dry_run: bool) -> GrindSettings {
    GrindSettings {
        selector: OperationSelector::new(PartialLadderPolicy::SellThenBuy),
        gate: CostGate::new(dec!(0.05)),
        multiplier: GasMultiplier::DEFAULT,
        dry_run,
    }
}

pub fn metrics() -> Arc<MetricsRegistry> {
    Arc::new(MetricsRegistry::new().unwrap())
}

pub fn context(stride: u64) -> Arc<GrindContext> {
    Arc::new(GrindContext::new(
        PriceCell::new(dec!(2700), Duration::from_secs(300)),
        stride,
    ))
}

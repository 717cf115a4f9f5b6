//! Integration Tests - End-to-end Keeper Component Testing
//!
//! Tests the interaction between usecases, ports, and mock adapters.
//! Uses mockall for trait mocking and tokio::test for async tests.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use mockall::predicate::*;
use mockall::Sequence;
use rust_decimal_macros::dec;
use tokio::sync::broadcast;

use grinder_keeper::adapters::metrics::MetricsRegistry;
use grinder_keeper::config::IntentSource;
use grinder_keeper::domain::{
    EligibilityPolicy, GrindBatch, GrindOp, Intent, IntentId, PoolId, PositionSnapshot,
};
use grinder_keeper::ports::ledger::{Ledger, TxHash};
use grinder_keeper::ports::price_feed::{PriceQuote, QuoteSource};
use grinder_keeper::usecases::{
    AccountIteration, BatchGrinder, CycleOutcome, GrindOrchestrator, IntentIndexer, PoolIterator,
    PriceRefresher, Schedule,
};

use common::*;

fn orchestrator(
    ledger: MockChain,
    store: MockStore,
    stride: u64,
    dry_run: bool,
    source: IntentSource,
) -> GrindOrchestrator<MockChain, MockStore> {
    let ledger = Arc::new(ledger);
    let metrics = metrics();
    GrindOrchestrator::new(
        Arc::clone(&ledger),
        Arc::new(store),
        BatchGrinder::new(ledger, settings(dry_run), Arc::clone(&metrics)),
        context(stride),
        EligibilityPolicy::default(),
        source,
        metrics,
    )
}

// ---- Batch cycle ----

#[tokio::test]
async fn test_long_buy_position_submits_one_batch() {
    let mut ledger = MockChain::new();
    ledger.expect_total_intents().returning(|| Ok(1));
    ledger
        .expect_intents()
        .withf(|ids| ids == [0])
        .returning(|_| Ok(vec![intent(0, vec![7])]));
    ledger
        .expect_positions()
        .withf(|ids| ids == [7])
        .returning(|_| Ok(vec![snapshot(7, 0, 5, 3)]));
    ledger
        .expect_probe_op()
        .with(eq(7), eq(GrindOp::LongBuy))
        .times(1)
        .returning(|_, _| Ok(true));
    ledger.expect_estimate_batch().returning(|_| Ok(100_000));
    ledger.expect_gas_price().returning(|| Ok(CHEAP_GAS_WEI));
    ledger.expect_probe_batch().times(1).returning(|_| Ok(true));
    ledger
        .expect_submit_batch()
        .withf(|batch, gas_limit| {
            batch.pool_ids().to_vec() == vec![7]
                && batch.ops().to_vec() == vec![GrindOp::LongBuy]
                && *gas_limit == 140_000
        })
        .times(1)
        .returning(|_, _| Ok("0xabc".to_string()));

    let orch = orchestrator(ledger, MockStore::new(), 1, false, IntentSource::Ledger);
    orch.refresh_population().await.unwrap();

    match orch.tick().await {
        Some(CycleOutcome::Submitted { batch, tx_hash }) => {
            assert_eq!(batch.len(), 1);
            assert_eq!(tx_hash, "0xabc");
        }
        other => panic!("expected a submitted batch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_batch_never_submits() {
    let mut ledger = MockChain::new();
    ledger
        .expect_positions()
        .returning(|_| Ok(vec![snapshot(1, 5, 5, 0)]));
    ledger.expect_probe_op().times(2).returning(|_, _| Ok(false));
    ledger.expect_estimate_batch().never();
    ledger.expect_probe_batch().never();
    ledger.expect_submit_batch().never();

    let grinder = BatchGrinder::new(Arc::new(ledger), settings(false), metrics());
    let outcome = grinder.run(&[1], dec!(2700)).await.unwrap();
    assert_eq!(outcome, CycleOutcome::Empty);
}

#[tokio::test]
async fn test_over_budget_withholds_submission() {
    let mut ledger = MockChain::new();
    ledger
        .expect_positions()
        .returning(|_| Ok(vec![snapshot(1, 0, 5, 0)]));
    ledger.expect_probe_op().returning(|_, _| Ok(true));
    ledger.expect_estimate_batch().returning(|_| Ok(100_000));
    ledger.expect_gas_price().returning(|| Ok(EXPENSIVE_GAS_WEI));
    ledger.expect_probe_batch().never();
    ledger.expect_submit_batch().never();

    let grinder = BatchGrinder::new(Arc::new(ledger), settings(false), metrics());
    match grinder.run(&[1], dec!(2700)).await.unwrap() {
        CycleOutcome::OverBudget(assessment) => {
            assert_eq!(assessment.cost_usd, Some(dec!(5.4)));
            assert_eq!(assessment.budget_usd, dec!(0.05));
        }
        other => panic!("expected over budget, got {other:?}"),
    }
}

#[tokio::test]
async fn test_budget_scales_with_batch_size() {
    // $0.108 for three ops: over one op's $0.05, under 3 x $0.05.
    let mut ledger = MockChain::new();
    ledger.expect_positions().returning(|_| {
        Ok(vec![
            snapshot(1, 0, 5, 0),
            snapshot(2, 0, 5, 0),
            snapshot(3, 0, 5, 0),
        ])
    });
    ledger.expect_probe_op().returning(|_, _| Ok(true));
    ledger.expect_estimate_batch().returning(|_| Ok(2_000_000));
    ledger.expect_gas_price().returning(|| Ok(CHEAP_GAS_WEI));
    ledger.expect_probe_batch().returning(|_| Ok(true));
    ledger
        .expect_submit_batch()
        .withf(|batch, gas_limit| batch.len() == 3 && *gas_limit == 2_800_000)
        .times(1)
        .returning(|_, _| Ok("0x3".to_string()));

    let grinder = BatchGrinder::new(Arc::new(ledger), settings(false), metrics());
    let outcome = grinder.run(&[1, 2, 3], dec!(2700)).await.unwrap();
    assert_eq!(outcome.label(), "submitted");
}

#[tokio::test]
async fn test_batch_probe_rejection_withholds_submission() {
    let mut ledger = MockChain::new();
    ledger
        .expect_positions()
        .returning(|_| Ok(vec![snapshot(4, 0, 5, 0)]));
    ledger.expect_probe_op().returning(|_, _| Ok(true));
    ledger.expect_estimate_batch().returning(|_| Ok(100_000));
    ledger.expect_gas_price().returning(|| Ok(CHEAP_GAS_WEI));
    ledger.expect_probe_batch().times(1).returning(|_| Ok(false));
    ledger.expect_submit_batch().never();

    let grinder = BatchGrinder::new(Arc::new(ledger), settings(false), metrics());
    let outcome = grinder.run(&[4], dec!(2700)).await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Rejected { .. }));
}

#[tokio::test]
async fn test_dry_run_stops_before_sending() {
    let mut ledger = MockChain::new();
    ledger
        .expect_positions()
        .returning(|_| Ok(vec![snapshot(4, 0, 5, 0)]));
    ledger.expect_probe_op().returning(|_, _| Ok(true));
    ledger.expect_estimate_batch().returning(|_| Ok(100_000));
    ledger.expect_gas_price().returning(|| Ok(CHEAP_GAS_WEI));
    ledger.expect_probe_batch().returning(|_| Ok(true));
    ledger.expect_submit_batch().never();

    let grinder = BatchGrinder::new(Arc::new(ledger), settings(true), metrics());
    match grinder.run(&[4], dec!(2700)).await.unwrap() {
        CycleOutcome::DryRun { gas_limit, .. } => assert_eq!(gas_limit, 140_000),
        other => panic!("expected dry run, got {other:?}"),
    }
}

// ---- Priority fallback ----

#[tokio::test]
async fn test_fallback_probed_in_priority_order() {
    let mut ledger = MockChain::new();
    let mut seq = Sequence::new();

    // Partial long ladder under sell_then_buy: LONG_SELL, then LONG_BUY.
    ledger
        .expect_probe_op()
        .with(eq(10), eq(GrindOp::LongSell))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(false));
    ledger
        .expect_probe_op()
        .with(eq(10), eq(GrindOp::LongBuy))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(true));

    let grinder = BatchGrinder::new(Arc::new(ledger), settings(false), metrics());
    let batch = grinder.accumulate(&[snapshot(10, 2, 5, 0)]).await;

    assert_eq!(batch.pool_ids(), &[10]);
    assert_eq!(batch.ops(), &[GrindOp::LongBuy]);
}

#[tokio::test]
async fn test_probe_error_falls_through_to_next_op() {
    let mut ledger = MockChain::new();
    ledger
        .expect_probe_op()
        .with(eq(11), eq(GrindOp::HedgeRebuy))
        .times(1)
        .returning(|_, _| Err(anyhow::anyhow!("rpc timeout")));
    ledger
        .expect_probe_op()
        .with(eq(11), eq(GrindOp::HedgeSell))
        .times(1)
        .returning(|_, _| Ok(true));

    let grinder = BatchGrinder::new(Arc::new(ledger), settings(false), metrics());
    let batch = grinder.accumulate(&[snapshot(11, 5, 5, 2)]).await;

    assert_eq!(batch.ops(), &[GrindOp::HedgeSell]);
}

#[tokio::test]
async fn test_first_success_stops_probing() {
    let mut ledger = MockChain::new();
    ledger
        .expect_probe_op()
        .with(eq(12), eq(GrindOp::LongSell))
        .times(1)
        .returning(|_, _| Ok(true));
    ledger
        .expect_probe_op()
        .with(eq(12), eq(GrindOp::HedgeSell))
        .never();

    let grinder = BatchGrinder::new(Arc::new(ledger), settings(false), metrics());
    let batch = grinder.accumulate(&[snapshot(12, 5, 5, 0)]).await;

    assert_eq!(batch.ops(), &[GrindOp::LongSell]);
}

// ---- Cursor ----

#[tokio::test]
async fn test_cursor_round_robin_with_no_candidates() {
    let mut ledger = MockChain::new();
    ledger.expect_total_intents().returning(|| Ok(5));
    ledger.expect_intents().returning(|ids| {
        Ok(ids
            .iter()
            .map(|id| {
                let mut drained = intent(*id, vec![*id + 100]);
                drained.unspent_grinds = 0;
                drained
            })
            .collect())
    });
    ledger.expect_positions().never();
    ledger.expect_submit_batch().never();

    let orch = orchestrator(ledger, MockStore::new(), 1, false, IntentSource::Ledger);
    orch.refresh_population().await.unwrap();

    let mut visited = vec![orch.context().cursor().await.position()];
    for _ in 0..5 {
        assert_eq!(orch.tick().await, Some(CycleOutcome::Empty));
        visited.push(orch.context().cursor().await.position());
    }

    assert_eq!(visited, vec![0, 1, 2, 3, 4, 0]);
}

#[tokio::test]
async fn test_cursor_advances_when_every_call_fails() {
    let mut ledger = MockChain::new();
    ledger.expect_total_intents().returning(|| Ok(5));
    ledger
        .expect_intents()
        .returning(|_| Err(anyhow::anyhow!("connection refused")));

    let orch = orchestrator(ledger, MockStore::new(), 2, false, IntentSource::Ledger);
    orch.refresh_population().await.unwrap();

    let mut visited = Vec::new();
    for _ in 0..3 {
        let outcome = orch.tick().await.unwrap();
        assert_eq!(outcome.label(), "failed");
        visited.push(orch.context().cursor().await.position());
    }

    assert_eq!(visited, vec![2, 4, 1]);
}

#[tokio::test]
async fn test_overlapping_tick_is_skipped() {
    let mut ledger = MockChain::new();
    ledger.expect_intents().never();

    let orch = orchestrator(ledger, MockStore::new(), 1, false, IntentSource::Ledger);
    orch.context().set_population(3);

    let guard = orch.context().try_begin_cycle();
    assert!(guard.is_some());
    assert_eq!(orch.tick().await, None);
    drop(guard);

    assert_eq!(orch.context().cursor().await.position(), 0);
}

#[tokio::test]
async fn test_empty_population_is_noop() {
    let mut ledger = MockChain::new();
    ledger.expect_total_intents().returning(|| Ok(0));
    ledger.expect_intents().never();

    let orch = orchestrator(ledger, MockStore::new(), 1, false, IntentSource::Ledger);
    orch.refresh_population().await.unwrap();

    assert_eq!(orch.tick().await, Some(CycleOutcome::Empty));
    assert_eq!(orch.context().cursor().await.position(), 0);
}

// ---- Slice assembly ----

#[tokio::test]
async fn test_shared_pools_deduplicated_across_intents() {
    let mut ledger = MockChain::new();
    ledger.expect_total_intents().returning(|| Ok(2));
    ledger
        .expect_intents()
        .withf(|ids| ids == [0, 1])
        .returning(|_| Ok(vec![intent(0, vec![7, 8]), intent(1, vec![8, 9])]));
    ledger
        .expect_positions()
        .withf(|ids| ids == [7, 8, 9])
        .times(1)
        .returning(|ids| Ok(ids.iter().map(|id| snapshot(*id, 5, 5, 0)).collect()));
    ledger.expect_probe_op().returning(|_, _| Ok(false));

    let orch = orchestrator(ledger, MockStore::new(), 2, false, IntentSource::Ledger);
    orch.refresh_population().await.unwrap();

    assert_eq!(orch.tick().await, Some(CycleOutcome::Empty));
}

#[tokio::test]
async fn test_expired_intents_are_skipped() {
    let mut ledger = MockChain::new();
    ledger.expect_total_intents().returning(|| Ok(2));
    ledger.expect_intents().returning(|_| {
        let mut expired = intent(0, vec![7]);
        expired.expire = 1;
        Ok(vec![expired, intent(1, vec![9])])
    });
    ledger
        .expect_positions()
        .withf(|ids| ids == [9])
        .times(1)
        .returning(|_| Ok(vec![snapshot(9, 5, 5, 1)]));
    ledger.expect_probe_op().returning(|_, _| Ok(false));

    let orch = orchestrator(ledger, MockStore::new(), 2, false, IntentSource::Ledger);
    orch.refresh_population().await.unwrap();

    assert_eq!(orch.tick().await, Some(CycleOutcome::Empty));
}

#[tokio::test]
async fn test_cache_source_walks_local_index() {
    let mut store = MockStore::new();
    store.expect_len().returning(|| Ok(3));
    store
        .expect_list()
        .returning(|| Ok(vec![intent(5, vec![50]), intent(6, vec![60]), intent(7, vec![70])]));

    let mut ledger = MockChain::new();
    ledger.expect_total_intents().never();
    ledger.expect_intents().never();
    ledger
        .expect_positions()
        .withf(|ids| ids == [50])
        .times(1)
        .returning(|_| Ok(vec![snapshot(50, 5, 5, 1)]));
    ledger.expect_probe_op().returning(|_, _| Ok(false));

    let orch = orchestrator(ledger, store, 1, false, IntentSource::Cache);

    assert_eq!(orch.tick().await, Some(CycleOutcome::Empty));
    assert_eq!(orch.context().population(), 3);
    assert_eq!(orch.context().cursor().await.position(), 1);
}

// ---- Single-position path ----

#[tokio::test]
async fn test_iterate_pool_submits_single_op() {
    let mut ledger = MockChain::new();
    ledger
        .expect_positions()
        .returning(|_| Ok(vec![snapshot(3, 0, 5, 0)]));
    ledger
        .expect_probe_op()
        .with(eq(3), eq(GrindOp::LongBuy))
        .returning(|_, _| Ok(true));
    ledger.expect_estimate_op().returning(|_, _| Ok(100_000));
    ledger.expect_gas_price().returning(|| Ok(CHEAP_GAS_WEI));
    ledger
        .expect_submit_op()
        .with(eq(3), eq(GrindOp::LongBuy), eq(140_000))
        .times(1)
        .returning(|_, _, _| Ok("0xfeed".to_string()));

    let iterator = PoolIterator::new(
        Arc::new(ledger),
        Arc::new(MockStore::new()),
        settings(false),
        metrics(),
    );

    let tx = tokio_test::assert_ok!(iterator.iterate_pool(3, dec!(2700)).await);
    assert_eq!(tx.as_deref(), Some("0xfeed"));
}

#[tokio::test]
async fn test_iterate_pool_over_budget_returns_none() {
    let mut ledger = MockChain::new();
    ledger
        .expect_positions()
        .returning(|_| Ok(vec![snapshot(3, 0, 5, 0)]));
    ledger.expect_probe_op().returning(|_, _| Ok(true));
    ledger.expect_estimate_op().returning(|_, _| Ok(100_000));
    ledger.expect_gas_price().returning(|| Ok(EXPENSIVE_GAS_WEI));
    ledger.expect_submit_op().never();

    let iterator = PoolIterator::new(
        Arc::new(ledger),
        Arc::new(MockStore::new()),
        settings(false),
        metrics(),
    );

    assert_eq!(iterator.iterate_pool(3, dec!(2700)).await.unwrap(), None);
}

#[tokio::test]
async fn test_gas_price_failure_names_the_step() {
    let mut ledger = MockChain::new();
    ledger
        .expect_positions()
        .returning(|ids| Ok(ids.iter().map(|id| snapshot(*id, 0, 5, 0)).collect()));
    ledger.expect_probe_op().returning(|_, _| Ok(true));
    ledger.expect_estimate_op().returning(|_, _| Ok(100_000));
    ledger.expect_estimate_batch().returning(|_| Ok(100_000));
    ledger
        .expect_gas_price()
        .returning(|| Err(anyhow::anyhow!("upstream 502")));
    ledger.expect_submit_op().never();
    ledger.expect_submit_batch().never();
    let ledger = Arc::new(ledger);

    let iterator = PoolIterator::new(
        Arc::clone(&ledger),
        Arc::new(MockStore::new()),
        settings(false),
        metrics(),
    );
    let err = iterator.iterate_pool(3, dec!(2700)).await.unwrap_err();
    assert!(format!("{err:#}").starts_with("Gas price read failed"));

    let grinder = BatchGrinder::new(ledger, settings(false), metrics());
    let err = grinder.run(&[3], dec!(2700)).await.unwrap_err();
    assert_eq!(err.to_string(), "Gas price read failed");
    assert!(format!("{err:#}").contains("upstream 502"));
}

#[tokio::test]
async fn test_iterate_account_continues_past_failing_pool() {
    let mut store = MockStore::new();
    store
        .expect_find_by_owner()
        .returning(|_| Ok(Some(intent(1, vec![20, 21]))));

    let mut ledger = MockChain::new();
    ledger.expect_positions().returning(|ids| {
        if ids == [20] {
            Err(anyhow::anyhow!("execution reverted"))
        } else {
            Ok(vec![snapshot(21, 0, 5, 0)])
        }
    });
    ledger.expect_probe_op().returning(|_, _| Ok(true));
    ledger.expect_estimate_op().returning(|_, _| Ok(100_000));
    ledger.expect_gas_price().returning(|| Ok(CHEAP_GAS_WEI));
    ledger
        .expect_submit_op()
        .with(eq(21), always(), always())
        .times(1)
        .returning(|_, _, _| Ok("0x21".to_string()));

    let iterator = PoolIterator::new(Arc::new(ledger), Arc::new(store), settings(false), metrics());
    let result = iterator
        .iterate_account(Address::repeat_byte(0xAB), dec!(2700), 1_700_000_000)
        .await
        .unwrap();

    assert_eq!(
        result,
        AccountIteration::Completed {
            intent_id: 1,
            attempted: 2,
            submitted: vec!["0x21".to_string()],
        }
    );
}

#[tokio::test]
async fn test_iterate_account_unknown_and_expired() {
    let mut store = MockStore::new();
    let known = Address::repeat_byte(0xAB);
    store.expect_find_by_owner().returning(move |owner| {
        if owner == known {
            let mut expired = intent(4, vec![1]);
            expired.expire = 100;
            Ok(Some(expired))
        } else {
            Ok(None)
        }
    });

    let mut ledger = MockChain::new();
    ledger.expect_positions().never();

    let iterator = PoolIterator::new(Arc::new(ledger), Arc::new(store), settings(false), metrics());

    assert_eq!(
        iterator
            .iterate_account(Address::ZERO, dec!(2700), 200)
            .await
            .unwrap(),
        AccountIteration::NoIntent
    );
    assert_eq!(
        iterator.iterate_account(known, dec!(2700), 200).await.unwrap(),
        AccountIteration::Expired {
            intent_id: 4,
            expire: 100
        }
    );
}

// ---- Indexer ----

#[tokio::test]
async fn test_index_all_retries_failed_page_per_id() {
    let mut ledger = MockChain::new();
    ledger.expect_total_intents().returning(|| Ok(3));
    ledger.expect_intents().returning(|ids| {
        if ids.len() > 1 || ids == [1] {
            Err(anyhow::anyhow!("out of gas"))
        } else {
            Ok(ids.iter().map(|id| intent(*id, vec![])).collect())
        }
    });

    let mut store = MockStore::new();
    store
        .expect_replace_all()
        .withf(|intents| intents.iter().map(|i| i.intent_id).collect::<Vec<_>>() == vec![0, 2])
        .times(1)
        .returning(|_| Ok(()));

    let indexer = IntentIndexer::new(Arc::new(ledger), Arc::new(store), 2);
    assert_eq!(indexer.index_all().await, Some(2));
}

#[tokio::test]
async fn test_reindex_requires_cached_record() {
    let mut store = MockStore::new();
    store
        .expect_get()
        .returning(|id| Ok((id == 3).then(|| intent(3, vec![1]))));
    store
        .expect_put()
        .withf(|intent| intent.intent_id == 3 && intent.unspent_grinds == 1)
        .times(1)
        .returning(|_| Ok(()));

    let mut ledger = MockChain::new();
    ledger
        .expect_intents()
        .withf(|ids| ids == [3])
        .times(1)
        .returning(|_| {
            let mut fresh = intent(3, vec![1, 2]);
            fresh.unspent_grinds = 1;
            Ok(vec![fresh])
        });

    let indexer = IntentIndexer::new(Arc::new(ledger), Arc::new(store), 50);
    assert!(!indexer.reindex(9).await);
    assert!(indexer.reindex(3).await);
}

// ---- Price refresher ----

#[tokio::test]
async fn test_price_refresh_failure_keeps_previous_quote() {
    let mut oracle = MockOracle::new();
    let mut seq = Sequence::new();
    oracle
        .expect_native_usd()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Err(anyhow::anyhow!("dns failure")));
    oracle
        .expect_native_usd()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| {
            Ok(PriceQuote {
                usd: dec!(3150.25),
                source: QuoteSource::Live,
            })
        });
    oracle
        .expect_native_usd()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Err(anyhow::anyhow!("timeout")));

    let ctx = context(1);
    let refresher = PriceRefresher::new(
        Arc::new(oracle),
        Arc::clone(&ctx),
        metrics(),
        std::time::Duration::from_secs(60),
    );

    refresher.refresh_once().await;
    let first = ctx.price.latest().await.unwrap();
    assert_eq!(first.usd, dec!(2700));
    assert_eq!(first.source, QuoteSource::Fallback);

    refresher.refresh_once().await;
    refresher.refresh_once().await;
    assert_eq!(ctx.price.current().await.usd, dec!(3150.25));
}

// ---- Long-running loops ----

/// Ledger whose position read takes `read_delay`, for driving the
/// orchestrator loop on a paused clock.
struct SlowChain {
    read_delay: Duration,
    population_reads: AtomicUsize,
    submitted: AtomicBool,
}

impl SlowChain {
    fn new(read_delay: Duration) -> Self {
        Self {
            read_delay,
            population_reads: AtomicUsize::new(0),
            submitted: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl Ledger for SlowChain {
    async fn total_intents(&self) -> anyhow::Result<u64> {
        self.population_reads.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }
    async fn intents(&self, intent_ids: &[IntentId]) -> anyhow::Result<Vec<Intent>> {
        Ok(intent_ids.iter().map(|id| intent(*id, vec![7])).collect())
    }
    async fn positions(&self, pool_ids: &[PoolId]) -> anyhow::Result<Vec<PositionSnapshot>> {
        tokio::time::sleep(self.read_delay).await;
        Ok(pool_ids.iter().map(|id| snapshot(*id, 0, 5, 0)).collect())
    }
    async fn gas_price(&self) -> anyhow::Result<u128> {
        Ok(CHEAP_GAS_WEI)
    }
    async fn probe_op(&self, _: PoolId, _: GrindOp) -> anyhow::Result<bool> {
        Ok(true)
    }
    async fn estimate_op(&self, _: PoolId, _: GrindOp) -> anyhow::Result<u64> {
        Ok(100_000)
    }
    async fn submit_op(&self, _: PoolId, _: GrindOp, _: u64) -> anyhow::Result<TxHash> {
        Ok("0x1".to_string())
    }
    async fn estimate_batch(&self, _: &GrindBatch) -> anyhow::Result<u64> {
        Ok(100_000)
    }
    async fn probe_batch(&self, _: &GrindBatch) -> anyhow::Result<bool> {
        Ok(true)
    }
    async fn submit_batch(&self, _: &GrindBatch, _: u64) -> anyhow::Result<TxHash> {
        self.submitted.store(true, Ordering::SeqCst);
        Ok("0x2".to_string())
    }
    async fn is_healthy(&self) -> bool {
        true
    }
}

fn slow_orchestrator(
    ledger: Arc<SlowChain>,
    store: MockStore,
    source: IntentSource,
    metrics: Arc<MetricsRegistry>,
) -> Arc<GrindOrchestrator<SlowChain, MockStore>> {
    Arc::new(GrindOrchestrator::new(
        Arc::clone(&ledger),
        Arc::new(store),
        BatchGrinder::new(ledger, settings(false), Arc::clone(&metrics)),
        context(1),
        EligibilityPolicy::default(),
        source,
        metrics,
    ))
}

#[tokio::test(start_paused = true)]
async fn test_run_skips_overlaps_and_drains_cycle_on_shutdown() {
    let ledger = Arc::new(SlowChain::new(Duration::from_millis(400)));
    let metrics = metrics();
    let orch = slow_orchestrator(
        Arc::clone(&ledger),
        MockStore::new(),
        IntentSource::Ledger,
        Arc::clone(&metrics),
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let schedule = Schedule {
        cycle: Duration::from_millis(100),
        population: Duration::from_millis(150),
    };
    let handle = tokio::spawn(orch.run(schedule, shutdown_rx));

    // The first cycle is still reading positions at 250ms.
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(!ledger.submitted.load(Ordering::SeqCst));
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();

    assert!(ledger.submitted.load(Ordering::SeqCst));
    assert_eq!(metrics.cycles.with_label_values(&["submitted"]).get(), 1);
    assert!(metrics.cycles.with_label_values(&["skipped"]).get() >= 1);
    // Startup read plus at least one refresh at 150ms.
    assert!(ledger.population_reads.load(Ordering::SeqCst) >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_from_cache_never_reads_registry_size() {
    let ledger = Arc::new(SlowChain::new(Duration::ZERO));
    let mut store = MockStore::new();
    store.expect_len().returning(|| Ok(0));
    let metrics = metrics();
    let orch = slow_orchestrator(
        Arc::clone(&ledger),
        store,
        IntentSource::Cache,
        Arc::clone(&metrics),
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let schedule = Schedule {
        cycle: Duration::from_millis(100),
        population: Duration::from_millis(10),
    };
    let handle = tokio::spawn(orch.run(schedule, shutdown_rx));

    tokio::time::sleep(Duration::from_millis(350)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();

    assert_eq!(ledger.population_reads.load(Ordering::SeqCst), 0);
    assert!(metrics.cycles.with_label_values(&["empty"]).get() >= 3);
}

#[tokio::test(start_paused = true)]
async fn test_price_refresher_runs_on_period_until_shutdown() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut oracle = MockOracle::new();
    oracle.expect_native_usd().returning(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(PriceQuote {
            usd: dec!(2999),
            source: QuoteSource::Live,
        })
    });

    let ctx = context(1);
    let refresher = PriceRefresher::new(
        Arc::new(oracle),
        Arc::clone(&ctx),
        metrics(),
        Duration::from_secs(60),
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(refresher.run(shutdown_rx));

    // Ticks at 0s, 60s and 120s.
    tokio::time::sleep(Duration::from_secs(150)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(ctx.price.current().await.usd, dec!(2999));
}

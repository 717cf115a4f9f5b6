//! Grinder Contract Interactions - Intents, Pools and Batch Executor
//!
//! Implements the `Ledger` port over three contracts: the intents
//! registry, the pools contract (position ladders and single `grindOp`),
//! and the batch executor (`batchGrindOp`). Addresses come from
//! `config.toml` and are checked for deployed code at startup.
//!
//! Dry-runs are `eth_call`s with `from` set to the keeper's address, so
//! the contract sees the same caller it will see on submission.

use std::num::NonZeroU32;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider};
use alloy::sol;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::{debug, info, instrument};

use crate::config::ChainConfig;
use crate::domain::position::narrow_counter;
use crate::domain::{GrindBatch, GrindOp, Intent, IntentId, Ladder, PoolId, PositionSnapshot};
use crate::ports::ledger::{Ledger, TxHash};

use super::provider::ChainProvider;

sol! {
    #[sol(rpc)]
    interface IIntentsNFT {
        struct Intent {
            address owner;
            uint256 expire;
            uint256 grinds;
            uint256 spentGrinds;
            uint256 unspentGrinds;
            uint256[] poolIds;
        }

        function totalIntents() external view returns (uint256);
        function getIntents(uint256[] calldata intentIds) external view returns (Intent[] memory);
    }

    #[sol(rpc)]
    interface IPoolsNFT {
        struct Position {
            uint256 number;
            uint256 numberMax;
            uint256 priceMin;
            uint256 liquidity;
            uint256 qty;
            uint256 price;
            uint256 feeQty;
            uint256 feePrice;
        }

        struct Positions {
            Position long;
            Position hedge;
        }

        function getPositionsBy(uint256[] calldata poolIds) external view returns (Positions[] memory);
        function grindOp(uint256 poolId, uint8 op) external returns (bool);
    }

    #[sol(rpc)]
    interface IGrinderAI {
        function batchGrindOp(uint256[] calldata poolIds, uint8[] calldata ops) external returns (bool);
    }
}

/// Ledger adapter over the grinder contracts.
pub struct GrinderContracts {
    provider: Arc<ChainProvider>,
    intents: IIntentsNFT::IIntentsNFTInstance<DynProvider>,
    pools: IPoolsNFT::IPoolsNFTInstance<DynProvider>,
    grinder: IGrinderAI::IGrinderAIInstance<DynProvider>,
    /// Caller address for dry-runs and estimates.
    from: Address,
    /// Optional client-side RPC throttle.
    limiter: Option<DefaultDirectRateLimiter>,
}

impl GrinderContracts {
    /// Create bindings and validate that each address has deployed code.
    #[instrument(skip_all)]
    pub async fn new(provider: Arc<ChainProvider>, config: &ChainConfig) -> Result<Self> {
        let inner = provider.inner();

        for (name, addr) in [
            ("IntentsNFT", config.intents_nft),
            ("PoolsNFT", config.pools_nft),
            ("GrinderAI", config.grinder_ai),
        ] {
            let code = inner
                .get_code_at(addr)
                .await
                .with_context(|| format!("Failed to query code for {name}"))?;

            if code.is_empty() {
                bail!("Contract {name} at {addr} has no deployed code, check config.toml");
            }

            info!(contract = name, address = %addr, "Validated on-chain");
        }

        let limiter = config
            .requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self {
            from: provider.signer_address(),
            intents: IIntentsNFT::new(config.intents_nft, inner.clone()),
            pools: IPoolsNFT::new(config.pools_nft, inner.clone()),
            grinder: IGrinderAI::new(config.grinder_ai, inner),
            provider,
            limiter,
        })
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

fn to_u256(ids: &[u64]) -> Vec<U256> {
    ids.iter().map(|id| U256::from(*id)).collect()
}

fn decode_ladder(raw: &IPoolsNFT::Position) -> Ladder {
    Ladder {
        number: narrow_counter(raw.number),
        number_max: narrow_counter(raw.numberMax),
        price_min: raw.priceMin,
        liquidity: raw.liquidity,
        qty: raw.qty,
        price: raw.price,
        fee_qty: raw.feeQty,
        fee_price: raw.feePrice,
    }
}

fn decode_intent(intent_id: IntentId, raw: &IIntentsNFT::Intent) -> Intent {
    Intent {
        intent_id,
        owner: raw.owner,
        pool_ids: raw.poolIds.iter().map(|id| id.saturating_to::<u64>()).collect(),
        expire: raw.expire.saturating_to::<u64>(),
        grinds: raw.grinds.saturating_to::<u64>(),
        spent_grinds: raw.spentGrinds.saturating_to::<u64>(),
        unspent_grinds: raw.unspentGrinds.saturating_to::<u64>(),
    }
}

/// A revert during a dry-run is the contract saying "no", not a failure.
fn reverted(err: &alloy::contract::Error) -> bool {
    err.as_revert_data().is_some()
}

#[async_trait]
impl Ledger for GrinderContracts {
    #[instrument(skip(self))]
    async fn total_intents(&self) -> Result<u64> {
        self.throttle().await;
        let total = self
            .intents
            .totalIntents()
            .call()
            .await
            .context("totalIntents call failed")?;
        Ok(total.saturating_to::<u64>())
    }

    #[instrument(skip(self), fields(count = intent_ids.len()))]
    async fn intents(&self, intent_ids: &[IntentId]) -> Result<Vec<Intent>> {
        self.throttle().await;
        let raw = self
            .intents
            .getIntents(to_u256(intent_ids))
            .call()
            .await
            .context("getIntents call failed")?;

        anyhow::ensure!(
            raw.len() == intent_ids.len(),
            "getIntents returned {} records for {} ids",
            raw.len(),
            intent_ids.len()
        );

        Ok(intent_ids
            .iter()
            .zip(raw.iter())
            .map(|(id, intent)| decode_intent(*id, intent))
            .collect())
    }

    #[instrument(skip(self), fields(count = pool_ids.len()))]
    async fn positions(&self, pool_ids: &[PoolId]) -> Result<Vec<PositionSnapshot>> {
        self.throttle().await;
        let raw = self
            .pools
            .getPositionsBy(to_u256(pool_ids))
            .call()
            .await
            .context("getPositionsBy call failed")?;

        anyhow::ensure!(
            raw.len() == pool_ids.len(),
            "getPositionsBy returned {} records for {} pools",
            raw.len(),
            pool_ids.len()
        );

        Ok(pool_ids
            .iter()
            .zip(raw.iter())
            .map(|(pool_id, pair)| PositionSnapshot {
                pool_id: *pool_id,
                long: decode_ladder(&pair.long),
                hedge: decode_ladder(&pair.hedge),
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn gas_price(&self) -> Result<u128> {
        self.throttle().await;
        let price = self
            .provider
            .inner()
            .get_gas_price()
            .await
            .context("Failed to query gas price")?;
        debug!(gas_price_wei = price, "Gas price fetched");
        Ok(price)
    }

    #[instrument(skip(self))]
    async fn probe_op(&self, pool_id: PoolId, op: GrindOp) -> Result<bool> {
        self.throttle().await;
        match self
            .pools
            .grindOp(U256::from(pool_id), op.code())
            .from(self.from)
            .call()
            .await
        {
            Ok(ok) => Ok(ok),
            Err(e) if reverted(&e) => Ok(false),
            Err(e) => Err(e).context("grindOp dry-run failed"),
        }
    }

    #[instrument(skip(self))]
    async fn estimate_op(&self, pool_id: PoolId, op: GrindOp) -> Result<u64> {
        self.throttle().await;
        self.pools
            .grindOp(U256::from(pool_id), op.code())
            .from(self.from)
            .estimate_gas()
            .await
            .context("grindOp gas estimate failed")
    }

    #[instrument(skip(self))]
    async fn submit_op(&self, pool_id: PoolId, op: GrindOp, gas_limit: u64) -> Result<TxHash> {
        self.throttle().await;
        let pending = self
            .pools
            .grindOp(U256::from(pool_id), op.code())
            .from(self.from)
            .gas(gas_limit)
            .send()
            .await
            .context("grindOp submission failed")?;
        Ok(format!("{:?}", pending.tx_hash()))
    }

    #[instrument(skip(self, batch), fields(batch_size = batch.len()))]
    async fn estimate_batch(&self, batch: &GrindBatch) -> Result<u64> {
        self.throttle().await;
        self.grinder
            .batchGrindOp(to_u256(batch.pool_ids()), batch.op_codes())
            .from(self.from)
            .estimate_gas()
            .await
            .context("batchGrindOp gas estimate failed")
    }

    #[instrument(skip(self, batch), fields(batch_size = batch.len()))]
    async fn probe_batch(&self, batch: &GrindBatch) -> Result<bool> {
        self.throttle().await;
        match self
            .grinder
            .batchGrindOp(to_u256(batch.pool_ids()), batch.op_codes())
            .from(self.from)
            .call()
            .await
        {
            Ok(ok) => Ok(ok),
            Err(e) if reverted(&e) => Ok(false),
            Err(e) => Err(e).context("batchGrindOp dry-run failed"),
        }
    }

    #[instrument(skip(self, batch), fields(batch_size = batch.len()))]
    async fn submit_batch(&self, batch: &GrindBatch, gas_limit: u64) -> Result<TxHash> {
        self.throttle().await;
        let pending = self
            .grinder
            .batchGrindOp(to_u256(batch.pool_ids()), batch.op_codes())
            .from(self.from)
            .gas(gas_limit)
            .send()
            .await
            .context("batchGrindOp submission failed")?;
        Ok(format!("{:?}", pending.tx_hash()))
    }

    async fn is_healthy(&self) -> bool {
        self.provider.is_healthy().await
    }
}

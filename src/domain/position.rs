//! Position snapshots read from the pools contract.
//!
//! A position is a pair of ladders (long and hedge). Only the rung
//! counters drive operation selection; the remaining fields are kept in
//! their native 256-bit form for logging.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// Pool (position) identifier.
pub type PoolId = u64;

/// One side of a position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ladder {
    /// Rungs currently filled.
    pub number: u32,
    /// Rung ceiling.
    pub number_max: u32,
    pub price_min: U256,
    pub liquidity: U256,
    pub qty: U256,
    pub price: U256,
    pub fee_qty: U256,
    pub fee_price: U256,
}

impl Ladder {
    /// Ladder with only the rung counters set.
    pub fn with_counts(number: u32, number_max: u32) -> Self {
        Self {
            number,
            number_max,
            ..Self::default()
        }
    }

    /// Whether every rung is filled.
    pub const fn is_full(&self) -> bool {
        self.number >= self.number_max
    }
}

/// Decoded state of one position at the start of a cycle.
///
/// Never cached across cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    pub pool_id: PoolId,
    pub long: Ladder,
    pub hedge: Ladder,
}

/// Narrow a 256-bit rung counter to `u32`, saturating.
pub fn narrow_counter(value: U256) -> u32 {
    value.saturating_to::<u32>()
}

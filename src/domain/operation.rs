//! Grind operations and the per-position selection rules.
//!
//! The selector is pure: it maps a ladder snapshot to a priority-ordered
//! list of one or two operations. The caller probes them in order and
//! accepts the first that the remote contract reports as executable, so a
//! position contributes at most one operation per cycle.

use serde::{Deserialize, Serialize};

use super::position::PositionSnapshot;

/// Maintenance operation understood by the pools contract.
///
/// Discriminants are the `uint8` codes passed on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum GrindOp {
    LongBuy = 0,
    LongSell = 1,
    HedgeSell = 2,
    HedgeRebuy = 3,
}

impl GrindOp {
    /// On-chain operation code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Label used in logs and metrics.
    pub const fn label(self) -> &'static str {
        match self {
            Self::LongBuy => "LONG_BUY",
            Self::LongSell => "LONG_SELL",
            Self::HedgeSell => "HEDGE_SELL",
            Self::HedgeRebuy => "HEDGE_REBUY",
        }
    }
}

impl std::fmt::Display for GrindOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What to try when the long ladder is partially filled.
///
/// Deployments have historically disagreed on this branch, so it is an
/// explicit operator choice with no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialLadderPolicy {
    /// Only `LONG_SELL` is proposed.
    SellOnly,
    /// `LONG_SELL`, then `LONG_BUY` if the sell does not probe valid.
    SellThenBuy,
}

const LONG_BUY_ONLY: &[GrindOp] = &[GrindOp::LongBuy];
const LONG_SELL_ONLY: &[GrindOp] = &[GrindOp::LongSell];
const LONG_SELL_THEN_BUY: &[GrindOp] = &[GrindOp::LongSell, GrindOp::LongBuy];
const LONG_SELL_THEN_HEDGE_SELL: &[GrindOp] = &[GrindOp::LongSell, GrindOp::HedgeSell];
const HEDGE_REBUY_THEN_SELL: &[GrindOp] = &[GrindOp::HedgeRebuy, GrindOp::HedgeSell];

/// Deterministic operation selector.
#[derive(Debug, Clone, Copy)]
pub struct OperationSelector {
    policy: PartialLadderPolicy,
}

impl OperationSelector {
    pub const fn new(policy: PartialLadderPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> PartialLadderPolicy {
        self.policy
    }

    /// Priority-ordered operations to probe for `position`.
    ///
    /// First matching branch wins:
    /// 1. empty long ladder → `[LONG_BUY]`
    /// 2. partial long ladder → `[LONG_SELL]` or `[LONG_SELL, LONG_BUY]`
    /// 3. full long ladder, empty hedge → `[LONG_SELL, HEDGE_SELL]`
    /// 4. full long ladder, hedged → `[HEDGE_REBUY, HEDGE_SELL]`
    pub const fn candidates(&self, position: &PositionSnapshot) -> &'static [GrindOp] {
        if position.long.number == 0 {
            LONG_BUY_ONLY
        } else if position.long.number < position.long.number_max {
            match self.policy {
                PartialLadderPolicy::SellOnly => LONG_SELL_ONLY,
                PartialLadderPolicy::SellThenBuy => LONG_SELL_THEN_BUY,
            }
        } else if position.hedge.number == 0 {
            LONG_SELL_THEN_HEDGE_SELL
        } else {
            HEDGE_REBUY_THEN_SELL
        }
    }
}

//! Gas cost gate.
//!
//! Converts a gas estimate and gas price into a USD cost and compares it
//! against a budget that scales with batch size. All arithmetic is exact:
//! `gas * gas_price` is computed in `U256`, scaled by 10^18 into a
//! `Decimal`, then multiplied by the native/USD price. Floating point is
//! only used by callers for display.

use alloy::primitives::U256;
use rust_decimal::Decimal;

/// Decimals of the native unit (wei → ether).
pub const NATIVE_DECIMALS: u32 = 18;

/// Safety factor applied to a gas estimate to derive the gas limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasMultiplier {
    pub numerator: u64,
    pub denominator: u64,
}

impl GasMultiplier {
    /// ×1.4
    pub const DEFAULT: Self = Self {
        numerator: 14,
        denominator: 10,
    };

    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// `estimate * numerator / denominator`, floored, saturating at `u64::MAX`.
    pub fn apply(&self, estimate: u64) -> u64 {
        let scaled = u128::from(estimate) * u128::from(self.numerator)
            / u128::from(self.denominator.max(1));
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }
}

impl Default for GasMultiplier {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Outcome of a cost check, kept for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostAssessment {
    /// `gas_estimate * gas_price` in wei.
    pub cost_wei: U256,
    /// USD cost, `None` if it does not fit a `Decimal`.
    pub cost_usd: Option<Decimal>,
    pub budget_usd: Decimal,
    pub affordable: bool,
}

/// Total native cost in wei. Cannot overflow: 64 + 128 bits < 256.
pub fn cost_wei(gas_estimate: u64, gas_price_wei: u128) -> U256 {
    U256::from(gas_estimate) * U256::from(gas_price_wei)
}

/// Exact wei → native conversion; `None` beyond `Decimal`'s 96-bit mantissa.
pub fn wei_to_native(wei: U256) -> Option<Decimal> {
    let raw = u128::try_from(wei).ok()?;
    let raw = i128::try_from(raw).ok()?;
    Decimal::try_from_i128_with_scale(raw, NATIVE_DECIMALS).ok()
}

/// USD cost of a transaction.
pub fn cost_usd(gas_estimate: u64, gas_price_wei: u128, native_usd: Decimal) -> Option<Decimal> {
    wei_to_native(cost_wei(gas_estimate, gas_price_wei))?.checked_mul(native_usd)
}

/// Strictly-less-than budget check. Unrepresentable costs are rejected.
pub fn is_affordable(
    gas_estimate: u64,
    gas_price_wei: u128,
    native_usd: Decimal,
    budget_usd: Decimal,
) -> bool {
    cost_usd(gas_estimate, gas_price_wei, native_usd).is_some_and(|cost| cost < budget_usd)
}

/// Per-batch budget gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostGate {
    per_op_budget_usd: Decimal,
}

impl CostGate {
    pub const fn new(per_op_budget_usd: Decimal) -> Self {
        Self { per_op_budget_usd }
    }

    pub const fn per_op_budget(&self) -> Decimal {
        self.per_op_budget_usd
    }

    /// Budget for a batch of `batch_size` operations.
    pub fn budget_for(&self, batch_size: usize) -> Decimal {
        self.per_op_budget_usd
            .checked_mul(Decimal::from(batch_size))
            .unwrap_or(Decimal::MAX)
    }

    pub fn assess(
        &self,
        gas_estimate: u64,
        gas_price_wei: u128,
        native_usd: Decimal,
        batch_size: usize,
    ) -> CostAssessment {
        let budget_usd = self.budget_for(batch_size);
        let cost_usd = cost_usd(gas_estimate, gas_price_wei, native_usd);
        CostAssessment {
            cost_wei: cost_wei(gas_estimate, gas_price_wei),
            cost_usd,
            budget_usd,
            affordable: cost_usd.is_some_and(|cost| cost < budget_usd),
        }
    }
}

//! Owner intents and the eligibility predicate.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::position::PoolId;

/// Intent identifier (token id in the intents registry).
pub type IntentId = u64;

/// An owner's registration of a set of positions.
///
/// Written only by the remote registry; mirrored read-only into the
/// local intent store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub intent_id: IntentId,
    pub owner: Address,
    pub pool_ids: Vec<PoolId>,
    /// Unix seconds; `0` never expires.
    #[serde(default)]
    pub expire: u64,
    #[serde(default)]
    pub grinds: u64,
    #[serde(default)]
    pub spent_grinds: u64,
    #[serde(default)]
    pub unspent_grinds: u64,
}

impl Intent {
    /// Whether the intent has a non-zero expiry in the past.
    pub const fn is_expired(&self, now_secs: u64) -> bool {
        self.expire != 0 && self.expire < now_secs
    }
}

/// Why an intent was excluded from a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Ineligible {
    #[error("intent expired at {0}")]
    Expired(u64),
    #[error("intent has no unspent grinds")]
    NoUnspentGrinds,
}

/// Configurable eligibility gate.
///
/// Whether a drained grind allowance is permanent or replenished
/// externally is deployment-specific, hence both checks are switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EligibilityPolicy {
    /// Skip intents with `unspent_grinds == 0`.
    #[serde(default = "default_true")]
    pub require_unspent_grinds: bool,
    /// Skip intents whose non-zero `expire` is in the past.
    #[serde(default = "default_true")]
    pub enforce_expiry: bool,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            require_unspent_grinds: true,
            enforce_expiry: true,
        }
    }
}

impl EligibilityPolicy {
    /// Policy that excludes nothing.
    pub const fn permissive() -> Self {
        Self {
            require_unspent_grinds: false,
            enforce_expiry: false,
        }
    }

    pub fn check(&self, intent: &Intent, now_secs: u64) -> Result<(), Ineligible> {
        if self.enforce_expiry && intent.is_expired(now_secs) {
            return Err(Ineligible::Expired(intent.expire));
        }
        if self.require_unspent_grinds && intent.unspent_grinds == 0 {
            return Err(Ineligible::NoUnspentGrinds);
        }
        Ok(())
    }
}

const fn default_true() -> bool {
    true
}

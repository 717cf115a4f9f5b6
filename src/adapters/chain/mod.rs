//! Chain Adapters - On-chain Interaction Layer
//!
//! Provides on-chain access via alloy-rs for:
//! - RPC provider and signer management
//! - Intents registry reads, position reads, dry-runs, gas estimates
//!   and batch submission (`Ledger` port)

pub mod contracts;
pub mod provider;

pub use contracts::GrinderContracts;
pub use provider::{signer_from_env, ChainProvider};

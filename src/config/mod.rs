//! Configuration Module - TOML-based Keeper Configuration
//!
//! Loads and validates configuration from `config.toml` with
//! environment variable overrides via `.env` files.
//! Contract addresses, budgets and the selection policy are
//! externalized here - nothing is hardcoded in the domain layer.
//! The signing key is never part of this file (`GRINDER_PRIVATE_KEY`).

pub mod loader;

use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{EligibilityPolicy, GasMultiplier, PartialLadderPolicy};

/// Top-level keeper configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Bot identity and metadata.
  pub bot: BotConfig,
  /// RPC endpoint and contract addresses.
  pub chain: ChainConfig,
  /// Grind cycle parameters.
  pub grind: GrindConfig,
  /// Intent eligibility gate.
  #[serde(default)]
  pub eligibility: EligibilityPolicy,
  /// Native/USD price oracle.
  pub price: PriceConfig,
  /// HTTP control surface.
  #[serde(default)]
  pub server: ServerConfig,
  /// Local intent index.
  #[serde(default)]
  pub persistence: PersistenceConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
  /// Human-readable bot name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Run the full cycle but never send transactions.
  #[serde(default)]
  pub dry_run: bool,
}

/// Chain connectivity and contract addresses.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
  /// JSON-RPC endpoint (overridable with `RPC_URL`).
  pub rpc_url: String,
  /// Expected chain id, checked at startup when set.
  pub chain_id: Option<u64>,
  /// Intents registry (overridable with `INTENTS_NFT_ADDRESS`).
  pub intents_nft: Address,
  /// Pools contract (overridable with `POOLS_NFT_ADDRESS`).
  pub pools_nft: Address,
  /// Batch executor (overridable with `GRINDER_AI_ADDRESS`).
  pub grinder_ai: Address,
  /// Client-side RPC throttle; unlimited when unset.
  pub requests_per_second: Option<u32>,
}

/// Where the cursor walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
  /// On-chain intent ids `0..totalIntents`.
  Ledger,
  /// Records of the local intent index.
  Cache,
}

/// Grind cycle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GrindConfig {
  /// Seconds between grind ticks.
  #[serde(default = "default_sixty")]
  pub interval_secs: u64,
  /// Intents visited per cycle (cursor stride).
  #[serde(default = "default_intents_per_grind")]
  pub intents_per_grind: u64,
  /// USD budget per operation; a batch of n gets n times this.
  pub per_op_budget_usd: Decimal,
  /// Gas limit safety factor numerator.
  #[serde(default = "default_gas_numerator")]
  pub gas_multiplier_numerator: u64,
  /// Gas limit safety factor denominator.
  #[serde(default = "default_gas_denominator")]
  pub gas_multiplier_denominator: u64,
  /// Behavior on a partially filled long ladder. Required.
  pub partial_ladder_policy: PartialLadderPolicy,
  /// Population the cursor walks.
  #[serde(default = "default_intent_source")]
  pub intent_source: IntentSource,
  /// Seconds between population-size refreshes (ledger source).
  #[serde(default = "default_population_refresh")]
  pub population_refresh_secs: u64,
}

impl GrindConfig {
  pub const fn gas_multiplier(&self) -> GasMultiplier {
    GasMultiplier::new(self.gas_multiplier_numerator, self.gas_multiplier_denominator)
  }
}

/// Price oracle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceConfig {
  /// Simple-price endpoint.
  #[serde(default = "default_price_url")]
  pub url: String,
  /// Asset id in the quote response (`ethereum`).
  #[serde(default = "default_asset_id")]
  pub asset_id: String,
  /// Quote used on non-200 responses and before the first live quote.
  pub fallback_usd: Decimal,
  /// Seconds between refreshes.
  #[serde(default = "default_sixty")]
  pub refresh_secs: u64,
  /// Request timeout in milliseconds.
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Quotes older than this are used but logged as stale.
  #[serde(default = "default_max_age")]
  pub max_age_secs: u64,
}

/// HTTP control surface configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Bind address (port overridable with `PORT`).
  #[serde(default = "default_bind_address")]
  pub bind_address: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind_address: default_bind_address(),
    }
  }
}

/// Intent index configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory holding `intents.json`.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
  /// Intent ids per registry read while indexing.
  #[serde(default = "default_index_batch")]
  pub index_batch_size: usize,
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
      index_batch_size: default_index_batch(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

const fn default_sixty() -> u64 {
  60
}

const fn default_intents_per_grind() -> u64 {
  1
}

const fn default_gas_numerator() -> u64 {
  14
}

const fn default_gas_denominator() -> u64 {
  10
}

const fn default_intent_source() -> IntentSource {
  IntentSource::Ledger
}

const fn default_population_refresh() -> u64 {
  600
}

fn default_price_url() -> String {
  "https://api.coingecko.com/api/v3/simple/price?ids=ethereum&vs_currencies=usd".to_string()
}

fn default_asset_id() -> String {
  "ethereum".to_string()
}

const fn default_timeout_ms() -> u64 {
  5_000
}

const fn default_max_age() -> u64 {
  300
}

fn default_bind_address() -> String {
  "0.0.0.0:3000".to_string()
}

fn default_data_dir() -> String {
  "data".to_string()
}

const fn default_index_batch() -> usize {
  50
}

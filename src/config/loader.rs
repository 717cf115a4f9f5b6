//! Configuration Loader - File Loading, Env Overrides and Validation
//!
//! Handles loading `config.toml`, applying the deployment environment
//! overrides, validating all parameters, and providing clear error
//! messages for misconfiguration.

use std::path::Path;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use super::AppConfig;

/// Load, override and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - An environment override is malformed
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let mut config = parse_config(&content)?;
  apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
  validate_config(&config)?;

  info!(
    intents_per_grind = config.grind.intents_per_grind,
    per_op_budget_usd = %config.grind.per_op_budget_usd,
    policy = ?config.grind.partial_ladder_policy,
    source = ?config.grind.intent_source,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse configuration text without touching the environment.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  toml::from_str(content).context("Failed to parse config.toml")
}

/// Apply the environment overrides the deployment uses.
///
/// `lookup` is injected so tests don't mutate the process environment.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
  F: Fn(&str) -> Option<String>,
{
  let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

  if let Some(url) = var("RPC_URL") {
    config.chain.rpc_url = url;
  }

  for (key, slot) in [
    ("INTENTS_NFT_ADDRESS", &mut config.chain.intents_nft),
    ("POOLS_NFT_ADDRESS", &mut config.chain.pools_nft),
    ("GRINDER_AI_ADDRESS", &mut config.chain.grinder_ai),
  ] {
    if let Some(raw) = var(key) {
      *slot = raw
        .trim()
        .parse::<Address>()
        .with_context(|| format!("Invalid address in {key}: {raw}"))?;
    }
  }

  if let Some(port) = var("PORT") {
    let port: u16 = port
      .trim()
      .parse()
      .with_context(|| format!("Invalid PORT: {port}"))?;
    let host = config
      .server
      .bind_address
      .rsplit_once(':')
      .map_or("0.0.0.0", |(host, _)| host);
    config.server.bind_address = format!("{host}:{port}");
  }

  Ok(())
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  // Chain validation
  anyhow::ensure!(
    !config.chain.rpc_url.is_empty(),
    "RPC URL must not be empty"
  );
  for (name, addr) in [
    ("intents_nft", config.chain.intents_nft),
    ("pools_nft", config.chain.pools_nft),
    ("grinder_ai", config.chain.grinder_ai),
  ] {
    anyhow::ensure!(addr != Address::ZERO, "chain.{name} must not be the zero address");
  }
  if let Some(rps) = config.chain.requests_per_second {
    anyhow::ensure!(rps > 0, "chain.requests_per_second must be positive");
  }

  // Grind validation
  anyhow::ensure!(
    config.grind.interval_secs > 0,
    "grind.interval_secs must be positive"
  );
  anyhow::ensure!(
    config.grind.intents_per_grind > 0,
    "grind.intents_per_grind must be positive"
  );
  anyhow::ensure!(
    config.grind.per_op_budget_usd > Decimal::ZERO,
    "grind.per_op_budget_usd must be positive, got {}",
    config.grind.per_op_budget_usd
  );
  anyhow::ensure!(
    config.grind.gas_multiplier_denominator > 0,
    "grind.gas_multiplier_denominator must be positive"
  );
  anyhow::ensure!(
    config.grind.gas_multiplier_numerator >= config.grind.gas_multiplier_denominator,
    "gas multiplier must be >= 1, got {}/{}",
    config.grind.gas_multiplier_numerator,
    config.grind.gas_multiplier_denominator
  );
  anyhow::ensure!(
    config.grind.population_refresh_secs > 0,
    "grind.population_refresh_secs must be positive"
  );

  // Price validation
  anyhow::ensure!(!config.price.url.is_empty(), "price.url must not be empty");
  anyhow::ensure!(
    config.price.fallback_usd > Decimal::ZERO,
    "price.fallback_usd must be positive"
  );
  anyhow::ensure!(
    config.price.refresh_secs > 0,
    "price.refresh_secs must be positive"
  );

  anyhow::ensure!(
    config.persistence.index_batch_size > 0,
    "persistence.index_batch_size must be positive"
  );

  Ok(())
}

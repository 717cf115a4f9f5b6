//! RPC Provider - alloy-rs Connection and Signer Management
//!
//! Builds one signing provider for all contract bindings. The provider is
//! type-erased to `DynProvider` so the nested filler types of
//! `ProviderBuilder` don't leak into the adapter layer.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::config::ChainConfig;

/// Load the keeper's signing key from `GRINDER_PRIVATE_KEY`.
///
/// The key MUST come from the environment (`.env`, never committed).
pub fn signer_from_env() -> Result<PrivateKeySigner> {
    let key = std::env::var("GRINDER_PRIVATE_KEY").context("GRINDER_PRIVATE_KEY not set")?;
    key.trim()
        .parse::<PrivateKeySigner>()
        .context("GRINDER_PRIVATE_KEY is not a valid private key")
}

/// Shared signing RPC provider.
pub struct ChainProvider {
    provider: DynProvider,
    signer_address: Address,
}

impl ChainProvider {
    /// Connect to the RPC endpoint and validate the chain id if configured.
    #[instrument(skip_all)]
    pub async fn connect(config: &ChainConfig, signer: PrivateKeySigner) -> Result<Self> {
        let signer_address = signer.address();
        let url: Url = config.rpc_url.parse().context("Invalid RPC URL")?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        let chain_id = provider
            .get_chain_id()
            .await
            .context("Failed to query chain ID")?;

        if let Some(expected) = config.chain_id {
            anyhow::ensure!(
                chain_id == expected,
                "Expected chain_id={expected}, RPC reports {chain_id}"
            );
        }

        info!(chain_id, signer = %signer_address, "Connected to RPC");

        Ok(Self {
            provider,
            signer_address,
        })
    }

    /// Cloneable handle to the erased provider.
    pub fn inner(&self) -> DynProvider {
        self.provider.clone()
    }

    /// Address that signs submissions and is used as `from` for dry-runs.
    pub const fn signer_address(&self) -> Address {
        self.signer_address
    }

    /// Check if the RPC connection is healthy via a lightweight call.
    pub async fn is_healthy(&self) -> bool {
        self.provider.get_block_number().await.is_ok()
    }
}

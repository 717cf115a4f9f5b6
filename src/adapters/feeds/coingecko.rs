//! CoinGecko Quote Feed - Native/USD Price over HTTP
//!
//! One GET against the simple-price endpoint per refresh. A non-200
//! answer yields the configured fallback quote; transport and decode
//! errors are returned so the caller can keep its previous quote.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use crate::config::PriceConfig;
use crate::ports::price_feed::{PriceOracle, PriceQuote, QuoteSource};

/// `{"ethereum": {"usd": 2712.34}}`
type SimplePriceResponse = HashMap<String, HashMap<String, serde_json::Number>>;

/// HTTP price oracle with a constant fallback.
pub struct CoinGeckoFeed {
    http: Client,
    url: String,
    asset_id: String,
    fallback_usd: Decimal,
}

impl CoinGeckoFeed {
    pub fn new(config: &PriceConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            url: config.url.clone(),
            asset_id: config.asset_id.clone(),
            fallback_usd: config.fallback_usd,
        })
    }

    fn fallback(&self) -> PriceQuote {
        PriceQuote {
            usd: self.fallback_usd,
            source: QuoteSource::Fallback,
        }
    }
}

/// Extract the USD quote for `asset_id` from a simple-price body.
pub fn parse_simple_price(body: &str, asset_id: &str) -> Result<Decimal> {
    let parsed: SimplePriceResponse =
        serde_json::from_str(body).context("Invalid simple-price JSON")?;

    let raw = parsed
        .get(asset_id)
        .and_then(|quotes| quotes.get("usd"))
        .with_context(|| format!("No usd quote for {asset_id}"))?;

    // Through the decimal text, not f64, to keep the quoted digits.
    let usd: Decimal = raw
        .to_string()
        .parse()
        .with_context(|| format!("Unparseable quote: {raw}"))?;

    anyhow::ensure!(usd > Decimal::ZERO, "Non-positive quote: {usd}");
    Ok(usd)
}

#[async_trait]
impl PriceOracle for CoinGeckoFeed {
    #[instrument(skip(self), fields(asset = %self.asset_id))]
    async fn native_usd(&self) -> Result<PriceQuote> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("Price request failed")?;

        if response.status() != StatusCode::OK {
            warn!(
                status = %response.status(),
                fallback = %self.fallback_usd,
                "Price service returned non-200, using fallback"
            );
            return Ok(self.fallback());
        }

        let body = response.text().await.context("Failed to read price body")?;
        let usd = parse_simple_price(&body, &self.asset_id)?;
        debug!(usd = %usd, "Live quote fetched");

        Ok(PriceQuote {
            usd,
            source: QuoteSource::Live,
        })
    }
}

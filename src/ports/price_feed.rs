//! Price Feed Port - Native/USD Quote Source

use async_trait::async_trait;
use rust_decimal::Decimal;

/// Where a quote came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
  /// Live response from the quote service.
  Live,
  /// Configured constant used because the service answered non-200
  /// or no live quote was ever obtained.
  Fallback,
}

/// A USD-per-native-unit quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
  pub usd: Decimal,
  pub source: QuoteSource,
}

/// External price oracle.
///
/// Implementations return `Ok` with a fallback quote when the service
/// answers with a non-success status, and `Err` only on transport or
/// decoding failures.
#[async_trait]
pub trait PriceOracle: Send + Sync + 'static {
  async fn native_usd(&self) -> anyhow::Result<PriceQuote>;
}

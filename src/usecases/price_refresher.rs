//! Price Refresher - Periodic Native/USD Quote Update
//!
//! A failed refresh keeps the previous quote. If no quote was ever
//! obtained the fallback constant is stored so `/ethprice` has a value.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, instrument};

use crate::adapters::metrics::MetricsRegistry;
use crate::ports::price_feed::PriceOracle;

use super::context::GrindContext;

pub struct PriceRefresher<P: PriceOracle> {
  oracle: Arc<P>,
  context: Arc<GrindContext>,
  metrics: Arc<MetricsRegistry>,
  period: Duration,
}

impl<P: PriceOracle> PriceRefresher<P> {
  pub fn new(
    oracle: Arc<P>,
    context: Arc<GrindContext>,
    metrics: Arc<MetricsRegistry>,
    period: Duration,
  ) -> Self {
    Self {
      oracle,
      context,
      metrics,
      period,
    }
  }

  /// Fetch once and store the result in the context.
  #[instrument(skip(self))]
  pub async fn refresh_once(&self) {
    let quote = match self.oracle.native_usd().await {
      Ok(quote) => quote,
      Err(e) => {
        error!(error = format!("{e:#}"), "Price refresh failed");
        if self.context.price.latest().await.is_some() {
          return;
        }
        self.context.price.fallback()
      }
    };

    if let Some(usd) = quote.usd.to_f64() {
      self.metrics.native_price_usd.set(usd);
    }
    self.context.price.store(quote).await;
  }

  /// Refresh on every tick until shutdown. The first tick fires immediately.
  pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
    let mut ticker = interval(self.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Price refresher received shutdown signal");
          break;
        }
        _ = ticker.tick() => self.refresh_once().await,
      }
    }
  }
}

//! Grind Context - Process-wide State Shared Across Ticks
//!
//! Holds the native/USD quote, the cached population size and the
//! cursor. Each value has one writer per tick:
//! - price: the price refresher
//! - population: the population refresher (or the cycle itself)
//! - cursor: whichever cycle holds the single-flight guard

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::warn;

use crate::domain::Cursor;
use crate::ports::price_feed::{PriceQuote, QuoteSource};

#[derive(Debug, Clone, Copy)]
struct StampedQuote {
  quote: PriceQuote,
  fetched_at: Instant,
}

/// Last known native/USD quote with staleness rules.
///
/// A quote older than `max_age` is still served, with a warning.
/// Before the first successful refresh the fallback constant is served.
pub struct PriceCell {
  fallback_usd: Decimal,
  max_age: Duration,
  latest: RwLock<Option<StampedQuote>>,
}

impl PriceCell {
  pub fn new(fallback_usd: Decimal, max_age: Duration) -> Self {
    Self {
      fallback_usd,
      max_age,
      latest: RwLock::new(None),
    }
  }

  pub async fn store(&self, quote: PriceQuote) {
    *self.latest.write().await = Some(StampedQuote {
      quote,
      fetched_at: Instant::now(),
    });
  }

  /// Whatever was last stored, `None` before the first refresh.
  pub async fn latest(&self) -> Option<PriceQuote> {
    self.latest.read().await.map(|s| s.quote)
  }

  pub const fn fallback(&self) -> PriceQuote {
    PriceQuote {
      usd: self.fallback_usd,
      source: QuoteSource::Fallback,
    }
  }

  /// Quote to price a batch with.
  pub async fn current(&self) -> PriceQuote {
    match *self.latest.read().await {
      Some(stamped) => {
        let age = stamped.fetched_at.elapsed();
        if age > self.max_age {
          warn!(
            age_secs = age.as_secs(),
            usd = %stamped.quote.usd,
            "Native price is stale, using it anyway"
          );
        }
        stamped.quote
      }
      None => self.fallback(),
    }
  }
}

/// Explicit context object passed through the orchestrator.
pub struct GrindContext {
  pub price: PriceCell,
  population: AtomicU64,
  cursor: Mutex<Cursor>,
}

impl GrindContext {
  pub fn new(price: PriceCell, stride: u64) -> Self {
    Self {
      price,
      population: AtomicU64::new(0),
      cursor: Mutex::new(Cursor::new(stride)),
    }
  }

  /// Last known population size (possibly stale).
  pub fn population(&self) -> u64 {
    self.population.load(Ordering::Relaxed)
  }

  pub fn set_population(&self, population: u64) {
    self.population.store(population, Ordering::Relaxed);
  }

  /// Single-flight guard: the cursor, or `None` if a cycle is in progress.
  pub fn try_begin_cycle(&self) -> Option<MutexGuard<'_, Cursor>> {
    self.cursor.try_lock().ok()
  }

  /// Snapshot of the cursor, waiting for any in-flight cycle.
  pub async fn cursor(&self) -> Cursor {
    *self.cursor.lock().await
  }
}

//! Price Feed Adapters
//!
//! Native/USD quote source used by the cost gate.

pub mod coingecko;

pub use coingecko::CoinGeckoFeed;

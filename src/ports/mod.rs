//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `Ledger`: intent registry, position reads, probes, gas, submission
//! - `PriceOracle`: native/USD quote
//! - `IntentStore`: local index of intent records

pub mod intent_store;
pub mod ledger;
pub mod price_feed;

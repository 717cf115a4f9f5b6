//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the keeper's workflows. Each use case is a self-contained
//! business operation.
//!
//! Use cases:
//! - `BatchGrinder`: select, probe, cost-gate and submit one batch
//! - `GrindOrchestrator`: clock-driven round-robin over the intents
//! - `PoolIterator`: manual single-position and per-account iteration
//! - `IntentIndexer`: mirror the intent registry into the local store
//! - `PriceRefresher`: periodic native/USD quote update

pub mod context;
pub mod grinder;
pub mod indexer;
pub mod orchestrator;
pub mod price_refresher;
pub mod single_pool;

pub use context::{GrindContext, PriceCell};
pub use grinder::{BatchGrinder, CycleOutcome, GrindSettings};
pub use indexer::IntentIndexer;
pub use orchestrator::{GrindOrchestrator, Schedule};
pub use price_refresher::PriceRefresher;
pub use single_pool::{AccountIteration, PoolIterator};

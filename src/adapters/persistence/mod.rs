//! Persistence Adapters - JSON File Storage
//!
//! Implements the `IntentStore` port as an in-memory index mirrored to
//! an atomically rewritten JSON file. No database dependency.

pub mod intents;

pub use intents::JsonIntentStore;

//! Intent Store Port - Local Key-Value Index of Intents
//!
//! The keeper keeps a read-only mirror of the intent registry for the
//! HTTP surface and the cache-driven grind variant. The backing store
//! (JSON file today) is swappable behind this trait.

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::domain::{Intent, IntentId};

#[async_trait]
pub trait IntentStore: Send + Sync + 'static {
  /// Look up one intent by id.
  async fn get(&self, intent_id: IntentId) -> anyhow::Result<Option<Intent>>;

  /// Look up the intent owned by `owner`.
  async fn find_by_owner(&self, owner: Address) -> anyhow::Result<Option<Intent>>;

  /// Insert or replace one record, keyed by `intent_id`.
  async fn put(&self, intent: Intent) -> anyhow::Result<()>;

  /// All records, in index order.
  async fn list(&self) -> anyhow::Result<Vec<Intent>>;

  /// Replace the whole index.
  async fn replace_all(&self, intents: Vec<Intent>) -> anyhow::Result<()>;

  /// Number of records.
  async fn len(&self) -> anyhow::Result<usize>;
}

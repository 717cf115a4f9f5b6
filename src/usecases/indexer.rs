//! Intent Indexer - Mirror the Registry into the Local Store
//!
//! `index_all` pages through `0..totalIntents`; a page that fails is
//! retried one id at a time so a single unreadable record does not drop
//! its neighbours. The store is replaced in one write at the end.
//!
//! Both operations report failure as a flag rather than an error: a
//! registry or store failure is logged and leaves the index as it was.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, instrument, warn};

use crate::domain::{Intent, IntentId};
use crate::ports::intent_store::IntentStore;
use crate::ports::ledger::Ledger;

pub struct IntentIndexer<L: Ledger, S: IntentStore> {
  ledger: Arc<L>,
  store: Arc<S>,
  batch_size: usize,
}

impl<L: Ledger, S: IntentStore> IntentIndexer<L, S> {
  pub fn new(ledger: Arc<L>, store: Arc<S>, batch_size: usize) -> Self {
    Self {
      ledger,
      store,
      batch_size: batch_size.max(1),
    }
  }

  /// Re-scan the whole registry. The number of indexed intents, or
  /// `None` if the scan or the store write failed.
  #[instrument(skip(self))]
  pub async fn index_all(&self) -> Option<usize> {
    match self.rebuild().await {
      Ok(count) => Some(count),
      Err(e) => {
        error!(error = format!("{e:#}"), "Intent indexing failed");
        None
      }
    }
  }

  /// Refresh one cached record. `false` if the id is not in the index or
  /// the refresh failed.
  #[instrument(skip(self))]
  pub async fn reindex(&self, intent_id: IntentId) -> bool {
    match self.refresh(intent_id).await {
      Ok(reindexed) => reindexed,
      Err(e) => {
        error!(error = format!("{e:#}"), "Intent reindex failed");
        false
      }
    }
  }

  async fn rebuild(&self) -> Result<usize> {
    let total = self
      .ledger
      .total_intents()
      .await
      .context("Registry size read failed")?;
    let ids: Vec<IntentId> = (0..total).collect();
    let mut indexed: Vec<Intent> = Vec::with_capacity(ids.len());

    for page in ids.chunks(self.batch_size) {
      match self.ledger.intents(page).await {
        Ok(intents) => indexed.extend(intents),
        Err(e) => {
          warn!(
            first = page[0],
            size = page.len(),
            error = %e,
            "Intent page read failed, retrying per id"
          );
          for &intent_id in page {
            match self.ledger.intents(&[intent_id]).await {
              Ok(intents) => indexed.extend(intents),
              Err(e) => error!(intent_id, error = %e, "Intent unreadable, skipped"),
            }
          }
        }
      }
    }

    let count = indexed.len();
    self
      .store
      .replace_all(indexed)
      .await
      .context("Index write failed")?;
    info!(total, indexed = count, "Intent index rebuilt");
    Ok(count)
  }

  async fn refresh(&self, intent_id: IntentId) -> Result<bool> {
    if self.store.get(intent_id).await?.is_none() {
      error!("Intent not in local index");
      return Ok(false);
    }

    let fresh = self
      .ledger
      .intents(&[intent_id])
      .await?
      .into_iter()
      .next()
      .with_context(|| format!("Registry returned no record for intent {intent_id}"))?;

    self.store.put(fresh).await.context("Index write failed")?;
    info!("Intent reindexed");
    Ok(true)
  }
}

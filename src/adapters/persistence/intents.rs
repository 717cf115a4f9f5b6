//! Intent Index - Atomic JSON File Store
//!
//! Keeps the mirrored intent records in memory and writes the whole
//! array to `intents.json` on every mutation (write tmp, then rename),
//! so the file is always either the old or the new index.

use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{error, info, instrument};

use crate::domain::{Intent, IntentId};
use crate::ports::intent_store::IntentStore;

/// File-backed implementation of the `IntentStore` port.
pub struct JsonIntentStore {
    path: PathBuf,
    tmp_path: PathBuf,
    records: RwLock<Vec<Intent>>,
}

impl JsonIntentStore {
    /// Open the store in `data_dir`, creating the directory if needed.
    ///
    /// A missing or unreadable `intents.json` yields an empty index; the
    /// next `POST /intents/index` rebuilds it.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)
            .await
            .context("Failed to create data directory")?;

        let path = dir.join("intents.json");
        let records = match Self::load(&path).await {
            Ok(records) => {
                info!(path = %path.display(), count = records.len(), "Intent index loaded");
                records
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Intent index unavailable, starting empty");
                Vec::new()
            }
        };

        Ok(Self {
            tmp_path: dir.join("intents.json.tmp"),
            path,
            records: RwLock::new(records),
        })
    }

    async fn load(path: &Path) -> Result<Vec<Intent>> {
        let json = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).context("Failed to parse intent index JSON")
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn flush(&self, records: &[Intent]) -> Result<()> {
        let json = serde_json::to_string_pretty(records).context("Failed to serialize intents")?;

        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp intent index")?;
        fs::rename(&self.tmp_path, &self.path)
            .await
            .context("Failed to rename intent index")?;

        Ok(())
    }
}

#[async_trait]
impl IntentStore for JsonIntentStore {
    async fn get(&self, intent_id: IntentId) -> Result<Option<Intent>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|i| i.intent_id == intent_id).cloned())
    }

    async fn find_by_owner(&self, owner: Address) -> Result<Option<Intent>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|i| i.owner == owner).cloned())
    }

    async fn put(&self, intent: Intent) -> Result<()> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|i| i.intent_id == intent.intent_id) {
            Some(slot) => *slot = intent,
            None => {
                records.push(intent);
                records.sort_by_key(|i| i.intent_id);
            }
        }
        self.flush(&records).await
    }

    async fn list(&self) -> Result<Vec<Intent>> {
        Ok(self.records.read().await.clone())
    }

    async fn replace_all(&self, mut intents: Vec<Intent>) -> Result<()> {
        intents.sort_by_key(|i| i.intent_id);
        let mut records = self.records.write().await;
        self.flush(&intents).await?;
        *records = intents;
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}

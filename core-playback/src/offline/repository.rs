//! Typed access to download metadata in the key-value store

use crate::error::{PlaybackError, Result};
use crate::models::DownloadMetadata;
use bridge_traits::storage::KeyValueStore;
use std::sync::Arc;
use tracing::debug;

/// Repository of [`DownloadMetadata`] records keyed by song id.
///
/// Every key is `<prefix><song id>`; other keys in the store are ignored.
#[derive(Clone)]
pub struct MetadataRepository {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl MetadataRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn metadata_key(&self, song_id: &str) -> String {
        format!("{}{}", self.prefix, song_id)
    }

    pub async fn save(&self, metadata: &DownloadMetadata) -> Result<()> {
        let key = self.metadata_key(&metadata.id);
        let json = serde_json::to_string(metadata).map_err(|e| {
            PlaybackError::Storage(format!("Failed to encode metadata for {}: {}", key, e))
        })?;
        self.store.set_string(&key, &json).await?;
        debug!(key = %key, "Saved download metadata");
        Ok(())
    }

    /// Loads a record.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::DataCorruption`] if the stored value is not valid metadata.
    pub async fn load(&self, song_id: &str) -> Result<Option<DownloadMetadata>> {
        let key = self.metadata_key(song_id);
        let Some(raw) = self.store.get_string(&key).await? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| PlaybackError::DataCorruption {
                key,
                message: e.to_string(),
            })
    }

    pub async fn contains(&self, song_id: &str) -> Result<bool> {
        Ok(self.store.contains(&self.metadata_key(song_id)).await?)
    }

    pub async fn remove(&self, song_id: &str) -> Result<()> {
        let key = self.metadata_key(song_id);
        self.store.delete(&key).await?;
        debug!(key = %key, "Removed download metadata");
        Ok(())
    }

    /// Ids of every song with a metadata key, in store order.
    pub async fn song_ids(&self) -> Result<Vec<String>> {
        let keys = self.store.list_keys().await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.prefix).map(str::to_string))
            .filter(|id| !id.is_empty())
            .collect())
    }
}

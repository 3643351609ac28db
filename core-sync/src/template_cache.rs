//! # Playlist Template Cache
//!
//! Remembers, per playlist name, the remote playlist id and the last desired
//! sequence that was applied successfully. A session whose desired sequence
//! equals the cached template skips reconciliation entirely.
//!
//! The JSON file maps playlist names to entries:
//!
//! ```json
//! {
//!   "Last.fm Recents (auto)": {
//!     "id": "PLxxxxxxxx",
//!     "video_ids": ["dQw4w9WgXcQ", "..."],
//!     "last_updated": "2024-05-01T08:00:00Z"
//!   }
//! }
//! ```

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use bridge_traits::playlist::{ItemId, PlaylistId};
use bridge_traits::storage::FileSystemAccess;
use bridge_traits::time::Clock;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistTemplate {
    pub id: PlaylistId,
    #[serde(rename = "video_ids")]
    pub item_ids: Vec<ItemId>,
    pub last_updated: DateTime<Utc>,
}

/// Key-value store of playlist templates, keyed by playlist name
#[async_trait]
pub trait TemplateCache: Send + Sync {
    /// Last applied desired sequence
    async fn get(&self, name: &str) -> Option<Vec<ItemId>>;

    async fn get_id(&self, name: &str) -> Option<PlaylistId>;

    async fn set(&self, name: &str, playlist_id: &PlaylistId, items: &[ItemId]) -> Result<()>;

    async fn remove(&self, name: &str) -> Result<()>;

    /// `true` unless a non-empty cached template equals `items`
    async fn template_changed(&self, name: &str, items: &[ItemId]) -> bool {
        match self.get(name).await {
            Some(cached) if !cached.is_empty() => {
                if cached == items {
                    debug!(playlist = name, "Template unchanged");
                    false
                } else {
                    info!(
                        playlist = name,
                        cached = cached.len(),
                        desired = items.len(),
                        "Template changed"
                    );
                    true
                }
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let reads = self.hits + self.misses;
        if reads == 0 {
            0.0
        } else {
            self.hits as f64 / reads as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

/// [`TemplateCache`] persisted as one JSON file
pub struct JsonTemplateCache {
    fs: Arc<dyn FileSystemAccess>,
    path: PathBuf,
    clock: Arc<dyn Clock>,
    ttl: Option<Duration>,
    entries: Mutex<HashMap<String, PlaylistTemplate>>,
    counters: Counters,
}

impl JsonTemplateCache {
    /// Load the cache file, starting empty when it is missing or unreadable
    pub async fn load(
        fs: Arc<dyn FileSystemAccess>,
        path: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let path = path.into();
        let entries = if fs
            .exists(&path)
            .await
            .map_err(|e| SyncError::Cache(e.to_string()))?
        {
            let raw = fs
                .read_file(&path)
                .await
                .map_err(|e| SyncError::Cache(e.to_string()))?;
            match serde_json::from_slice::<HashMap<String, PlaylistTemplate>>(&raw) {
                Ok(entries) => {
                    debug!(path = ?path, entries = entries.len(), "Loaded template cache");
                    entries
                }
                Err(e) => {
                    warn!(path = ?path, error = %e, "Template cache corrupt, starting empty");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            fs,
            path,
            clock,
            ttl: None,
            entries: Mutex::new(entries),
            counters: Counters::default(),
        })
    }

    /// Entries older than `ttl` read as misses
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.stats();
        if stats.hits + stats.misses == 0 {
            return;
        }
        info!(
            hits = stats.hits,
            misses = stats.misses,
            writes = stats.writes,
            hit_rate = format_args!("{:.1}%", stats.hit_rate() * 100.0),
            "Template cache statistics"
        );
    }

    fn is_fresh(&self, template: &PlaylistTemplate) -> bool {
        match self.ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok()) {
            Some(ttl) => self.clock.now() - template.last_updated <= ttl,
            None => true,
        }
    }

    async fn lookup(&self, name: &str) -> Option<PlaylistTemplate> {
        let entries = self.entries.lock().await;
        let found = entries.get(name).filter(|t| self.is_fresh(t)).cloned();
        drop(entries);

        let counter = if found.is_some() {
            &self.counters.hits
        } else {
            &self.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    async fn persist(&self, entries: &HashMap<String, PlaylistTemplate>) -> Result<()> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| SyncError::Cache(format!("Failed to serialize templates: {}", e)))?;
        self.fs
            .write_file(&self.path, Bytes::from(json))
            .await
            .map_err(|e| SyncError::Cache(e.to_string()))?;
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl TemplateCache for JsonTemplateCache {
    async fn get(&self, name: &str) -> Option<Vec<ItemId>> {
        self.lookup(name)
            .await
            .map(|t| t.item_ids)
            .filter(|ids| !ids.is_empty())
    }

    async fn get_id(&self, name: &str) -> Option<PlaylistId> {
        let id = self.lookup(name).await.map(|t| t.id);
        match &id {
            Some(id) => debug!(playlist = name, playlist_id = %id, "Template cache hit"),
            None => debug!(playlist = name, "Template cache miss"),
        }
        id
    }

    async fn set(&self, name: &str, playlist_id: &PlaylistId, items: &[ItemId]) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            name.to_string(),
            PlaylistTemplate {
                id: playlist_id.clone(),
                item_ids: items.to_vec(),
                last_updated: self.clock.now(),
            },
        );
        self.persist(&entries).await?;

        info!(
            playlist = name,
            playlist_id = %playlist_id,
            items = items.len(),
            "Cached playlist template"
        );
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(name).is_some() {
            self.persist(&entries).await?;
            info!(playlist = name, "Removed playlist template");
        }
        Ok(())
    }
}

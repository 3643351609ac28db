//! # Resilient Remote Gateway
//!
//! Wraps the raw [`RemotePlaylistAccessor`] and [`PlaylistDirectory`] bridges
//! with chunking, retry-with-backoff and metrics.
//!
//! ## Partial failure
//!
//! A mutating batch that still fails with a transient error after the full
//! retry budget is re-issued one item at a time, each item with its own
//! smaller budget. Items that fail individually are logged and reported in
//! [`MutationOutcome::failed`]; they never abort the pass. A permanent error on
//! a batch (permission denied, unknown playlist) is propagated unchanged.

use crate::error::{Result, SyncError};
use crate::metrics::{OperationKind, OperationMetrics};
use crate::retry::retry_with_backoff;
use bridge_traits::http::RetryPolicy;
use bridge_traits::playlist::{
    ItemId, PlaylistDirectory, PlaylistEntry, PlaylistId, PlaylistSnapshot, PlaylistSummary,
    PrivacyStatus, RemotePlaylistAccessor, SlotId,
};
use core_runtime::config::{SyncSettings, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Attempts per item once a batch has degraded to one-at-a-time
pub const ITEM_RETRY_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone)]
pub struct AccessorConfig {
    /// Maximum items per mutating call (1..=100)
    pub chunk_size: usize,
    pub retry: RetryPolicy,
    pub item_retry_attempts: u32,
}

impl Default for AccessorConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry: RetryPolicy::default(),
            item_retry_attempts: ITEM_RETRY_ATTEMPTS,
        }
    }
}

impl AccessorConfig {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size.clamp(1, MAX_CHUNK_SIZE),
            retry: RetryPolicy {
                max_attempts: settings.max_retries.max(1),
                base_delay: settings.retry_base_delay,
                max_delay: settings.retry_max_delay,
                use_exponential_backoff: true,
            },
            item_retry_attempts: ITEM_RETRY_ATTEMPTS,
        }
    }
}

/// Result of a chunked mutation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    /// Items the remote accepted
    pub succeeded: usize,
    /// Items abandoned after per-item fallback
    pub failed: Vec<ItemId>,
}

impl MutationOutcome {
    fn merge(&mut self, other: MutationOutcome) {
        self.succeeded += other.succeeded;
        self.failed.extend(other.failed);
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Chunked, retrying access to one remote playlist at a time
pub struct ResilientAccessor {
    inner: Arc<dyn RemotePlaylistAccessor>,
    config: AccessorConfig,
    metrics: Arc<OperationMetrics>,
    cancel: CancellationToken,
}

impl ResilientAccessor {
    pub fn new(
        inner: Arc<dyn RemotePlaylistAccessor>,
        config: AccessorConfig,
        metrics: Arc<OperationMetrics>,
    ) -> Self {
        Self {
            inner,
            config,
            metrics,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort backoff sleeps when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn metrics(&self) -> &Arc<OperationMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &AccessorConfig {
        &self.config
    }

    fn chunk_size(&self) -> usize {
        self.config.chunk_size.clamp(1, MAX_CHUNK_SIZE)
    }

    #[instrument(skip(self), fields(playlist_id = %playlist_id))]
    pub async fn list_items(&self, playlist_id: &PlaylistId) -> Result<PlaylistSnapshot> {
        let snapshot = retry_with_backoff(
            &self.config.retry,
            OperationKind::GetPlaylist.as_str(),
            &self.cancel,
            &self.metrics,
            || {
                self.metrics.record(OperationKind::GetPlaylist);
                self.inner.list_items(playlist_id)
            },
        )
        .await?;

        debug!(items = snapshot.len(), "Fetched playlist snapshot");
        Ok(snapshot)
    }

    /// Append items in chunks, never adding duplicates
    #[instrument(skip(self, item_ids), fields(playlist_id = %playlist_id, count = item_ids.len()))]
    pub async fn add_items(
        &self,
        playlist_id: &PlaylistId,
        item_ids: &[ItemId],
    ) -> Result<MutationOutcome> {
        let mut outcome = MutationOutcome::default();

        for chunk in item_ids.chunks(self.chunk_size()) {
            let batch = retry_with_backoff(
                &self.config.retry,
                OperationKind::AddPlaylistItems.as_str(),
                &self.cancel,
                &self.metrics,
                || {
                    self.metrics.record(OperationKind::AddPlaylistItems);
                    self.inner.add_items(playlist_id, chunk, false)
                },
            )
            .await;

            match batch {
                Ok(()) => outcome.succeeded += chunk.len(),
                Err(e) if e.is_transient() => {
                    warn!(
                        chunk = chunk.len(),
                        error = %e,
                        "Add batch exhausted retries, adding items one at a time"
                    );
                    self.metrics.record_individual_fallback();
                    outcome.merge(self.add_individually(playlist_id, chunk).await?);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(outcome)
    }

    async fn add_individually(
        &self,
        playlist_id: &PlaylistId,
        item_ids: &[ItemId],
    ) -> Result<MutationOutcome> {
        let policy = self.config.retry.with_max_attempts(self.config.item_retry_attempts);
        let mut outcome = MutationOutcome::default();

        for item in item_ids {
            let single = std::slice::from_ref(item);
            let result = retry_with_backoff(
                &policy,
                OperationKind::AddPlaylistItems.as_str(),
                &self.cancel,
                &self.metrics,
                || {
                    self.metrics.record(OperationKind::AddPlaylistItems);
                    self.inner.add_items(playlist_id, single, false)
                },
            )
            .await;

            match result {
                Ok(()) => outcome.succeeded += 1,
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => {
                    warn!(item_id = %item, error = %e, "Failed to add item");
                    self.metrics.record_failure();
                    outcome.failed.push(item.clone());
                }
            }
        }

        Ok(outcome)
    }

    /// Remove slots in chunks
    #[instrument(skip(self, entries), fields(playlist_id = %playlist_id, count = entries.len()))]
    pub async fn remove_slots(
        &self,
        playlist_id: &PlaylistId,
        entries: &[PlaylistEntry],
    ) -> Result<MutationOutcome> {
        let mut outcome = MutationOutcome::default();

        for chunk in entries.chunks(self.chunk_size()) {
            let batch = retry_with_backoff(
                &self.config.retry,
                OperationKind::RemovePlaylistItems.as_str(),
                &self.cancel,
                &self.metrics,
                || {
                    self.metrics.record(OperationKind::RemovePlaylistItems);
                    self.inner.remove_slots(playlist_id, chunk)
                },
            )
            .await;

            match batch {
                Ok(()) => outcome.succeeded += chunk.len(),
                Err(e) if e.is_transient() => {
                    warn!(
                        chunk = chunk.len(),
                        error = %e,
                        "Remove batch exhausted retries, removing slots one at a time"
                    );
                    self.metrics.record_individual_fallback();
                    outcome.merge(self.remove_individually(playlist_id, chunk).await?);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(outcome)
    }

    async fn remove_individually(
        &self,
        playlist_id: &PlaylistId,
        entries: &[PlaylistEntry],
    ) -> Result<MutationOutcome> {
        let policy = self.config.retry.with_max_attempts(self.config.item_retry_attempts);
        let mut outcome = MutationOutcome::default();

        for entry in entries {
            let single = std::slice::from_ref(entry);
            let result = retry_with_backoff(
                &policy,
                OperationKind::RemovePlaylistItems.as_str(),
                &self.cancel,
                &self.metrics,
                || {
                    self.metrics.record(OperationKind::RemovePlaylistItems);
                    self.inner.remove_slots(playlist_id, single)
                },
            )
            .await;

            match result {
                Ok(()) => outcome.succeeded += 1,
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => {
                    warn!(
                        item_id = %entry.item_id,
                        slot_id = %entry.slot_id,
                        error = %e,
                        "Failed to remove slot"
                    );
                    self.metrics.record_failure();
                    outcome.failed.push(entry.item_id.clone());
                }
            }
        }

        Ok(outcome)
    }

    /// Move one slot before `before`, or to the end
    pub async fn move_slot(
        &self,
        playlist_id: &PlaylistId,
        slot: &SlotId,
        before: Option<&SlotId>,
    ) -> Result<()> {
        retry_with_backoff(
            &self.config.retry,
            OperationKind::EditPlaylist.as_str(),
            &self.cancel,
            &self.metrics,
            || {
                self.metrics.record(OperationKind::EditPlaylist);
                self.inner.move_slot(playlist_id, slot, before)
            },
        )
        .await
    }

    /// Remove every slot, then add `item_ids` in order
    #[instrument(skip(self, item_ids), fields(playlist_id = %playlist_id, count = item_ids.len()))]
    pub async fn replace_all(
        &self,
        playlist_id: &PlaylistId,
        item_ids: &[ItemId],
    ) -> Result<MutationOutcome> {
        let snapshot = self.list_items(playlist_id).await?;
        let mut outcome = MutationOutcome::default();

        if !snapshot.is_empty() {
            let removed = self.remove_slots(playlist_id, &snapshot.entries).await?;
            if !removed.is_complete() {
                warn!(
                    failed = removed.failed.len(),
                    "Some slots survived the full replace"
                );
            }
        }

        if !item_ids.is_empty() {
            outcome.merge(self.add_items(playlist_id, item_ids).await?);
        }

        info!(
            removed = snapshot.len(),
            added = outcome.succeeded,
            failed = outcome.failed.len(),
            "Replaced playlist contents"
        );
        Ok(outcome)
    }
}

/// Retrying, metered access to the user's playlist library
pub struct ResilientDirectory {
    inner: Arc<dyn PlaylistDirectory>,
    retry: RetryPolicy,
    metrics: Arc<OperationMetrics>,
    cancel: CancellationToken,
}

impl ResilientDirectory {
    pub fn new(
        inner: Arc<dyn PlaylistDirectory>,
        retry: RetryPolicy,
        metrics: Arc<OperationMetrics>,
    ) -> Self {
        Self {
            inner,
            retry,
            metrics,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn list_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        retry_with_backoff(
            &self.retry,
            OperationKind::ListPlaylists.as_str(),
            &self.cancel,
            &self.metrics,
            || {
                self.metrics.record(OperationKind::ListPlaylists);
                self.inner.list_playlists()
            },
        )
        .await
    }

    /// First playlist whose title matches `name` exactly
    #[instrument(skip(self))]
    pub async fn find_by_name(&self, name: &str) -> Result<Option<PlaylistId>> {
        let playlists = self.list_playlists().await?;
        let mut matches = playlists.into_iter().filter(|p| p.title == name);

        let Some(first) = matches.next() else {
            debug!("No playlist with this name");
            return Ok(None);
        };

        let others = matches.count();
        if others > 0 {
            warn!(
                playlist_id = %first.id,
                duplicates = others,
                "Several playlists share this name, using the first"
            );
        }
        Ok(Some(first.id))
    }

    /// Create a playlist pre-populated with `item_ids`.
    ///
    /// Not retried: a create that timed out may still have succeeded remotely.
    #[instrument(skip(self, description, item_ids), fields(count = item_ids.len()))]
    pub async fn create_playlist(
        &self,
        name: &str,
        description: &str,
        privacy: PrivacyStatus,
        item_ids: &[ItemId],
    ) -> Result<PlaylistId> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        self.metrics.record(OperationKind::CreatePlaylist);
        let id = self
            .inner
            .create_playlist(name, description, privacy, item_ids)
            .await
            .inspect_err(|_| self.metrics.record_failure())?;

        info!(playlist_id = %id, "Created playlist");
        Ok(id)
    }

    pub async fn update_details(
        &self,
        playlist_id: &PlaylistId,
        name: &str,
        description: &str,
        privacy: PrivacyStatus,
    ) -> Result<()> {
        retry_with_backoff(
            &self.retry,
            OperationKind::EditPlaylist.as_str(),
            &self.cancel,
            &self.metrics,
            || {
                self.metrics.record(OperationKind::EditPlaylist);
                self.inner
                    .update_details(playlist_id, name, description, privacy)
            },
        )
        .await
    }

    pub async fn delete_playlist(&self, playlist_id: &PlaylistId) -> Result<()> {
        retry_with_backoff(
            &self.retry,
            OperationKind::DeletePlaylist.as_str(),
            &self.cancel,
            &self.metrics,
            || {
                self.metrics.record(OperationKind::DeletePlaylist);
                self.inner.delete_playlist(playlist_id)
            },
        )
        .await?;

        info!(playlist_id = %playlist_id, "Deleted playlist");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, RemoteErrorKind};
    use mockall::mock;
    use std::sync::Mutex;
    use std::time::Duration;

    type AddScript = Box<dyn Fn(&[ItemId]) -> Option<BridgeError> + Send + Sync>;

    /// Records calls; `add_script` decides which add calls fail
    #[derive(Default)]
    struct ScriptedAccessor {
        snapshot: PlaylistSnapshot,
        add_script: Option<AddScript>,
        remove_error: Option<RemoteErrorKind>,
        adds: Mutex<Vec<usize>>,
        removes: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl RemotePlaylistAccessor for ScriptedAccessor {
        async fn list_items(
            &self,
            _playlist_id: &PlaylistId,
        ) -> bridge_traits::error::Result<PlaylistSnapshot> {
            Ok(self.snapshot.clone())
        }

        async fn add_items(
            &self,
            _playlist_id: &PlaylistId,
            item_ids: &[ItemId],
            allow_duplicates: bool,
        ) -> bridge_traits::error::Result<()> {
            assert!(!allow_duplicates);
            self.adds.lock().unwrap().push(item_ids.len());
            match self.add_script.as_ref().and_then(|script| script(item_ids)) {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        async fn remove_slots(
            &self,
            _playlist_id: &PlaylistId,
            entries: &[PlaylistEntry],
        ) -> bridge_traits::error::Result<()> {
            self.removes.lock().unwrap().push(entries.len());
            match self.remove_error {
                Some(kind) => Err(BridgeError::remote(kind, "scripted")),
                None => Ok(()),
            }
        }

        async fn move_slot(
            &self,
            _playlist_id: &PlaylistId,
            _slot: &SlotId,
            _before: Option<&SlotId>,
        ) -> bridge_traits::error::Result<()> {
            Ok(())
        }
    }

    mock! {
        Directory {}

        #[async_trait]
        impl PlaylistDirectory for Directory {
            async fn list_playlists(&self) -> bridge_traits::error::Result<Vec<PlaylistSummary>>;
            async fn create_playlist(
                &self,
                title: &str,
                description: &str,
                privacy: PrivacyStatus,
                item_ids: &[ItemId],
            ) -> bridge_traits::error::Result<PlaylistId>;
            async fn update_details(
                &self,
                playlist_id: &PlaylistId,
                title: &str,
                description: &str,
                privacy: PrivacyStatus,
            ) -> bridge_traits::error::Result<()>;
            async fn delete_playlist(&self, playlist_id: &PlaylistId) -> bridge_traits::error::Result<()>;
        }
    }

    fn fast_config(chunk_size: usize) -> AccessorConfig {
        AccessorConfig {
            chunk_size,
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(40),
                use_exponential_backoff: true,
            },
            item_retry_attempts: 2,
        }
    }

    fn ids(n: usize) -> Vec<ItemId> {
        (0..n).map(|i| ItemId::new(format!("item{:07}", i))).collect()
    }

    fn pl() -> PlaylistId {
        PlaylistId::from("PL1")
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_items_chunked() {
        let fake = Arc::new(ScriptedAccessor::default());
        let metrics = Arc::new(OperationMetrics::default());
        let accessor = ResilientAccessor::new(fake.clone(), fast_config(2), metrics.clone());

        let outcome = accessor.add_items(&pl(), &ids(5)).await.unwrap();

        assert_eq!(outcome.succeeded, 5);
        assert!(outcome.is_complete());
        assert_eq!(*fake.adds.lock().unwrap(), vec![2, 2, 1]);
        assert_eq!(metrics.count(OperationKind::AddPlaylistItems), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_batch_degrades_to_single_items() {
        let bad = ItemId::new("item0000001");
        let bad_for_script = bad.clone();
        let fake = Arc::new(ScriptedAccessor {
            add_script: Some(Box::new(move |items: &[ItemId]| {
                (items.len() > 1 || items[0] == bad_for_script)
                    .then(|| BridgeError::remote(RemoteErrorKind::ServerError, "503"))
            })),
            ..Default::default()
        });

        let metrics = Arc::new(OperationMetrics::default());
        let accessor = ResilientAccessor::new(fake.clone(), fast_config(50), metrics.clone());

        let outcome = accessor.add_items(&pl(), &ids(3)).await.unwrap();

        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, vec![bad]);
        let errors = metrics.errors();
        assert_eq!(errors.individual_fallbacks, 1);
        assert_eq!(errors.failed_operations, 1);
        // 3 batch attempts, then 1 + 2 + 1 single-item attempts
        assert_eq!(*fake.adds.lock().unwrap(), vec![3, 3, 3, 1, 1, 1, 1]);
        assert_eq!(metrics.count(OperationKind::AddPlaylistItems), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_batch_error_propagates() {
        let fake = Arc::new(ScriptedAccessor {
            remove_error: Some(RemoteErrorKind::NotFound),
            ..Default::default()
        });
        let accessor = ResilientAccessor::new(
            fake.clone(),
            fast_config(50),
            Arc::new(OperationMetrics::default()),
        );

        let entries = vec![PlaylistEntry::new("aaaaaaaaaaa", "s1")];
        let err = accessor.remove_slots(&pl(), &entries).await.unwrap_err();

        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::NotFound));
        assert_eq!(fake.removes.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replace_all_removes_then_adds() {
        let fake = Arc::new(ScriptedAccessor {
            snapshot: PlaylistSnapshot::new(vec![
                PlaylistEntry::new("xxxxxxxxxxx", "s1"),
                PlaylistEntry::new("yyyyyyyyyyy", "s2"),
            ]),
            ..Default::default()
        });
        let metrics = Arc::new(OperationMetrics::default());
        let accessor = ResilientAccessor::new(fake.clone(), fast_config(50), metrics.clone());

        let outcome = accessor
            .replace_all(&pl(), &[ItemId::from("aaaaaaaaaaa")])
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(*fake.removes.lock().unwrap(), vec![2]);
        assert_eq!(*fake.adds.lock().unwrap(), vec![1]);
        assert_eq!(metrics.count(OperationKind::GetPlaylist), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_by_name_first_match_wins() {
        let mut mock = MockDirectory::new();
        mock.expect_list_playlists().times(1).returning(|| {
            Ok(vec![
                PlaylistSummary {
                    id: PlaylistId::from("PL-other"),
                    title: "Other".to_string(),
                },
                PlaylistSummary {
                    id: PlaylistId::from("PL-first"),
                    title: "Recents".to_string(),
                },
                PlaylistSummary {
                    id: PlaylistId::from("PL-second"),
                    title: "Recents".to_string(),
                },
            ])
        });

        let metrics = Arc::new(OperationMetrics::default());
        let directory =
            ResilientDirectory::new(Arc::new(mock), RetryPolicy::default(), metrics.clone());

        assert_eq!(
            directory.find_by_name("Recents").await.unwrap(),
            Some(PlaylistId::from("PL-first"))
        );
        assert_eq!(metrics.count(OperationKind::ListPlaylists), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_is_not_retried() {
        let mut mock = MockDirectory::new();
        mock.expect_create_playlist()
            .withf(|title, _, privacy, _| title == "Recents" && *privacy == PrivacyStatus::Private)
            .times(1)
            .returning(|_, _, _, _| Err(BridgeError::remote(RemoteErrorKind::ServerError, "502")));

        let metrics = Arc::new(OperationMetrics::default());
        let directory =
            ResilientDirectory::new(Arc::new(mock), RetryPolicy::default(), metrics.clone());

        let result = directory
            .create_playlist("Recents", "", PrivacyStatus::Private, &[])
            .await;

        assert!(result.is_err());
        assert_eq!(metrics.count(OperationKind::CreatePlaylist), 1);
        assert_eq!(metrics.errors().failed_operations, 1);
    }
}

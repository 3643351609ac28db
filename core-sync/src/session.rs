//! # Sync Session
//!
//! Top-level entry point for syncing one named playlist: resolves the name to
//! a remote id, creates the playlist when it does not exist, skips work when
//! the cached template already matches, and otherwise reconciles.

use crate::error::{Result, SyncError};
use crate::gateway::ResilientDirectory;
use crate::metrics::{MetricsSnapshot, OperationMetrics};
use crate::normalizer::normalize;
use crate::reconciler::{ReconciliationResult, Reconciler};
use crate::template_cache::TemplateCache;
use bridge_traits::error::RemoteErrorKind;
use bridge_traits::playlist::{ItemId, PlaylistId, PrivacyStatus};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// What a session did to the remote playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAction {
    /// Playlist did not exist and was created with the desired items
    Created,
    /// Cached template matched, no remote mutation
    Skipped,
    Reconciled,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub playlist_name: String,
    pub playlist_id: PlaylistId,
    pub action: SessionAction,
    /// Present when the playlist was reconciled
    pub result: Option<ReconciliationResult>,
    pub metrics: MetricsSnapshot,
}

impl SessionReport {
    /// Created and skipped sessions always succeed
    pub fn is_success(&self) -> bool {
        self.result
            .as_ref()
            .map_or(true, |r| r.outcome.is_success())
    }
}

pub struct SyncSession {
    reconciler: Arc<Reconciler>,
    directory: Arc<ResilientDirectory>,
    templates: Arc<dyn TemplateCache>,
    metrics: Arc<OperationMetrics>,
}

impl SyncSession {
    pub fn new(
        reconciler: Arc<Reconciler>,
        directory: Arc<ResilientDirectory>,
        templates: Arc<dyn TemplateCache>,
        metrics: Arc<OperationMetrics>,
    ) -> Self {
        Self {
            reconciler,
            directory,
            templates,
            metrics,
        }
    }

    pub fn directory(&self) -> &Arc<ResilientDirectory> {
        &self.directory
    }

    pub fn templates(&self) -> &Arc<dyn TemplateCache> {
        &self.templates
    }

    pub fn metrics(&self) -> &Arc<OperationMetrics> {
        &self.metrics
    }

    /// Sync one playlist as a fresh session: metrics are reset first and
    /// logged at the end.
    pub async fn sync_named_playlist(
        &self,
        name: &str,
        description: &str,
        privacy: PrivacyStatus,
        desired: &[ItemId],
    ) -> Result<SessionReport> {
        self.metrics.reset();
        let report = self.sync_playlist(name, description, privacy, desired).await;
        self.metrics.log_statistics();
        report
    }

    /// Sync within the current session, leaving metrics untouched
    #[instrument(skip(self, description, desired), fields(desired = desired.len()))]
    pub async fn sync_playlist(
        &self,
        name: &str,
        description: &str,
        privacy: PrivacyStatus,
        desired: &[ItemId],
    ) -> Result<SessionReport> {
        let desired = normalize(desired.iter().cloned());

        let Some((playlist_id, from_cache)) = self.resolve(name).await? else {
            let playlist_id = self
                .directory
                .create_playlist(name, description, privacy, &desired)
                .await?;
            self.remember(name, &playlist_id, &desired).await;
            return Ok(self.report(name, playlist_id, SessionAction::Created, None));
        };

        if from_cache && !self.templates.template_changed(name, &desired).await {
            info!(playlist_id = %playlist_id, "Playlist unchanged, skipping");
            return Ok(self.report(name, playlist_id, SessionAction::Skipped, None));
        }

        let result = self.reconciler.reconcile(&playlist_id, &desired).await?;
        if result.outcome.is_success() {
            self.remember(name, &playlist_id, &desired).await;
        } else {
            warn!(
                playlist_id = %playlist_id,
                similarity = result.final_similarity,
                "Not caching template for unconverged playlist"
            );
        }

        Ok(self.report(
            name,
            playlist_id,
            SessionAction::Reconciled,
            Some(result),
        ))
    }

    /// Playlist id for `name` and whether it came from the template cache
    async fn resolve(&self, name: &str) -> Result<Option<(PlaylistId, bool)>> {
        if let Some(cached) = self.templates.get_id(name).await {
            match self.reconciler.accessor().list_items(&cached).await {
                Ok(_) => return Ok(Some((cached, true))),
                Err(SyncError::Remote(e)) if e.remote_kind() == Some(RemoteErrorKind::NotFound) => {
                    info!(playlist_id = %cached, "Cached playlist no longer exists");
                    if let Err(e) = self.templates.remove(name).await {
                        warn!(error = %e, "Failed to drop stale template");
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Ok(self
            .directory
            .find_by_name(name)
            .await?
            .map(|id| (id, false)))
    }

    /// Template writes are best effort; a failed write only costs a skip next time
    async fn remember(&self, name: &str, playlist_id: &PlaylistId, desired: &[ItemId]) {
        if let Err(e) = self.templates.set(name, playlist_id, desired).await {
            warn!(error = %e, "Failed to cache playlist template");
        }
    }

    fn report(
        &self,
        name: &str,
        playlist_id: PlaylistId,
        action: SessionAction,
        result: Option<ReconciliationResult>,
    ) -> SessionReport {
        SessionReport {
            playlist_name: name.to_string(),
            playlist_id,
            action,
            result,
            metrics: self.metrics.snapshot(),
        }
    }
}

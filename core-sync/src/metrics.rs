//! # Operation Metrics
//!
//! Counts remote calls by operation type and tracks per-session error
//! counters and duration.
//!
//! One [`OperationMetrics`] is constructed per process, shared by `Arc`
//! between the resilient accessor, the similarity judge and the sync session,
//! and [`reset`](OperationMetrics::reset) at the start of every top-level
//! session. Writers never run concurrently within a reconciliation, so the
//! internal mutex is uncontended.

use bridge_traits::time::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

/// Remote operation label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    GetPlaylist,
    AddPlaylistItems,
    RemovePlaylistItems,
    EditPlaylist,
    GetSong,
    ListPlaylists,
    CreatePlaylist,
    DeletePlaylist,
}

impl OperationKind {
    pub const ALL: [OperationKind; 8] = [
        OperationKind::GetPlaylist,
        OperationKind::AddPlaylistItems,
        OperationKind::RemovePlaylistItems,
        OperationKind::EditPlaylist,
        OperationKind::GetSong,
        OperationKind::ListPlaylists,
        OperationKind::CreatePlaylist,
        OperationKind::DeletePlaylist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::GetPlaylist => "get_playlist",
            OperationKind::AddPlaylistItems => "add_playlist_items",
            OperationKind::RemovePlaylistItems => "remove_playlist_items",
            OperationKind::EditPlaylist => "edit_playlist",
            OperationKind::GetSong => "get_song",
            OperationKind::ListPlaylists => "list_playlists",
            OperationKind::CreatePlaylist => "create_playlist",
            OperationKind::DeletePlaylist => "delete_playlist",
        }
    }

    /// Whether the operation changes remote state
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            OperationKind::GetPlaylist | OperationKind::GetSong | OperationKind::ListPlaylists
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCounters {
    /// Backoff retries after a transient failure
    pub retries: u64,
    /// Batches degraded to one-item-at-a-time
    pub individual_fallbacks: u64,
    /// Operations abandoned after every attempt failed
    pub failed_operations: u64,
}

/// Serializable point-in-time view of the metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_queries: u64,
    pub operation_counts: BTreeMap<OperationKind, u64>,
    pub errors: ErrorCounters,
    pub session_duration_secs: f64,
    pub query_rate: f64,
}

impl MetricsSnapshot {
    pub fn count(&self, kind: OperationKind) -> u64 {
        self.operation_counts.get(&kind).copied().unwrap_or(0)
    }

    /// Sum of all state-changing calls
    pub fn mutating_queries(&self) -> u64 {
        self.operation_counts
            .iter()
            .filter(|(kind, _)| kind.is_mutating())
            .map(|(_, count)| count)
            .sum()
    }
}

#[derive(Debug, Default)]
struct MetricsState {
    total: u64,
    counts: BTreeMap<OperationKind, u64>,
    errors: ErrorCounters,
    session_start: Option<DateTime<Utc>>,
}

/// Session-scoped API usage counters
pub struct OperationMetrics {
    clock: Arc<dyn Clock>,
    state: Mutex<MetricsState>,
}

impl OperationMetrics {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(MetricsState::default()),
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    fn state(&self) -> MutexGuard<'_, MetricsState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Zero every counter and restart the session clock
    pub fn reset(&self) {
        let now = self.clock.now();
        let mut state = self.state();
        *state = MetricsState {
            session_start: Some(now),
            ..MetricsState::default()
        };
    }

    /// Count one remote call
    pub fn record(&self, kind: OperationKind) {
        let now = self.clock.now();
        let mut state = self.state();
        state.session_start.get_or_insert(now);
        state.total += 1;
        *state.counts.entry(kind).or_insert(0) += 1;
    }

    pub fn record_retry(&self) {
        self.state().errors.retries += 1;
    }

    pub fn record_individual_fallback(&self) {
        self.state().errors.individual_fallbacks += 1;
    }

    pub fn record_failure(&self) {
        self.state().errors.failed_operations += 1;
    }

    pub fn total(&self) -> u64 {
        self.state().total
    }

    pub fn count(&self, kind: OperationKind) -> u64 {
        self.state().counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn errors(&self) -> ErrorCounters {
        self.state().errors
    }

    /// Time since the first call or the last reset
    pub fn session_duration(&self) -> Duration {
        let start = self.state().session_start;
        match start {
            Some(start) => (self.clock.now() - start).to_std().unwrap_or_default(),
            None => Duration::ZERO,
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let duration = self.session_duration().as_secs_f64();
        let state = self.state();
        let query_rate = if duration > 0.0 {
            state.total as f64 / duration
        } else {
            0.0
        };

        MetricsSnapshot {
            total_queries: state.total,
            operation_counts: state.counts.clone(),
            errors: state.errors,
            session_duration_secs: duration,
            query_rate,
        }
    }

    /// Log the session summary at info level
    pub fn log_statistics(&self) {
        let snapshot = self.snapshot();
        if snapshot.total_queries == 0 && snapshot.session_duration_secs == 0.0 {
            return;
        }

        info!(
            total_queries = snapshot.total_queries,
            duration_secs = format_args!("{:.1}", snapshot.session_duration_secs),
            query_rate = format_args!("{:.2}", snapshot.query_rate),
            retries = snapshot.errors.retries,
            individual_fallbacks = snapshot.errors.individual_fallbacks,
            failed_operations = snapshot.errors.failed_operations,
            "Playlist session statistics"
        );

        for (kind, count) in snapshot.operation_counts.iter().filter(|(_, c)| **c > 0) {
            let share = 100.0 * *count as f64 / snapshot.total_queries.max(1) as f64;
            info!(
                operation = %kind,
                count,
                share = format_args!("{:.1}%", share),
                "Operation breakdown"
            );
        }
    }
}

impl Default for OperationMetrics {
    fn default() -> Self {
        Self::with_system_clock()
    }
}

impl fmt::Debug for OperationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationMetrics")
            .field("total", &self.total())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::time::ManualClock;
    use chrono::TimeZone;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_record_counts_by_kind() {
        let metrics = OperationMetrics::new(clock());

        metrics.record(OperationKind::GetPlaylist);
        metrics.record(OperationKind::GetPlaylist);
        metrics.record(OperationKind::AddPlaylistItems);

        assert_eq!(metrics.total(), 3);
        assert_eq!(metrics.count(OperationKind::GetPlaylist), 2);
        assert_eq!(metrics.count(OperationKind::EditPlaylist), 0);
    }

    #[test]
    fn test_reset_clears_counters() {
        let metrics = OperationMetrics::new(clock());
        metrics.record(OperationKind::GetSong);
        metrics.record_retry();
        metrics.record_failure();

        metrics.reset();

        assert_eq!(metrics.total(), 0);
        assert_eq!(metrics.errors(), ErrorCounters::default());
    }

    #[test]
    fn test_session_duration_and_rate() {
        let clock = clock();
        let metrics = OperationMetrics::new(clock.clone());

        metrics.reset();
        for _ in 0..10 {
            metrics.record(OperationKind::EditPlaylist);
        }
        clock.advance(chrono::Duration::seconds(5));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.session_duration_secs, 5.0);
        assert_eq!(snapshot.query_rate, 2.0);
        assert_eq!(snapshot.mutating_queries(), 10);
    }

    #[test]
    fn test_snapshot_serializes_operation_labels() {
        let metrics = OperationMetrics::new(clock());
        metrics.record(OperationKind::RemovePlaylistItems);
        metrics.record_individual_fallback();

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["operation_counts"]["remove_playlist_items"], 1);
        assert_eq!(json["errors"]["individual_fallbacks"], 1);
    }

    #[test]
    fn test_mutating_classification() {
        assert!(!OperationKind::GetPlaylist.is_mutating());
        assert!(!OperationKind::GetSong.is_mutating());
        assert!(OperationKind::EditPlaylist.is_mutating());
        assert!(OperationKind::AddPlaylistItems.is_mutating());
    }
}

//! # Reconciliation Orchestrator
//!
//! Converges one remote playlist to a desired item sequence.
//!
//! ## State machine
//!
//! ```text
//! Normalize ──► DiffApply ──► Verify ──► Done
//!     │             ▲           │
//!     │             │           ▼
//!     │             └──── SubstituteRetry (bounded)
//!     │                         │
//!     └──────────────► FullReplaceFallback ──► Verify ──► Done
//! ```
//!
//! - `Normalize`: drop malformed ids and duplicates. An empty sequence clears
//!   the playlist with a single full replace.
//! - `DiffApply`: remove unwanted slots, add missing items, re-read the
//!   playlist when anything was added, then reorder with the minimal-move
//!   planner.
//! - `Verify`: an exact match succeeds; the same set in a different order is
//!   accepted; anything else goes to substitution handling.
//! - `SubstituteRetry`: map missing items to content-identical extras and try
//!   again with the rewritten sequence.
//! - `FullReplaceFallback`: replace everything once and grade the result by
//!   content similarity.
//!
//! Non-convergence is reported as [`ReconcileOutcome::Failed`], never as an
//! error. Errors are reserved for permanent remote failures and cancellation.

use crate::diff::{self, plan_removals};
use crate::error::Result;
use crate::gateway::ResilientAccessor;
use crate::normalizer::normalize;
use crate::reorder::Reorderer;
use crate::substitution::{apply_substitutions, SimilarityJudge, SubstitutionDetector, SubstitutionMap};
use bridge_traits::playlist::{ItemId, PlaylistId};
use core_runtime::config::{ReconcileStrategy, SyncSettings, DEFAULT_SUBSTITUTION_ATTEMPTS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Similarity at or above which a non-exact result still counts as success
pub const SUCCESS_THRESHOLD: f64 = 0.95;
/// Similarity at or above which a non-exact result is accepted with a warning
pub const WARNING_THRESHOLD: f64 = 0.80;

const SAMPLE_IDS: usize = 5;

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub strategy: ReconcileStrategy,
    /// Substitution rounds before giving up on incremental convergence
    pub substitution_attempts: u32,
    pub accept_substitutions: bool,
    pub success_threshold: f64,
    pub warning_threshold: f64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            strategy: ReconcileStrategy::default(),
            substitution_attempts: DEFAULT_SUBSTITUTION_ATTEMPTS,
            accept_substitutions: true,
            success_threshold: SUCCESS_THRESHOLD,
            warning_threshold: WARNING_THRESHOLD,
        }
    }
}

impl ReconcilerConfig {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            strategy: settings.strategy,
            substitution_attempts: settings.substitution_attempts,
            accept_substitutions: settings.accept_substitutions,
            ..Self::default()
        }
    }
}

/// Terminal result of one reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Exact match, or similarity above the success threshold after a full replace
    Success,
    /// Same items, order differs
    OrderMismatchAccepted,
    /// Converged once substitutions were taken into account
    SubstitutedSuccess,
    /// Similarity between the warning and success thresholds
    AcceptedWithWarning,
    /// Similarity below the warning threshold
    Failed,
}

impl ReconcileOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, ReconcileOutcome::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Success => "success",
            ReconcileOutcome::OrderMismatchAccepted => "order_mismatch_accepted",
            ReconcileOutcome::SubstitutedSuccess => "substituted_success",
            ReconcileOutcome::AcceptedWithWarning => "accepted_with_warning",
            ReconcileOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    pub applied_substitutions: SubstitutionMap,
    /// |current ∩ desired| / |desired| at the end of the run
    pub final_similarity: f64,
    pub outcome: ReconcileOutcome,
    /// Successful move operations
    pub moves: usize,
    /// Substitution rounds performed
    pub attempts: u32,
    pub full_replaces: u32,
    /// Desired sequence after substitutions
    pub converged_desired: Vec<ItemId>,
}

#[derive(Debug, Clone, PartialEq)]
enum ReconcileState {
    Normalize,
    DiffApply,
    Verify,
    SubstituteRetry { current: Vec<ItemId> },
    FullReplaceFallback,
    Done(ReconcileOutcome),
}

enum Verification {
    Exact,
    OrderMismatch,
    SetMismatch(Vec<ItemId>),
}

/// Mutable bookkeeping for one `reconcile` call
struct Run<'a> {
    playlist_id: &'a PlaylistId,
    desired: Vec<ItemId>,
    substitutions: SubstitutionMap,
    similarity: f64,
    moves: usize,
    attempts: u32,
    full_replaces: u32,
}

impl Run<'_> {
    fn replaced(&self) -> bool {
        self.full_replaces > 0
    }

    fn into_result(self, outcome: ReconcileOutcome) -> ReconciliationResult {
        ReconciliationResult {
            applied_substitutions: self.substitutions,
            final_similarity: self.similarity,
            outcome,
            moves: self.moves,
            attempts: self.attempts,
            full_replaces: self.full_replaces,
            converged_desired: self.desired,
        }
    }
}

/// Same items as `desired` with no remote duplicates; order is ignored
fn same_items<'a>(current: &'a [ItemId], desired: impl IntoIterator<Item = &'a ItemId>) -> bool {
    let current_set: HashSet<&ItemId> = current.iter().collect();
    current_set.len() == current.len() && current_set == desired.into_iter().collect::<HashSet<&ItemId>>()
}

/// Up to `SAMPLE_IDS` ids of `items` that are absent from `other`
fn sample_difference(items: &[ItemId], other: &[ItemId]) -> Vec<String> {
    let other: HashSet<&ItemId> = other.iter().collect();
    items
        .iter()
        .filter(|id| !other.contains(id))
        .take(SAMPLE_IDS)
        .map(ItemId::to_string)
        .collect()
}

/// |current ∩ desired| / |desired|
pub fn content_overlap(current: &[ItemId], desired: &[ItemId]) -> f64 {
    let desired_set: HashSet<&ItemId> = desired.iter().collect();
    if desired_set.is_empty() {
        return 1.0;
    }
    let current_set: HashSet<&ItemId> = current.iter().collect();
    current_set.intersection(&desired_set).count() as f64 / desired_set.len() as f64
}

pub struct Reconciler {
    accessor: Arc<ResilientAccessor>,
    detector: SubstitutionDetector,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        accessor: Arc<ResilientAccessor>,
        judge: Arc<dyn SimilarityJudge>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            accessor,
            detector: SubstitutionDetector::new(judge),
            config,
        }
    }

    pub fn accessor(&self) -> &Arc<ResilientAccessor> {
        &self.accessor
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Converge `playlist_id` to `desired`.
    #[instrument(skip(self, desired), fields(playlist_id = %playlist_id, desired = desired.len(), strategy = %self.config.strategy))]
    pub async fn reconcile(
        &self,
        playlist_id: &PlaylistId,
        desired: &[ItemId],
    ) -> Result<ReconciliationResult> {
        let mut run = Run {
            playlist_id,
            desired: Vec::new(),
            substitutions: SubstitutionMap::new(),
            similarity: 0.0,
            moves: 0,
            attempts: 0,
            full_replaces: 0,
        };
        let mut state = ReconcileState::Normalize;

        loop {
            debug!(state = ?state, "Reconcile step");
            state = match state {
                ReconcileState::Normalize => {
                    run.desired = normalize(desired.iter().cloned());
                    if run.desired.len() < desired.len() {
                        debug!(
                            dropped = desired.len() - run.desired.len(),
                            "Dropped malformed or duplicate ids"
                        );
                    }

                    if run.desired.is_empty() {
                        info!("Desired sequence empty, clearing playlist");
                        self.accessor.replace_all(playlist_id, &[]).await?;
                        run.full_replaces += 1;
                        run.similarity = 1.0;
                        ReconcileState::Done(ReconcileOutcome::Success)
                    } else {
                        match self.config.strategy {
                            ReconcileStrategy::Incremental => ReconcileState::DiffApply,
                            ReconcileStrategy::FullReplace => ReconcileState::FullReplaceFallback,
                        }
                    }
                }
                ReconcileState::DiffApply => {
                    self.diff_apply(&mut run).await?;
                    ReconcileState::Verify
                }
                ReconcileState::Verify => match self.verify(&run).await? {
                    Verification::Exact => {
                        run.similarity = 1.0;
                        if run.substitutions.is_empty() {
                            ReconcileState::Done(ReconcileOutcome::Success)
                        } else {
                            ReconcileState::Done(ReconcileOutcome::SubstitutedSuccess)
                        }
                    }
                    Verification::OrderMismatch => {
                        run.similarity = 1.0;
                        info!("Content matches but order differs, accepting");
                        ReconcileState::Done(ReconcileOutcome::OrderMismatchAccepted)
                    }
                    Verification::SetMismatch(current) => {
                        run.similarity = content_overlap(&current, &run.desired);
                        debug!(
                            similarity = format_args!("{:.3}", run.similarity),
                            missing = ?sample_difference(&run.desired, &current),
                            extra = ?sample_difference(&current, &run.desired),
                            "Content mismatch after apply"
                        );
                        if self.may_substitute(&run) {
                            ReconcileState::SubstituteRetry { current }
                        } else {
                            self.escalate(&run)
                        }
                    }
                },
                ReconcileState::SubstituteRetry { current } => {
                    run.attempts += 1;
                    self.substitute(&mut run, &current).await
                }
                ReconcileState::FullReplaceFallback => {
                    warn!(
                        items = run.desired.len(),
                        "Falling back to full replace"
                    );
                    self.accessor.replace_all(playlist_id, &run.desired).await?;
                    run.full_replaces += 1;
                    ReconcileState::Verify
                }
                ReconcileState::Done(outcome) => {
                    self.log_outcome(&run, outcome);
                    return Ok(run.into_result(outcome));
                }
            };
        }
    }

    fn may_substitute(&self, run: &Run<'_>) -> bool {
        let incremental_pass_left = match self.config.strategy {
            ReconcileStrategy::Incremental => !run.replaced(),
            ReconcileStrategy::FullReplace => true,
        };
        self.config.accept_substitutions
            && run.attempts < self.config.substitution_attempts
            && incremental_pass_left
    }

    /// Next state once substitution can no longer help
    fn escalate(&self, run: &Run<'_>) -> ReconcileState {
        match self.config.strategy {
            ReconcileStrategy::Incremental if !run.replaced() => ReconcileState::FullReplaceFallback,
            _ => ReconcileState::Done(self.grade(run.similarity)),
        }
    }

    fn grade(&self, similarity: f64) -> ReconcileOutcome {
        if similarity >= self.config.success_threshold {
            ReconcileOutcome::Success
        } else if similarity >= self.config.warning_threshold {
            ReconcileOutcome::AcceptedWithWarning
        } else {
            ReconcileOutcome::Failed
        }
    }

    async fn diff_apply(&self, run: &mut Run<'_>) -> Result<()> {
        let snapshot = self.accessor.list_items(run.playlist_id).await?;
        let plan = diff::plan(&snapshot, &run.desired);

        if plan.is_empty() && snapshot.item_ids() == run.desired {
            debug!("Playlist already matches");
            return Ok(());
        }

        if !plan.removals.to_remove.is_empty() {
            self.accessor
                .remove_slots(run.playlist_id, &plan.removals.to_remove)
                .await?;
        }

        // Slot ids of added items are only known after a re-read
        let (current, slot_of) = if plan.additions.is_empty() {
            (plan.removals.kept_order, plan.removals.slot_of)
        } else {
            let added = self.accessor.add_items(run.playlist_id, &plan.additions).await?;
            if !added.is_complete() {
                warn!(failed = added.failed.len(), "Some items could not be added");
            }
            let fresh = self.accessor.list_items(run.playlist_id).await?;
            let desired_set: HashSet<ItemId> = run.desired.iter().cloned().collect();
            let kept = plan_removals(&fresh, &desired_set);
            (kept.kept_order, kept.slot_of)
        };

        info!(
            removed = plan.removals.to_remove.len(),
            added = plan.additions.len(),
            "Applied diff"
        );

        run.moves += Reorderer::new(&self.accessor)
            .apply(run.playlist_id, &run.desired, &current, &slot_of)
            .await?;
        Ok(())
    }

    async fn verify(&self, run: &Run<'_>) -> Result<Verification> {
        let current = self.accessor.list_items(run.playlist_id).await?.item_ids();

        if current == run.desired {
            return Ok(Verification::Exact);
        }

        if same_items(&current, &run.desired) {
            Ok(Verification::OrderMismatch)
        } else {
            Ok(Verification::SetMismatch(current))
        }
    }

    async fn substitute(&self, run: &mut Run<'_>, current: &[ItemId]) -> ReconcileState {
        let current_set: HashSet<&ItemId> = current.iter().collect();
        let desired_set: HashSet<&ItemId> = run.desired.iter().collect();

        let missing: Vec<ItemId> = run
            .desired
            .iter()
            .filter(|id| !current_set.contains(id))
            .cloned()
            .collect();
        let extra: Vec<ItemId> = normalize(
            current
                .iter()
                .filter(|id| !desired_set.contains(id))
                .cloned(),
        );

        let found = self.detector.detect(&missing, &extra).await;
        if found.is_empty() {
            debug!(
                attempt = run.attempts,
                missing = missing.len(),
                extra = extra.len(),
                "No substitutions found"
            );
            return self.escalate(run);
        }

        run.desired = apply_substitutions(&run.desired, &found);
        run.substitutions.extend(found);

        if same_items(current, &run.desired) {
            run.similarity = 1.0;
            info!(
                substitutions = run.substitutions.len(),
                "Content matches after substitutions"
            );
            return ReconcileState::Done(ReconcileOutcome::SubstitutedSuccess);
        }

        match self.config.strategy {
            ReconcileStrategy::Incremental => ReconcileState::DiffApply,
            ReconcileStrategy::FullReplace => ReconcileState::FullReplaceFallback,
        }
    }

    fn log_outcome(&self, run: &Run<'_>, outcome: ReconcileOutcome) {
        let similarity = format!("{:.1}%", run.similarity * 100.0);
        match outcome {
            ReconcileOutcome::Success
            | ReconcileOutcome::SubstitutedSuccess
            | ReconcileOutcome::OrderMismatchAccepted => info!(
                outcome = %outcome,
                similarity = %similarity,
                moves = run.moves,
                substitutions = run.substitutions.len(),
                "Reconciliation finished"
            ),
            ReconcileOutcome::AcceptedWithWarning => warn!(
                outcome = %outcome,
                similarity = %similarity,
                "Playlist accepted with unresolved differences"
            ),
            ReconcileOutcome::Failed => warn!(
                outcome = %outcome,
                similarity = %similarity,
                "Reconciliation failed to converge"
            ),
        }
    }
}

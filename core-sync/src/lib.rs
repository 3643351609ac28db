//! # Playlist Reconciliation
//!
//! Keeps a remote, ordered playlist in step with a locally computed desired
//! sequence of item ids.
//!
//! ## Overview
//!
//! The remote API only offers add, remove and move; there is no atomic
//! replace, calls are rate limited, and the service sometimes keeps a
//! different but content-identical item in place of the one requested. This
//! crate computes the smallest set of mutations that converges the playlist,
//! verifies the result, compensates for substitutions, and falls back to a
//! full replace when incremental reconciliation does not converge.
//!
//! ## Components
//!
//! - **Resilient Gateway** (`gateway`): Chunking, retry with backoff and per-item fallback
//! - **Normalizer** (`normalizer`): Validity filtering and order-preserving dedup
//! - **Diff Planner** (`diff`): Slots to remove and items to add
//! - **Reorderer** (`reorder`): LIS-anchored minimal move planning
//! - **Substitution Detector** (`substitution`, `similarity`): Recognizes re-uploaded items
//! - **Reconciler** (`reconciler`): State machine tying the above together
//! - **Metrics** (`metrics`): Per-session API usage counters
//! - **Template Cache** (`template_cache`): Last applied sequence per playlist name
//! - **Sync Session** (`session`): Name resolution, create-or-reconcile, skip when unchanged
//! - **Weekly Rotation** (`weekly`): Dated weekly copies with pruning

pub mod diff;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod normalizer;
pub mod reconciler;
pub mod reorder;
pub mod retry;
pub mod session;
pub mod similarity;
pub mod substitution;
pub mod template_cache;
pub mod weekly;

pub use diff::{plan_additions, plan_removals, DiffPlan, RemovalPlan};
pub use error::{Result, SyncError};
pub use gateway::{AccessorConfig, MutationOutcome, ResilientAccessor, ResilientDirectory};
pub use metrics::{ErrorCounters, MetricsSnapshot, OperationKind, OperationMetrics};
pub use normalizer::normalize;
pub use reconciler::{
    ReconcileOutcome, ReconciliationResult, Reconciler, ReconcilerConfig,
};
pub use reorder::{lis_indices, plan_moves, Move, Reorderer};
pub use retry::retry_with_backoff;
pub use session::{SessionAction, SessionReport, SyncSession};
pub use similarity::{content_similarity, MetadataSimilarityJudge};
pub use substitution::{apply_substitutions, SimilarityJudge, SubstitutionDetector, SubstitutionMap};
pub use template_cache::{CacheStats, JsonTemplateCache, PlaylistTemplate, TemplateCache};
pub use weekly::{WeeklyConfig, WeeklyReport, WeeklyRotation};

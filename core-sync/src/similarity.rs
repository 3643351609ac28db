//! # Metadata Similarity
//!
//! [`SimilarityJudge`] backed by track metadata from the remote service.
//!
//! Two items are the same content when their weighted score reaches
//! [`SAME_CONTENT_THRESHOLD`]. Weights are renormalized over the fields both
//! tracks actually have:
//!
//! | Field    | Weight | Scoring                                              |
//! |----------|--------|------------------------------------------------------|
//! | title    | 0.40   | normalized Levenshtein on cleaned titles             |
//! | artists  | 0.35   | Jaccard over lowercase names                         |
//! | album    | 0.15   | exact match, or partial credit above 0.8 similarity  |
//! | duration | 0.10   | full within 2s, half within 10s                      |

use crate::metrics::{OperationKind, OperationMetrics};
use crate::substitution::SimilarityJudge;
use async_trait::async_trait;
use bridge_traits::playlist::{ItemId, TrackMetadata, TrackMetadataSource};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub const SAME_CONTENT_THRESHOLD: f64 = 0.80;

const TITLE_WEIGHT: f64 = 0.40;
const ARTIST_WEIGHT: f64 = 0.35;
const ALBUM_WEIGHT: f64 = 0.15;
const DURATION_WEIGHT: f64 = 0.10;

/// Placeholder title the service returns for unavailable items
const NO_TITLE: &str = "No title";

/// Strip an "Artist - " prefix, bracketed decorations and "feat." clauses.
fn clean_title(title: &str, artists: &[String]) -> String {
    let mut s = title.trim().to_lowercase();

    for sep in [" - ", " – ", " — "] {
        if let Some((left, right)) = s.split_once(sep) {
            let left = left.trim();
            if artists.iter().any(|a| a.trim().to_lowercase() == left) {
                s = right.to_string();
            }
            break;
        }
    }

    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for ch in s.chars() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }

    for marker in [" feat. ", " ft. ", " featuring "] {
        if let Some(at) = out.find(marker) {
            out.truncate(at);
        }
    }

    let cleaned: String = out
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn title_similarity(a: &TrackMetadata, b: &TrackMetadata) -> f64 {
    let left = clean_title(&a.title, &a.artists);
    let right = clean_title(&b.title, &b.artists);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let score = strsim::normalized_levenshtein(&left, &right);
    let (short, long) = if left.len() <= right.len() {
        (&left, &right)
    } else {
        (&right, &left)
    };
    if short.chars().count() >= 3 && long.contains(short.as_str()) {
        score.max(0.9)
    } else {
        score
    }
}

fn artist_similarity(a: &[String], b: &[String]) -> f64 {
    let left: HashSet<String> = a.iter().map(|n| n.trim().to_lowercase()).collect();
    let right: HashSet<String> = b.iter().map(|n| n.trim().to_lowercase()).collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

fn has_title(track: &TrackMetadata) -> bool {
    let title = track.title.trim();
    !title.is_empty() && title != NO_TITLE
}

/// Weighted similarity of two tracks in `0.0..=1.0`; `0.0` when no field is comparable
pub fn content_similarity(a: &TrackMetadata, b: &TrackMetadata) -> f64 {
    let mut score = 0.0;
    let mut max_score = 0.0;

    if has_title(a) && has_title(b) {
        max_score += TITLE_WEIGHT;
        score += title_similarity(a, b) * TITLE_WEIGHT;
    }

    let artists_a: Vec<String> = a.artists.iter().filter(|n| !n.trim().is_empty()).cloned().collect();
    let artists_b: Vec<String> = b.artists.iter().filter(|n| !n.trim().is_empty()).cloned().collect();
    if !artists_a.is_empty() && !artists_b.is_empty() {
        max_score += ARTIST_WEIGHT;
        score += artist_similarity(&artists_a, &artists_b) * ARTIST_WEIGHT;
    }

    let album_a = a.album.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let album_b = b.album.as_deref().map(str::trim).filter(|s| !s.is_empty());
    if let (Some(x), Some(y)) = (album_a, album_b) {
        max_score += ALBUM_WEIGHT;
        let (x, y) = (x.to_lowercase(), y.to_lowercase());
        if x == y {
            score += ALBUM_WEIGHT;
        } else {
            let sim = strsim::normalized_levenshtein(&x, &y);
            if sim > 0.8 {
                score += sim * ALBUM_WEIGHT;
            }
        }
    }

    if let (Some(x), Some(y)) = (
        a.duration_seconds.filter(|d| *d > 0),
        b.duration_seconds.filter(|d| *d > 0),
    ) {
        max_score += DURATION_WEIGHT;
        match x.abs_diff(y) {
            0..=2 => score += DURATION_WEIGHT,
            3..=10 => score += DURATION_WEIGHT / 2.0,
            _ => {}
        }
    }

    if max_score > 0.0 {
        score / max_score
    } else {
        0.0
    }
}

/// Compares items by fetched metadata, caching every lookup for the judge's lifetime
pub struct MetadataSimilarityJudge {
    source: Arc<dyn TrackMetadataSource>,
    metrics: Arc<OperationMetrics>,
    threshold: f64,
    cache: Mutex<HashMap<ItemId, Option<TrackMetadata>>>,
}

impl MetadataSimilarityJudge {
    pub fn new(source: Arc<dyn TrackMetadataSource>, metrics: Arc<OperationMetrics>) -> Self {
        Self {
            source,
            metrics,
            threshold: SAME_CONTENT_THRESHOLD,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    fn cached(&self, id: &ItemId) -> Option<Option<TrackMetadata>> {
        match self.cache.lock() {
            Ok(cache) => cache.get(id).cloned(),
            Err(poisoned) => poisoned.into_inner().get(id).cloned(),
        }
    }

    fn store(&self, id: &ItemId, value: Option<TrackMetadata>) {
        let mut cache = match self.cache.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.insert(id.clone(), value);
    }

    async fn metadata(&self, id: &ItemId) -> Option<TrackMetadata> {
        if let Some(hit) = self.cached(id) {
            return hit;
        }

        self.metrics.record(OperationKind::GetSong);
        let fetched = match self.source.track_metadata(id).await {
            Ok(meta) => meta,
            Err(e) => {
                debug!(item_id = %id, error = %e, "Metadata lookup failed");
                None
            }
        };
        self.store(id, fetched.clone());
        fetched
    }
}

#[async_trait]
impl SimilarityJudge for MetadataSimilarityJudge {
    async fn same_content(&self, a: &ItemId, b: &ItemId) -> bool {
        if a == b {
            return true;
        }

        let (Some(left), Some(right)) = (self.metadata(a).await, self.metadata(b).await) else {
            return false;
        };

        let score = content_similarity(&left, &right);
        let same = score >= self.threshold;
        debug!(
            a = %a,
            b = %b,
            score = format_args!("{:.3}", score),
            same,
            "Compared track metadata"
        );
        same
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, RemoteErrorKind};
    use mockall::mock;

    mock! {
        Source {}

        #[async_trait]
        impl TrackMetadataSource for Source {
            async fn track_metadata(&self, item_id: &ItemId) -> bridge_traits::error::Result<Option<TrackMetadata>>;
        }
    }

    fn track(id: &str, title: &str, artists: &[&str], album: Option<&str>, secs: Option<u32>) -> TrackMetadata {
        TrackMetadata {
            item_id: ItemId::from(id),
            title: title.to_string(),
            artists: artists.iter().map(|s| s.to_string()).collect(),
            album: album.map(str::to_string),
            duration_seconds: secs,
        }
    }

    #[test]
    fn test_clean_title() {
        let artists = vec!["Daft Punk".to_string()];
        assert_eq!(
            clean_title("Daft Punk - One More Time (Official Audio)", &artists),
            "one more time"
        );
        assert_eq!(
            clean_title("Get Lucky [Radio Edit] feat. Pharrell", &artists),
            "get lucky"
        );
        // Prefix kept when it is not one of the artists
        assert_eq!(clean_title("Part 1 - Intro", &artists), "part 1 intro");
    }

    #[test]
    fn test_reupload_scores_as_same() {
        let original = track("aaaaaaaaaaa", "One More Time", &["Daft Punk"], Some("Discovery"), Some(320));
        let reupload = track(
            "bbbbbbbbbbb",
            "Daft Punk - One More Time (Official Audio)",
            &["Daft Punk"],
            Some("Discovery"),
            Some(321),
        );

        assert!(content_similarity(&original, &reupload) >= SAME_CONTENT_THRESHOLD);
    }

    #[test]
    fn test_different_songs_score_low() {
        let a = track("aaaaaaaaaaa", "One More Time", &["Daft Punk"], Some("Discovery"), Some(320));
        let b = track("bbbbbbbbbbb", "Around the World", &["Daft Punk"], Some("Homework"), Some(429));

        assert!(content_similarity(&a, &b) < SAME_CONTENT_THRESHOLD);
    }

    #[test]
    fn test_weights_renormalize_over_present_fields() {
        // Only the duration is comparable, and it matches
        let a = track("aaaaaaaaaaa", "", &[], None, Some(200));
        let b = track("bbbbbbbbbbb", "No title", &[], None, Some(201));
        assert_eq!(content_similarity(&a, &b), 1.0);

        let empty = track("ccccccccccc", "", &[], None, None);
        assert_eq!(content_similarity(&empty, &empty), 0.0);
    }

    #[test]
    fn test_duration_partial_credit() {
        let a = track("aaaaaaaaaaa", "", &[], None, Some(200));
        let b = track("bbbbbbbbbbb", "", &[], None, Some(208));
        assert_eq!(content_similarity(&a, &b), 0.5);
    }

    #[tokio::test]
    async fn test_judge_caches_lookups() {
        let mut source = MockSource::new();
        source
            .expect_track_metadata()
            .times(2)
            .returning(|id| Ok(Some(track(id.as_str(), "Song", &["Artist"], None, Some(180)))));

        let metrics = Arc::new(OperationMetrics::default());
        let judge = MetadataSimilarityJudge::new(Arc::new(source), metrics.clone());
        let a = ItemId::from("aaaaaaaaaaa");
        let b = ItemId::from("bbbbbbbbbbb");

        assert!(judge.same_content(&a, &b).await);
        assert!(judge.same_content(&a, &b).await);
        assert_eq!(metrics.count(OperationKind::GetSong), 2);
    }

    #[tokio::test]
    async fn test_lookup_failure_means_different() {
        let mut source = MockSource::new();
        source
            .expect_track_metadata()
            .returning(|_| Err(BridgeError::remote(RemoteErrorKind::ServerError, "500")));

        let judge = MetadataSimilarityJudge::new(
            Arc::new(source),
            Arc::new(OperationMetrics::default()),
        );

        assert!(
            !judge
                .same_content(&ItemId::from("aaaaaaaaaaa"), &ItemId::from("bbbbbbbbbbb"))
                .await
        );
        assert!(judge.same_content(&ItemId::from("aaaaaaaaaaa"), &ItemId::from("aaaaaaaaaaa")).await);
    }
}

//! # Substitution Detector
//!
//! The remote service sometimes keeps a different, content-identical item in
//! place of the one that was added (a re-upload or re-encode). Without
//! recognizing these, reconciliation would keep adding an item the service
//! never retains.

use crate::normalizer::normalize;
use async_trait::async_trait;
use bridge_traits::playlist::ItemId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Desired item → item the remote serves in its place
pub type SubstitutionMap = BTreeMap<ItemId, ItemId>;

/// Decides whether two items are the same recording
#[async_trait]
pub trait SimilarityJudge: Send + Sync {
    async fn same_content(&self, a: &ItemId, b: &ItemId) -> bool;
}

pub struct SubstitutionDetector {
    judge: Arc<dyn SimilarityJudge>,
}

impl SubstitutionDetector {
    pub fn new(judge: Arc<dyn SimilarityJudge>) -> Self {
        Self { judge }
    }

    /// Pair every missing item with at most one extra item.
    ///
    /// Missing items are visited in the given order; the first extra judged
    /// equivalent wins and leaves the candidate pool.
    pub async fn detect(&self, missing: &[ItemId], extra: &[ItemId]) -> SubstitutionMap {
        let mut map = SubstitutionMap::new();
        if missing.is_empty() || extra.is_empty() {
            return map;
        }

        debug!(
            missing = missing.len(),
            extra = extra.len(),
            "Checking for substitutions"
        );

        let mut pool: Vec<ItemId> = extra.to_vec();
        for wanted in missing {
            let mut matched = None;
            for (i, candidate) in pool.iter().enumerate() {
                if self.judge.same_content(wanted, candidate).await {
                    matched = Some(i);
                    break;
                }
            }

            if let Some(i) = matched {
                let served = pool.remove(i);
                info!(desired = %wanted, served = %served, "Detected substitution");
                map.insert(wanted.clone(), served);
            }

            if pool.is_empty() {
                break;
            }
        }

        map
    }
}

/// Rewrite `desired` through `map`, keeping the result duplicate-free
pub fn apply_substitutions(desired: &[ItemId], map: &SubstitutionMap) -> Vec<ItemId> {
    normalize(
        desired
            .iter()
            .map(|id| map.get(id).unwrap_or(id).clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Judges pairs listed in `same` as equivalent
    struct PairJudge {
        same: HashSet<(ItemId, ItemId)>,
    }

    impl PairJudge {
        fn new(pairs: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                same: pairs
                    .iter()
                    .map(|(a, b)| (ItemId::from(*a), ItemId::from(*b)))
                    .collect(),
            })
        }
    }

    #[async_trait]
    impl SimilarityJudge for PairJudge {
        async fn same_content(&self, a: &ItemId, b: &ItemId) -> bool {
            self.same.contains(&(a.clone(), b.clone()))
        }
    }

    fn id(s: &str) -> ItemId {
        ItemId::from(s)
    }

    #[tokio::test]
    async fn test_detects_single_substitution() {
        let detector = SubstitutionDetector::new(PairJudge::new(&[("XXXXXXXXXXX", "YYYYYYYYYYY")]));

        let map = detector
            .detect(&[id("XXXXXXXXXXX")], &[id("YYYYYYYYYYY")])
            .await;

        assert_eq!(map.get(&id("XXXXXXXXXXX")), Some(&id("YYYYYYYYYYY")));
    }

    #[tokio::test]
    async fn test_matched_extra_not_reused() {
        // Both missing items resemble the same extra; only the first gets it
        let detector = SubstitutionDetector::new(PairJudge::new(&[
            ("AAAAAAAAAAA", "ZZZZZZZZZZZ"),
            ("BBBBBBBBBBB", "ZZZZZZZZZZZ"),
        ]));

        let map = detector
            .detect(&[id("AAAAAAAAAAA"), id("BBBBBBBBBBB")], &[id("ZZZZZZZZZZZ")])
            .await;

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&id("AAAAAAAAAAA")), Some(&id("ZZZZZZZZZZZ")));
    }

    #[tokio::test]
    async fn test_no_match_yields_empty_map() {
        let detector = SubstitutionDetector::new(PairJudge::new(&[]));
        let map = detector
            .detect(&[id("AAAAAAAAAAA")], &[id("ZZZZZZZZZZZ")])
            .await;
        assert!(map.is_empty());
    }

    #[test]
    fn test_apply_substitutions_rewrites_in_place() {
        let mut map = SubstitutionMap::new();
        map.insert(id("bbbbbbbbbbb"), id("yyyyyyyyyyy"));

        let rewritten = apply_substitutions(
            &[id("aaaaaaaaaaa"), id("bbbbbbbbbbb"), id("ccccccccccc")],
            &map,
        );

        assert_eq!(
            rewritten,
            vec![id("aaaaaaaaaaa"), id("yyyyyyyyyyy"), id("ccccccccccc")]
        );
    }

    #[test]
    fn test_apply_substitutions_collapses_collisions() {
        // The substitute is already desired further down
        let mut map = SubstitutionMap::new();
        map.insert(id("aaaaaaaaaaa"), id("ccccccccccc"));

        let rewritten = apply_substitutions(
            &[id("aaaaaaaaaaa"), id("bbbbbbbbbbb"), id("ccccccccccc")],
            &map,
        );

        assert_eq!(rewritten, vec![id("ccccccccccc"), id("bbbbbbbbbbb")]);
    }
}

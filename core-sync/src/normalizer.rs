//! # State Normalizer
//!
//! Canonicalizes a desired sequence: malformed identifiers are dropped and
//! duplicates removed, keeping the first occurrence in place.

use bridge_traits::playlist::ItemId;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Validity-filter and deduplicate `raw`, preserving first-occurrence order.
///
/// Returns an empty sequence when nothing in `raw` is well formed.
pub fn normalize<I, S>(raw: I) -> Vec<ItemId>
where
    I: IntoIterator<Item = S>,
    S: Into<ItemId>,
{
    let mut seen = HashSet::new();
    let mut malformed = 0usize;
    let mut duplicates = 0usize;
    let mut normalized = Vec::new();

    for id in raw.into_iter().map(Into::into) {
        if !id.is_well_formed() {
            malformed += 1;
            continue;
        }
        if seen.insert(id.clone()) {
            normalized.push(id);
        } else {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        warn!(duplicates, "Deduplicated desired sequence");
    }
    if malformed > 0 {
        debug!(malformed, "Dropped malformed item ids");
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "aaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbb";
    const C: &str = "ccccccccccc";

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let normalized = normalize([A, B, A, C]);
        assert_eq!(normalized, vec![ItemId::from(A), ItemId::from(B), ItemId::from(C)]);
    }

    #[test]
    fn test_drops_malformed() {
        let normalized = normalize([A, "short", "has spaces!", B, "toolongtoolong"]);
        assert_eq!(normalized, vec![ItemId::from(A), ItemId::from(B)]);
    }

    #[test]
    fn test_fully_invalid_input_is_empty() {
        assert!(normalize(["", "x", "12345"]).is_empty());
        assert!(normalize(Vec::<ItemId>::new()).is_empty());
    }

    #[test]
    fn test_case_sensitive() {
        let normalized = normalize(["abcdefghijk", "ABCDEFGHIJK"]);
        assert_eq!(normalized.len(), 2);
    }
}

//! # Minimal-Move Reorderer
//!
//! Brings a playlist whose content already matches the desired set into the
//! desired order using as few single-slot moves as possible.
//!
//! ## Algorithm
//!
//! 1. Keep the current items that are also desired and map each to its
//!    desired index.
//! 2. The longest strictly increasing subsequence of those indices is the
//!    anchor set: items already in the right relative order. Anchors are
//!    never moved.
//! 3. Walk the desired order with a cursor on the last placed item. A
//!    non-anchor is moved to sit right after the cursor unless it is already
//!    there, and the in-memory model is updated without re-reading the
//!    playlist.
//!
//! For two permutations of the same set this issues exactly
//! `len - lis_len` moves.

use crate::error::{Result, SyncError};
use crate::gateway::ResilientAccessor;
use bridge_traits::playlist::{ItemId, PlaylistId, SlotId};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// One "move `item` before `before`" operation (`None` = end of playlist)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub item: ItemId,
    pub before: Option<ItemId>,
}

/// Indices into `seq` of one longest strictly increasing subsequence.
///
/// Patience sorting with parent links, O(n log n).
pub fn lis_indices(seq: &[usize]) -> Vec<usize> {
    // tails[k] = index in `seq` of the smallest tail of an increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::with_capacity(seq.len());
    let mut parent: Vec<Option<usize>> = vec![None; seq.len()];

    for (i, &value) in seq.iter().enumerate() {
        let k = tails.partition_point(|&t| seq[t] < value);
        if k > 0 {
            parent[i] = Some(tails[k - 1]);
        }
        if k == tails.len() {
            tails.push(i);
        } else {
            tails[k] = i;
        }
    }

    let mut result = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        result.push(i);
        cursor = parent[i];
    }
    result.reverse();
    result
}

/// Plan the moves that turn `current` into `desired`.
///
/// Items of `current` that are not desired stay where they are; desired items
/// missing from `current` are skipped.
pub fn plan_moves(desired: &[ItemId], current: &[ItemId]) -> Vec<Move> {
    if desired == current {
        return Vec::new();
    }

    let desired_index: HashMap<&ItemId, usize> =
        desired.iter().enumerate().map(|(i, id)| (id, i)).collect();
    let filtered: Vec<&ItemId> = current
        .iter()
        .filter(|id| desired_index.contains_key(id))
        .collect();
    let idx_seq: Vec<usize> = filtered.iter().map(|id| desired_index[*id]).collect();
    let anchors: HashSet<&ItemId> = lis_indices(&idx_seq)
        .into_iter()
        .map(|i| filtered[i])
        .collect();

    let mut model: Vec<ItemId> = current.to_vec();
    let mut moves = Vec::new();
    let mut prev: Option<&ItemId> = None;

    for item in desired {
        let Some(from) = model.iter().position(|id| id == item) else {
            continue;
        };

        if anchors.contains(item) {
            prev = Some(item);
            continue;
        }

        let target = match prev {
            Some(p) => model.iter().position(|id| id == p).map_or(0, |i| i + 1),
            None => 0,
        };
        if model.get(target) == Some(item) {
            prev = Some(item);
            continue;
        }

        let before = model.get(target).cloned();
        let moved = model.remove(from);
        match &before {
            Some(b) => {
                let at = model.iter().position(|id| id == b).unwrap_or(model.len());
                model.insert(at, moved);
            }
            None => model.push(moved),
        }

        moves.push(Move {
            item: item.clone(),
            before,
        });
        prev = Some(item);
    }

    moves
}

/// Applies planned moves through the resilient accessor
pub struct Reorderer<'a> {
    accessor: &'a ResilientAccessor,
}

impl<'a> Reorderer<'a> {
    pub fn new(accessor: &'a ResilientAccessor) -> Self {
        Self { accessor }
    }

    /// Reorder the playlist and return the number of moves that succeeded.
    ///
    /// A failed move is logged and skipped; the caller's verification pass
    /// sees whatever order results.
    pub async fn apply(
        &self,
        playlist_id: &PlaylistId,
        desired: &[ItemId],
        current: &[ItemId],
        slot_of: &HashMap<ItemId, SlotId>,
    ) -> Result<usize> {
        let planned = plan_moves(desired, current);
        if planned.is_empty() {
            debug!("Playlist already in desired order");
            return Ok(0);
        }

        let mut applied = 0;
        for mv in &planned {
            let Some(slot) = slot_of.get(&mv.item) else {
                warn!(item_id = %mv.item, "No slot for item, skipping move");
                continue;
            };
            let before = match &mv.before {
                Some(b) => match slot_of.get(b) {
                    Some(s) => Some(s),
                    None => {
                        warn!(item_id = %mv.item, before = %b, "No slot for move target, skipping");
                        continue;
                    }
                },
                None => None,
            };

            match self.accessor.move_slot(playlist_id, slot, before).await {
                Ok(()) => applied += 1,
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => {
                    warn!(item_id = %mv.item, error = %e, "Move failed, continuing");
                    self.accessor.metrics().record_failure();
                }
            }
        }

        info!(
            planned = planned.len(),
            applied,
            items = current.len(),
            "Reordered playlist"
        );
        Ok(applied)
    }
}

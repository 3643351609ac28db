//! # Diff Planner
//!
//! Computes which slots to remove and which items to add so that the
//! remaining playlist content becomes set-equal to the desired sequence.
//!
//! Removal precedence: a slot is removed when its item id is malformed, when
//! an earlier slot already holds the same item (earliest snapshot position
//! wins, whatever the desired order), or when the item is not desired.

use bridge_traits::playlist::{ItemId, PlaylistEntry, PlaylistSnapshot, SlotId};
use std::collections::{HashMap, HashSet};

/// Outcome of [`plan_removals`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalPlan {
    /// Slots to remove, in snapshot order
    pub to_remove: Vec<PlaylistEntry>,
    /// Items that survive the removals, in snapshot order
    pub kept_order: Vec<ItemId>,
    /// Slot of every surviving item
    pub slot_of: HashMap<ItemId, SlotId>,
}

impl RemovalPlan {
    pub fn kept_set(&self) -> HashSet<ItemId> {
        self.kept_order.iter().cloned().collect()
    }
}

/// Both halves of a diff against one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffPlan {
    pub removals: RemovalPlan,
    pub additions: Vec<ItemId>,
}

impl DiffPlan {
    /// Nothing to remove and nothing to add
    pub fn is_empty(&self) -> bool {
        self.removals.to_remove.is_empty() && self.additions.is_empty()
    }
}

pub fn plan_removals(snapshot: &PlaylistSnapshot, desired: &HashSet<ItemId>) -> RemovalPlan {
    let mut plan = RemovalPlan::default();

    for entry in &snapshot.entries {
        let keep = entry.item_id.is_well_formed()
            && !plan.slot_of.contains_key(&entry.item_id)
            && desired.contains(&entry.item_id);

        if keep {
            plan.kept_order.push(entry.item_id.clone());
            plan.slot_of
                .insert(entry.item_id.clone(), entry.slot_id.clone());
        } else {
            plan.to_remove.push(entry.clone());
        }
    }

    plan
}

/// Desired items not yet present, in desired order
pub fn plan_additions(desired: &[ItemId], present: &HashSet<ItemId>) -> Vec<ItemId> {
    desired
        .iter()
        .filter(|id| !present.contains(*id))
        .cloned()
        .collect()
}

pub fn plan(snapshot: &PlaylistSnapshot, desired: &[ItemId]) -> DiffPlan {
    let desired_set: HashSet<ItemId> = desired.iter().cloned().collect();
    let removals = plan_removals(snapshot, &desired_set);
    let additions = plan_additions(desired, &removals.kept_set());
    DiffPlan {
        removals,
        additions,
    }
}

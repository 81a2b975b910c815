//! Deterministic selection of the actions affected by a change set.

use crate::action::Action;
use crate::core::index::OwnershipIndex;
use crate::core::types::ChangedFiles;

/// An action picked by the selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    /// Position of the action in the catalog.
    pub index: usize,
    /// First changed path (in set order) owned by the action.
    pub matched: String,
}

/// Select every action owning at least one changed path.
///
/// Output follows catalog order and holds each action at most once. Scanning
/// an action stops at its first owned path.
pub fn select_affected<A: Action>(actions: &[A], changed: &ChangedFiles) -> Vec<Selected> {
    actions
        .iter()
        .enumerate()
        .filter_map(|(index, action)| {
            first_match(action, changed).map(|matched| Selected {
                index,
                matched: matched.to_string(),
            })
        })
        .collect()
}

/// Above this many `contains` probes the selector builds an [`OwnershipIndex`].
pub const INDEX_THRESHOLD: usize = 4096;

/// Select affected actions, switching to the ownership index for large
/// catalogs or change sets. Both paths yield identical selections.
pub fn select<A: Action>(actions: &[A], changed: &ChangedFiles) -> Vec<Selected> {
    if actions.len().saturating_mul(changed.len()) > INDEX_THRESHOLD {
        return OwnershipIndex::build(actions).select(actions, changed);
    }
    select_affected(actions, changed)
}

/// First changed path owned by `action`, if any.
pub fn first_match<'c, A: Action + ?Sized>(action: &A, changed: &'c ChangedFiles) -> Option<&'c str> {
    changed.iter().find(|path| action.contains(path))
}

//! Path-segment trie over prefix-shaped ownership rules.
//!
//! Gives the same answer as [`select_affected`](crate::core::selector::select_affected)
//! without testing every action against every changed path. Glob rules that
//! are not prefix-shaped, and actions that expose no ownership, are still
//! matched linearly.

use std::collections::HashMap;

use crate::action::Action;
use crate::core::ownership::OwnershipRule;
use crate::core::path::segments;
use crate::core::selector::Selected;
use crate::core::types::ChangedFiles;

#[derive(Debug, Default)]
struct TrieNode {
    owners: Vec<usize>,
    children: HashMap<String, TrieNode>,
}

impl TrieNode {
    fn insert(&mut self, dir: &str, owner: usize) {
        let mut node = self;
        for segment in segments(dir) {
            node = node.children.entry(segment.to_string()).or_default();
        }
        if !node.owners.contains(&owner) {
            node.owners.push(owner);
        }
    }
}

/// Ownership index for one catalog.
///
/// Built from [`Action::ownership`]; an action that declares ownership must
/// answer [`Action::contains`] consistently with it.
#[derive(Debug, Default)]
pub struct OwnershipIndex {
    root: TrieNode,
    residual: Vec<(usize, Vec<OwnershipRule>)>,
    opaque: Vec<usize>,
    len: usize,
}

impl OwnershipIndex {
    pub fn build<A: Action>(actions: &[A]) -> Self {
        let mut index = Self {
            len: actions.len(),
            ..Self::default()
        };
        for (i, action) in actions.iter().enumerate() {
            let Some(ownership) = action.ownership() else {
                index.opaque.push(i);
                continue;
            };
            let mut leftover = Vec::new();
            for rule in ownership.rules() {
                match rule.as_prefix() {
                    Some(dir) => index.root.insert(dir, i),
                    None => leftover.push(rule.clone()),
                }
            }
            if !leftover.is_empty() {
                index.residual.push((i, leftover));
            }
        }
        index
    }

    /// Select affected actions. `actions` must be the catalog the index was built from.
    pub fn select<A: Action>(&self, actions: &[A], changed: &ChangedFiles) -> Vec<Selected> {
        debug_assert_eq!(actions.len(), self.len, "index built for another catalog");
        let mut first: Vec<Option<&str>> = vec![None; actions.len()];

        // Changed paths iterate in set order, so the first hit per action is
        // the same path a linear scan would report.
        for path in changed.iter() {
            let mut node = &self.root;
            for segment in segments(path) {
                match node.children.get(segment) {
                    Some(child) => {
                        node = child;
                        for &owner in &node.owners {
                            mark(&mut first, owner, path);
                        }
                    }
                    None => break,
                }
            }
            for (owner, rules) in &self.residual {
                if first[*owner].is_none() && rules.iter().any(|rule| rule.matches(path)) {
                    mark(&mut first, *owner, path);
                }
            }
            for &owner in &self.opaque {
                if first[owner].is_none() && actions[owner].contains(path) {
                    mark(&mut first, owner, path);
                }
            }
        }

        first
            .into_iter()
            .enumerate()
            .filter_map(|(index, matched)| {
                matched.map(|path| Selected {
                    index,
                    matched: path.to_string(),
                })
            })
            .collect()
    }
}

fn mark<'c>(first: &mut [Option<&'c str>], owner: usize, path: &'c str) {
    if first[owner].is_none() {
        first[owner] = Some(path);
    }
}

//! Dependent selection
//!
//! Picks the direct children of a head that attach with an allow-listed
//! relation and splits them by side, closest to the head first.

use crate::config::Criteria;
use crate::keys::Side;
use crate::tree::{NodeId, Tree};

/// Dependents of one head, each side ordered head-outward
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependents {
    pub head: NodeId,
    /// Descending ids
    pub left: Vec<NodeId>,
    /// Ascending ids
    pub right: Vec<NodeId>,
}

impl Dependents {
    pub fn new(head: NodeId) -> Self {
        Self {
            head,
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    pub fn side(&self, side: Side) -> &[NodeId] {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.left.contains(&id) || self.right.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }

    pub fn len(&self) -> usize {
        self.left.len() + self.right.len()
    }

    /// Add a dependent at its head-outward position; returns `false` if it
    /// is already present or is the head itself
    pub fn insert(&mut self, id: NodeId) -> bool {
        if id == self.head || self.contains(id) {
            return false;
        }
        if id < self.head {
            let at = self.left.partition_point(|&d| d > id);
            self.left.insert(at, id);
        } else {
            let at = self.right.partition_point(|&d| d < id);
            self.right.insert(at, id);
        }
        true
    }
}

/// Whether `head` is measured at all: a head-tag word spanning more than itself
pub fn is_measurable(tree: &Tree, head: NodeId, criteria: &Criteria) -> bool {
    tree.word(head)
        .is_some_and(|w| w.span.len() > 1 && criteria.is_head_tag(&w.upos))
}

/// Qualifying direct dependents of `head`, or `None` if the head is not measurable
pub fn select_dependents(tree: &Tree, head: NodeId, criteria: &Criteria) -> Option<Dependents> {
    if !is_measurable(tree, head, criteria) {
        return None;
    }
    let word = tree.word(head)?;

    let mut deps = Dependents::new(head);
    for &kid in &word.children {
        let Some(child) = tree.word(kid) else {
            continue;
        };
        if criteria.qualifies(child.relation()) {
            deps.insert(kid);
        }
    }
    Some(deps)
}

//! Discontinuous dependent resolution
//!
//! A descendant that [`Tree::compute_spans`] reattached to the head (a
//! "bastard") is promoted to a dependent of the head in its own right, as
//! long as its line of descent runs through one of the head's
//! qualifying dependents.

use crate::selector::Dependents;
use crate::tree::{NodeId, Tree};
use tracing::trace;

/// Result of climbing a node's governor chain towards a head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Climb {
    /// `ancestor` is the node on the chain whose governor is the head
    Reattached { ancestor: NodeId },
    /// The chain reached the root without passing the head
    Unattached,
    /// The step ceiling was hit (cyclic governor data)
    CycleGuardTripped,
}

/// Climb from `node` until the current node's governor is `head`
pub fn climb_to_head(tree: &Tree, node: NodeId, head: NodeId, max_steps: usize) -> Climb {
    let mut current = node;
    for _ in 0..max_steps {
        let Some(parent) = tree.word(current).and_then(|w| w.governor()) else {
            return Climb::Unattached;
        };
        if parent == head {
            return Climb::Reattached { ancestor: current };
        }
        current = parent;
    }
    Climb::CycleGuardTripped
}

/// A node added to a head's dependents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reattachment {
    pub node: NodeId,
    /// Qualifying direct dependent the node descends from
    pub via: NodeId,
}

/// Add the head's qualifying discontinuous descendants to `deps`
///
/// Candidates are `all_kids(head) \ children(head)`. Nodes already present
/// are left alone, so resolving twice adds nothing the second time.
pub fn resolve(tree: &Tree, deps: &mut Dependents, max_climb: usize) -> Vec<Reattachment> {
    let Some(head) = tree.word(deps.head) else {
        return Vec::new();
    };

    let mut added = Vec::new();
    for &node in head.all_kids.iter() {
        if head.children.contains(&node) || deps.contains(node) {
            continue;
        }
        match climb_to_head(tree, node, head.id, max_climb) {
            Climb::Reattached { ancestor } if deps.contains(ancestor) => {
                trace!(head = head.id, node, via = ancestor, "reattached");
                deps.insert(node);
                added.push(Reattachment {
                    node,
                    via: ancestor,
                });
            }
            Climb::Reattached { ancestor } => {
                trace!(head = head.id, node, via = ancestor, "ancestor does not qualify");
            }
            Climb::Unattached => trace!(head = head.id, node, "not governed by head"),
            Climb::CycleGuardTripped => trace!(head = head.id, node, "climb ceiling reached"),
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::selector::select_dependents;
    use crate::tree::tests::relative_clause_tree;
    use crate::tree::{SpanOptions, Word};

    #[test]
    fn test_relative_clause_reattached() {
        let mut tree = relative_clause_tree();
        tree.compute_spans(&SpanOptions::default());
        let criteria = ExtractionConfig::default().criteria();

        let mut deps = select_dependents(&tree, 2, &criteria).unwrap();
        assert_eq!(deps.right, vec![4, 6]);

        let added = resolve(&tree, &mut deps, 256);
        assert_eq!(added, vec![Reattachment { node: 9, via: 4 }]);
        assert_eq!(deps.left, vec![1]);
        assert_eq!(deps.right, vec![4, 6, 9]);
    }

    #[test]
    fn test_resolve_idempotent() {
        let mut tree = relative_clause_tree();
        tree.compute_spans(&SpanOptions::default());
        let criteria = ExtractionConfig::default().criteria();

        let mut deps = select_dependents(&tree, 2, &criteria).unwrap();
        resolve(&tree, &mut deps, 256);
        let once = deps.clone();

        assert!(resolve(&tree, &mut deps, 256).is_empty());
        assert_eq!(deps, once);
    }

    #[test]
    fn test_non_qualifying_ancestor_discarded() {
        // the relative clause hangs off a non-qualifying `dep` child
        let mut tree = relative_clause_tree();
        tree.words[3].deprel = "dep".to_string();
        tree.compute_spans(&SpanOptions::default());
        let criteria = ExtractionConfig::default().criteria();

        let mut deps = select_dependents(&tree, 2, &criteria).unwrap();
        assert!(tree.word(2).unwrap().bastards.contains(&9));
        assert!(resolve(&tree, &mut deps, 256).is_empty());
        assert_eq!(deps.right, vec![6]);
    }

    #[test]
    fn test_climb_outcomes() {
        let tree = relative_clause_tree();
        assert_eq!(climb_to_head(&tree, 9, 2, 256), Climb::Reattached { ancestor: 4 });
        assert_eq!(climb_to_head(&tree, 10, 2, 256), Climb::Reattached { ancestor: 4 });
        assert_eq!(climb_to_head(&tree, 10, 6, 256), Climb::Unattached);
        assert_eq!(climb_to_head(&tree, 10, 2, 2), Climb::CycleGuardTripped);
    }

    #[test]
    fn test_cyclic_chain_terminates() {
        let mut tree = Tree::new();
        tree.add_word(Word::new(1, "a", "a", "VERB", "obj", Some(2))).unwrap();
        tree.add_word(Word::new(2, "b", "b", "NOUN", "obj", Some(1))).unwrap();
        tree.add_word(Word::new(3, "c", "c", "VERB", "root", None)).unwrap();
        tree.link_children().unwrap();

        assert_eq!(climb_to_head(&tree, 1, 3, 16), Climb::CycleGuardTripped);
    }
}

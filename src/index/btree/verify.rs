//! Full structural check of a tree.

use crate::common::{Error, NodeId, Result};

use super::node::ChildKind;
use super::store::NodeStore;
use super::tree::{BTreeKey, BTreeValue};

/// Shape of a tree that passed [`verify`](crate::BPlusTree::verify).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Number of internal levels above the leaves.
    pub height: usize,
    /// Entry count of every leaf, in key order.
    pub leaf_sizes: Vec<usize>,
    pub internal_nodes: usize,
    pub entries: u64,
}

/// Smallest and largest key of a subtree.
type Bounds<K> = Option<(K, K)>;

struct Walk {
    leaves: Vec<NodeId>,
    leaf_sizes: Vec<usize>,
    leaf_depth: Option<usize>,
    internal_nodes: usize,
}

impl<K: BTreeKey, V: BTreeValue> NodeStore<K, V> {
    /// Check every node reachable from the root and the whole leaf chain.
    ///
    /// # Errors
    /// `Error::InvariantViolation` describing the first broken invariant, or
    /// the I/O and corruption errors of reading the nodes.
    pub fn verify(&mut self) -> Result<VerifyReport> {
        let root = self.header.root;
        let mut walk = Walk {
            leaves: Vec::new(),
            leaf_sizes: Vec::new(),
            leaf_depth: None,
            internal_nodes: 0,
        };
        self.verify_internal(root, NodeId::NONE, 1, &mut walk)?;
        self.verify_chain(&walk.leaves)?;

        let entries: u64 = walk.leaf_sizes.iter().map(|&n| n as u64).sum();
        if entries != self.header.size {
            return Err(Error::invariant(format!(
                "header size {} but leaves hold {} entries",
                self.header.size, entries
            )));
        }

        Ok(VerifyReport {
            height: walk.leaf_depth.unwrap_or(1),
            leaf_sizes: walk.leaf_sizes,
            internal_nodes: walk.internal_nodes,
            entries,
        })
    }

    fn verify_internal(
        &mut self,
        id: NodeId,
        parent: NodeId,
        depth: usize,
        walk: &mut Walk,
    ) -> Result<Bounds<K>> {
        let node = self.read_internal(id)?;
        walk.internal_nodes += 1;

        if node.parent != parent {
            return Err(Error::invariant(format!(
                "{} records parent {}, reached from {}",
                id, node.parent, parent
            )));
        }
        if node.is_empty() {
            return Err(Error::invariant(format!("{} has no children", id)));
        }
        if !node.is_root() && node.len() < self.layout().internal_min() {
            return Err(Error::invariant(format!(
                "{} holds {} children, minimum is {}",
                id,
                node.len(),
                self.layout().internal_min()
            )));
        }

        let sole_child = node.len() == 1;
        let mut bounds: Bounds<K> = None;
        for (slot, (&child, separator)) in node.children.iter().zip(&node.keys).enumerate() {
            let child_bounds = match node.child_kind {
                ChildKind::Internal => self.verify_internal(child, id, depth + 1, walk)?,
                ChildKind::Leaf => {
                    let exempt = node.is_root() && sole_child;
                    self.verify_leaf(child, id, depth, exempt, walk)?
                }
            };

            let Some((min, max)) = child_bounds else {
                // Only the root's only leaf may be empty.
                continue;
            };
            if min != *separator {
                return Err(Error::invariant(format!(
                    "separator {} of {} does not match the subtree minimum",
                    slot, id
                )));
            }
            if let Some(next) = node.keys.get(slot + 1) {
                if max >= *next {
                    return Err(Error::invariant(format!(
                        "subtree {} of {} reaches past the next separator",
                        slot, id
                    )));
                }
            }
            bounds = Some(match bounds {
                Some((lo, _)) => (lo, max),
                None => (min, max),
            });
        }

        if node.keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::invariant(format!("separators of {} are not ascending", id)));
        }
        Ok(bounds)
    }

    fn verify_leaf(
        &mut self,
        id: NodeId,
        parent: NodeId,
        depth: usize,
        exempt: bool,
        walk: &mut Walk,
    ) -> Result<Bounds<K>> {
        let leaf = self.read_leaf(id)?;

        if leaf.parent != parent {
            return Err(Error::invariant(format!(
                "{} records parent {}, reached from {}",
                id, leaf.parent, parent
            )));
        }
        if !exempt && leaf.len() < self.layout().leaf_min() {
            return Err(Error::invariant(format!(
                "{} holds {} entries, minimum is {}",
                id,
                leaf.len(),
                self.layout().leaf_min()
            )));
        }
        if leaf.entries.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(Error::invariant(format!("keys of {} are not ascending", id)));
        }
        match walk.leaf_depth {
            Some(d) if d != depth => {
                return Err(Error::invariant(format!(
                    "{} is at depth {}, other leaves at {}",
                    id, depth, d
                )));
            }
            _ => walk.leaf_depth = Some(depth),
        }

        walk.leaves.push(id);
        walk.leaf_sizes.push(leaf.len());
        Ok(match (leaf.entries.first(), leaf.entries.last()) {
            (Some((min, _)), Some((max, _))) => Some((min.clone(), max.clone())),
            _ => None,
        })
    }

    /// The prev/next chain must visit exactly the leaves found by the walk,
    /// in the same order.
    fn verify_chain(&mut self, leaves: &[NodeId]) -> Result<()> {
        if leaves.first() != Some(&self.header.head) || leaves.last() != Some(&self.header.tail) {
            return Err(Error::invariant("head or tail is not at the end of the leaf order"));
        }

        let mut prev = NodeId::NONE;
        for (i, &id) in leaves.iter().enumerate() {
            let leaf = self.read_leaf(id)?;
            let next = leaves.get(i + 1).copied().unwrap_or(NodeId::NONE);
            if leaf.prev != prev || leaf.next != next {
                return Err(Error::invariant(format!(
                    "{} links to {} / {}, expected {} / {}",
                    id, leaf.prev, leaf.next, prev, next
                )));
            }
            prev = id;
        }
        Ok(())
    }
}

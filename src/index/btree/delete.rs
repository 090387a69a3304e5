//! Deletion with borrowing, merging and root collapse.
//!
//! A node that drops below its minimum occupancy is repaired with the first
//! remedy that applies, always between siblings under the same parent:
//!
//! 1. borrow the first entry of the right sibling, if it can spare one
//! 2. borrow the last entry of the left sibling, if it can spare one
//! 3. merge the right sibling into the node
//! 4. merge the node into the left sibling
//!
//! A merge removes one child from the parent, which may underflow in turn.
//! When the root is left with a single internal child and that child
//! underflows, the child becomes the root.

use tracing::{debug, trace};

use crate::common::{Error, NodeId, Result};

use super::node::{InternalNode, LeafNode};
use super::store::NodeStore;
use super::tree::{BTreeKey, BTreeValue};

impl<K: BTreeKey, V: BTreeValue> NodeStore<K, V> {
    /// Remove `key` and its value.
    ///
    /// # Errors
    /// `Error::KeyNotFound` if `key` is absent; nothing is written.
    pub fn erase_entry(&mut self, key: &K) -> Result<V> {
        self.with_header_rollback(|store| store.apply_erase(key))
    }

    fn apply_erase(&mut self, key: &K) -> Result<V> {
        let leaf_id = self.locate_leaf(key)?.ok_or(Error::KeyNotFound)?;
        let mut leaf = self.read_leaf(leaf_id)?;
        let index = leaf.search(key).map_err(|_| Error::KeyNotFound)?;

        let (_, value) = leaf.entries.remove(index);
        self.header.size -= 1;

        if index == 0 {
            if let Some(first) = leaf.first_key().cloned() {
                self.repair_leading_key(leaf.id, leaf.parent, &first)?;
            }
        }

        if leaf.len() >= self.layout().leaf_min() {
            self.write_leaf(&leaf)?;
        } else {
            let mut pending = self.rebalance_leaf(leaf)?;
            while let Some(node) = pending.take() {
                if node.is_root() || node.len() >= self.layout().internal_min() {
                    self.write_internal(&node)?;
                } else {
                    pending = self.rebalance_internal(node)?;
                }
            }
        }

        self.write_header()?;
        Ok(value)
    }

    /// Fix an underflowing leaf.
    ///
    /// Returns the parent if a merge removed one of its children; the caller
    /// must write it or rebalance it in turn.
    fn rebalance_leaf(&mut self, mut leaf: LeafNode<K, V>) -> Result<Option<InternalNode<K>>> {
        let mut parent = self.read_internal(leaf.parent)?;
        if parent.len() == 1 {
            if parent.is_root() {
                // The root's only leaf may hold any number of entries.
                self.write_leaf(&leaf)?;
                return Ok(None);
            }
            return Err(Error::invariant(format!(
                "{} is the only child of non-root {}",
                leaf.id, parent.id
            )));
        }

        let slot = parent.child_slot(leaf.id)?;
        let min = self.layout().leaf_min();

        let mut right = match parent.children.get(slot + 1) {
            Some(&id) => Some(self.read_leaf(id)?),
            None => None,
        };
        if let Some(right) = right.as_mut().filter(|r| r.len() > min) {
            let entry = right.entries.remove(0);
            leaf.entries.push(entry);
            parent.keys[slot + 1] = right.entries[0].0.clone();

            self.write_leaf(&leaf)?;
            self.write_leaf(right)?;
            self.write_internal(&parent)?;
            self.stats.borrows += 1;
            trace!(leaf = %leaf.id, from = %right.id, "btree.leaf.borrow_right");
            return Ok(None);
        }

        let mut left = match slot.checked_sub(1) {
            Some(left_slot) => Some(self.read_leaf(parent.children[left_slot])?),
            None => None,
        };
        if let Some(left) = left.as_mut().filter(|l| l.len() > min) {
            let entry = left
                .entries
                .pop()
                .ok_or_else(|| Error::invariant(format!("left sibling {} is empty", left.id)))?;
            leaf.entries.insert(0, entry);
            parent.keys[slot] = leaf.entries[0].0.clone();

            self.write_leaf(&leaf)?;
            self.write_leaf(left)?;
            self.write_internal(&parent)?;
            self.stats.borrows += 1;
            trace!(leaf = %leaf.id, from = %left.id, "btree.leaf.borrow_left");
            return Ok(None);
        }

        match (right, left) {
            (Some(right), _) => {
                self.merge_leaves(leaf, right)?;
                parent.remove_slot(slot + 1);
            }
            (None, Some(left)) => {
                self.merge_leaves(left, leaf)?;
                parent.remove_slot(slot);
            }
            (None, None) => {
                return Err(Error::invariant(format!(
                    "{} has no sibling under {}",
                    leaf.id, parent.id
                )));
            }
        }
        Ok(Some(parent))
    }

    /// Move every entry of `right` into `left` and unlink `right` from the
    /// leaf chain. `right`'s record is abandoned.
    fn merge_leaves(&mut self, mut left: LeafNode<K, V>, right: LeafNode<K, V>) -> Result<()> {
        left.entries.extend(right.entries);
        left.next = right.next;

        if right.next.is_some() {
            let mut next = self.read_leaf(right.next)?;
            next.prev = left.id;
            self.write_leaf(&next)?;
        } else {
            self.header.tail = left.id;
        }

        self.write_leaf(&left)?;
        self.stats.merges += 1;
        trace!(into = %left.id, removed = %right.id, len = left.len(), "btree.leaf.merge");
        Ok(())
    }

    /// Fix an underflowing internal node. Same contract as
    /// [`rebalance_leaf`](Self::rebalance_leaf).
    fn rebalance_internal(&mut self, mut node: InternalNode<K>) -> Result<Option<InternalNode<K>>> {
        let mut parent = self.read_internal(node.parent)?;
        if parent.len() == 1 {
            if parent.is_root() {
                self.collapse_root(node, parent.id)?;
                return Ok(None);
            }
            return Err(Error::invariant(format!(
                "{} is the only child of non-root {}",
                node.id, parent.id
            )));
        }

        let slot = parent.child_slot(node.id)?;
        let min = self.layout().internal_min();
        let kind = node.child_kind;

        let mut right = match parent.children.get(slot + 1) {
            Some(&id) => Some(self.read_internal(id)?),
            None => None,
        };
        if let Some(right) = right.as_mut().filter(|r| r.len() > min) {
            let (key, child) = right.remove_slot(0);
            node.keys.push(key);
            node.children.push(child);
            parent.keys[slot + 1] = right.keys[0].clone();

            self.write_internal(&node)?;
            self.write_internal(right)?;
            self.write_internal(&parent)?;
            self.set_parent(child, kind, node.id)?;
            self.stats.borrows += 1;
            trace!(node = %node.id, from = %right.id, "btree.internal.borrow_right");
            return Ok(None);
        }

        let mut left = match slot.checked_sub(1) {
            Some(left_slot) => Some(self.read_internal(parent.children[left_slot])?),
            None => None,
        };
        if let Some(left) = left.as_mut().filter(|l| l.len() > min) {
            let last = left.len() - 1;
            let (key, child) = left.remove_slot(last);
            node.keys.insert(0, key);
            node.children.insert(0, child);
            parent.keys[slot] = node.keys[0].clone();

            self.write_internal(&node)?;
            self.write_internal(left)?;
            self.write_internal(&parent)?;
            self.set_parent(child, kind, node.id)?;
            self.stats.borrows += 1;
            trace!(node = %node.id, from = %left.id, "btree.internal.borrow_left");
            return Ok(None);
        }

        match (right, left) {
            (Some(right), _) => {
                self.merge_internals(node, right)?;
                parent.remove_slot(slot + 1);
            }
            (None, Some(left)) => {
                self.merge_internals(left, node)?;
                parent.remove_slot(slot);
            }
            (None, None) => {
                return Err(Error::invariant(format!(
                    "{} has no sibling under {}",
                    node.id, parent.id
                )));
            }
        }
        Ok(Some(parent))
    }

    /// Move every child of `right` into `left`. `right`'s record is abandoned.
    fn merge_internals(&mut self, mut left: InternalNode<K>, right: InternalNode<K>) -> Result<()> {
        for &child in &right.children {
            self.set_parent(child, right.child_kind, left.id)?;
        }
        left.keys.extend(right.keys);
        left.children.extend(right.children);

        self.write_internal(&left)?;
        self.stats.merges += 1;
        trace!(into = %left.id, removed = %right.id, len = left.len(), "btree.internal.merge");
        Ok(())
    }

    /// Make `node`, the only child of the root, the new root.
    fn collapse_root(&mut self, mut node: InternalNode<K>, old_root: NodeId) -> Result<()> {
        node.parent = NodeId::NONE;
        self.write_internal(&node)?;
        self.header.root = node.id;
        self.stats.root_changes += 1;
        debug!(old_root = %old_root, new_root = %node.id, "btree.root.collapse");
        Ok(())
    }
}

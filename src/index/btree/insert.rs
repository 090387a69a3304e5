//! Insertion with leaf and internal splits.
//!
//! ```text
//! before (L = 4)             after inserting 5
//!
//!      [1]                        [1 | 3]
//!       |                        /       \
//!  [1 2 3 4]                 [1 2] <-> [3 4 5]
//! ```
//!
//! An overflowing leaf keeps the lower `len / 2` entries and moves the rest
//! into a new right sibling. The sibling's first key is then inserted into the
//! parent, which may overflow and split in turn. A split root is replaced by a
//! new root with two children.

use tracing::{debug, trace};

use crate::common::{Error, NodeId, Result};

use super::cursor::Position;
use super::node::{ChildKind, InternalNode, LeafNode};
use super::store::NodeStore;
use super::tree::{BTreeKey, BTreeValue};

impl<K: BTreeKey, V: BTreeValue> NodeStore<K, V> {
    /// Insert `(key, value)` and return where the entry ended up.
    ///
    /// # Errors
    /// `Error::DuplicateKey` if `key` is present; nothing is written.
    pub fn insert_entry(&mut self, key: K, value: V) -> Result<Position> {
        self.with_header_rollback(|store| store.apply_insert(key, value))
    }

    fn apply_insert(&mut self, key: K, value: V) -> Result<Position> {
        let leaf_id = match self.locate_leaf(&key)? {
            Some(id) => id,
            None => self.header.head,
        };

        let mut leaf = self.read_leaf(leaf_id)?;
        let index = match leaf.search(&key) {
            Ok(_) => return Err(Error::DuplicateKey),
            Err(index) => index,
        };
        leaf.entries.insert(index, (key, value));
        self.header.size += 1;

        // A new first entry only happens in the head leaf: the key is the new
        // tree minimum, so every separator on the leftmost path follows it.
        if index == 0 {
            let first = leaf.entries[0].0.clone();
            self.repair_leading_key(leaf.id, leaf.parent, &first)?;
        }

        let position = if leaf.len() > self.layout().leaf_capacity() {
            self.split_leaf(leaf, index)?
        } else {
            self.write_leaf(&leaf)?;
            Position::new(leaf.id, index)
        };

        self.write_header()?;
        Ok(position)
    }

    /// Split an overflowing leaf and push the separator upwards.
    ///
    /// `index` is where the new entry sits in `leaf`; the returned position
    /// tracks it into whichever half it lands in.
    fn split_leaf(&mut self, mut leaf: LeafNode<K, V>, index: usize) -> Result<Position> {
        let mid = leaf.len() / 2;
        let right_id = self.allocate_leaf();

        let right = LeafNode {
            id: right_id,
            parent: leaf.parent,
            prev: leaf.id,
            next: leaf.next,
            entries: leaf.entries.split_off(mid),
        };

        if leaf.next.is_some() {
            let mut next = self.read_leaf(leaf.next)?;
            next.prev = right_id;
            self.write_leaf(&next)?;
        } else {
            self.header.tail = right_id;
        }
        leaf.next = right_id;

        self.write_leaf(&right)?;
        self.write_leaf(&leaf)?;
        self.stats.leaf_splits += 1;
        trace!(
            leaf = %leaf.id,
            sibling = %right_id,
            left_len = leaf.len(),
            right_len = right.len(),
            "btree.leaf.split"
        );

        let separator = right.entries[0].0.clone();
        self.insert_separator(leaf.parent, separator, right_id)?;

        Ok(if index < mid {
            Position::new(leaf.id, index)
        } else {
            Position::new(right_id, index - mid)
        })
    }

    /// Add `(separator, child)` to `parent`, splitting ancestors as needed.
    fn insert_separator(&mut self, parent: NodeId, separator: K, child: NodeId) -> Result<()> {
        let mut pending = Some((parent, separator, child));

        while let Some((parent, separator, child)) = pending.take() {
            let mut node = self.read_internal(parent)?;
            node.insert_child(separator, child);

            if node.len() <= self.layout().internal_capacity() {
                self.write_internal(&node)?;
            } else {
                pending = self.split_internal(node)?;
            }
        }
        Ok(())
    }

    /// Split an overflowing internal node.
    ///
    /// Returns the separator still to be inserted into the parent, or `None`
    /// when the root split and a new root now holds both halves.
    fn split_internal(&mut self, mut node: InternalNode<K>) -> Result<Option<(NodeId, K, NodeId)>> {
        let mid = node.len() / 2;
        let sibling_id = self.allocate_internal();

        let mut sibling = InternalNode {
            id: sibling_id,
            parent: node.parent,
            child_kind: node.child_kind,
            keys: node.keys.split_off(mid),
            children: node.children.split_off(mid),
        };

        let grew_root = node.is_root();
        if grew_root {
            let root_id = self.allocate_internal();
            let root = InternalNode {
                id: root_id,
                parent: NodeId::NONE,
                child_kind: ChildKind::Internal,
                keys: vec![node.keys[0].clone(), sibling.keys[0].clone()],
                children: vec![node.id, sibling_id],
            };
            node.parent = root_id;
            sibling.parent = root_id;

            self.write_internal(&root)?;
            self.header.root = root_id;
            self.stats.root_changes += 1;
            debug!(old_root = %node.id, new_root = %root_id, "btree.root.grow");
        }

        self.write_internal(&node)?;
        self.write_internal(&sibling)?;
        for &child in &sibling.children {
            self.set_parent(child, sibling.child_kind, sibling_id)?;
        }

        self.stats.internal_splits += 1;
        trace!(
            node = %node.id,
            sibling = %sibling_id,
            left_len = node.len(),
            right_len = sibling.len(),
            "btree.internal.split"
        );

        if grew_root {
            Ok(None)
        } else {
            Ok(Some((node.parent, sibling.keys[0].clone(), sibling_id)))
        }
    }
}

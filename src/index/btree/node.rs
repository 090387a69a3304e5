//! In-memory views of leaf and internal node records.
//!
//! A node is decoded from its record in full, edited as plain vectors, and
//! encoded back in full. While a mutation is in progress a node may hold one
//! entry more than its capacity; it is split before it is written.

use crate::common::{Error, NodeId, Result};
use crate::storage::record::{RecordHeader, RecordKind};
use crate::storage::Storable;

use super::layout::NodeLayout;

/// What the children of an internal node are.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Internal = 0,
    Leaf = 1,
}

impl ChildKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ChildKind::Internal),
            1 => Some(ChildKind::Leaf),
            _ => None,
        }
    }
}

/// A leaf: sorted `(key, value)` entries plus its place in the leaf chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode<K, V> {
    /// Where this leaf lives; not part of the record.
    pub id: NodeId,
    pub parent: NodeId,
    pub prev: NodeId,
    pub next: NodeId,
    pub entries: Vec<(K, V)>,
}

impl<K: Storable + Ord, V: Storable> LeafNode<K, V> {
    pub fn new(id: NodeId, parent: NodeId) -> Self {
        Self {
            id,
            parent,
            prev: NodeId::NONE,
            next: NodeId::NONE,
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn first_key(&self) -> Option<&K> {
        self.entries.first().map(|(k, _)| k)
    }

    /// `Ok(index)` if `key` is present, otherwise `Err(insertion point)`.
    pub fn search(&self, key: &K) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.cmp(key))
    }

    pub fn encode(&self, layout: &NodeLayout) -> Result<Vec<u8>> {
        if self.entries.len() > layout.leaf_capacity() {
            return Err(Error::invariant(format!(
                "leaf {} holds {} entries, capacity is {}",
                self.id,
                self.entries.len(),
                layout.leaf_capacity()
            )));
        }

        let mut buf = vec![0u8; layout.leaf_record_size()];
        self.parent
            .write_bytes(&mut buf[NodeLayout::LEAF_OFFSET_PARENT..]);
        self.prev.write_bytes(&mut buf[NodeLayout::LEAF_OFFSET_PREV..]);
        self.next.write_bytes(&mut buf[NodeLayout::LEAF_OFFSET_NEXT..]);
        (self.entries.len() as u32).write_bytes(&mut buf[NodeLayout::LEAF_OFFSET_COUNT..]);

        for (i, (key, value)) in self.entries.iter().enumerate() {
            let at = layout.leaf_entry_offset(i);
            key.write_bytes(&mut buf[at..]);
            value.write_bytes(&mut buf[at + layout.key_size()..]);
        }

        RecordHeader::seal(&mut buf, RecordKind::Leaf);
        Ok(buf)
    }

    pub fn decode(id: NodeId, layout: &NodeLayout, buf: &[u8]) -> Result<Self> {
        RecordHeader::check(buf, id.offset(), RecordKind::Leaf)?;

        let count = u32::read_bytes(&buf[NodeLayout::LEAF_OFFSET_COUNT..]) as usize;
        if count > layout.leaf_capacity() {
            return Err(Error::corrupted(
                id.offset(),
                format!("leaf count {} exceeds capacity {}", count, layout.leaf_capacity()),
            ));
        }

        let entries = (0..count)
            .map(|i| {
                let at = layout.leaf_entry_offset(i);
                (
                    K::read_bytes(&buf[at..]),
                    V::read_bytes(&buf[at + layout.key_size()..]),
                )
            })
            .collect();

        Ok(Self {
            id,
            parent: NodeId::read_bytes(&buf[NodeLayout::LEAF_OFFSET_PARENT..]),
            prev: NodeId::read_bytes(&buf[NodeLayout::LEAF_OFFSET_PREV..]),
            next: NodeId::read_bytes(&buf[NodeLayout::LEAF_OFFSET_NEXT..]),
            entries,
        })
    }
}

/// An internal node: `keys[i]` is the smallest key reachable through
/// `children[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode<K> {
    /// Where this node lives; not part of the record.
    pub id: NodeId,
    pub parent: NodeId,
    pub child_kind: ChildKind,
    pub keys: Vec<K>,
    pub children: Vec<NodeId>,
}

impl<K: Storable + Ord> InternalNode<K> {
    pub fn new(id: NodeId, parent: NodeId, child_kind: ChildKind) -> Self {
        Self {
            id,
            parent,
            child_kind,
            keys: Vec::new(),
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Slot of the child whose subtree may contain `key`, or `None` if `key`
    /// is below every separator.
    pub fn descend_slot(&self, key: &K) -> Option<usize> {
        self.keys.partition_point(|k| k <= key).checked_sub(1)
    }

    /// Position of `child` among this node's children.
    ///
    /// # Errors
    /// `Error::InvariantViolation` if `child` is not listed: the parent link
    /// of `child` and this node disagree.
    pub fn child_slot(&self, child: NodeId) -> Result<usize> {
        self.children
            .iter()
            .position(|&c| c == child)
            .ok_or_else(|| {
                Error::invariant(format!("{} is not a child of {}", child, self.id))
            })
    }

    /// Insert a separator and the child it leads to, keeping keys sorted.
    pub fn insert_child(&mut self, key: K, child: NodeId) -> usize {
        let slot = self.keys.partition_point(|k| k <= &key);
        self.keys.insert(slot, key);
        self.children.insert(slot, child);
        slot
    }

    pub fn remove_slot(&mut self, slot: usize) -> (K, NodeId) {
        (self.keys.remove(slot), self.children.remove(slot))
    }

    pub fn encode(&self, layout: &NodeLayout) -> Result<Vec<u8>> {
        if self.children.len() > layout.internal_capacity() || self.keys.len() != self.children.len()
        {
            return Err(Error::invariant(format!(
                "internal node {} holds {} keys and {} children, capacity is {}",
                self.id,
                self.keys.len(),
                self.children.len(),
                layout.internal_capacity()
            )));
        }

        let mut buf = vec![0u8; layout.internal_record_size()];
        self.parent
            .write_bytes(&mut buf[NodeLayout::INTERNAL_OFFSET_PARENT..]);
        (self.children.len() as u32).write_bytes(&mut buf[NodeLayout::INTERNAL_OFFSET_COUNT..]);
        buf[NodeLayout::INTERNAL_OFFSET_KIND] = self.child_kind as u8;

        for (i, (key, child)) in self.keys.iter().zip(&self.children).enumerate() {
            key.write_bytes(&mut buf[layout.internal_key_offset(i)..]);
            child.write_bytes(&mut buf[layout.internal_child_offset(i)..]);
        }

        RecordHeader::seal(&mut buf, RecordKind::Internal);
        Ok(buf)
    }

    pub fn decode(id: NodeId, layout: &NodeLayout, buf: &[u8]) -> Result<Self> {
        RecordHeader::check(buf, id.offset(), RecordKind::Internal)?;

        let count = u32::read_bytes(&buf[NodeLayout::INTERNAL_OFFSET_COUNT..]) as usize;
        if count > layout.internal_capacity() {
            return Err(Error::corrupted(
                id.offset(),
                format!(
                    "internal count {} exceeds capacity {}",
                    count,
                    layout.internal_capacity()
                ),
            ));
        }
        let child_kind = ChildKind::from_u8(buf[NodeLayout::INTERNAL_OFFSET_KIND])
            .ok_or_else(|| Error::corrupted(id.offset(), "unknown child kind"))?;

        let keys = (0..count)
            .map(|i| K::read_bytes(&buf[layout.internal_key_offset(i)..]))
            .collect();
        let children = (0..count)
            .map(|i| NodeId::read_bytes(&buf[layout.internal_child_offset(i)..]))
            .collect();

        Ok(Self {
            id,
            parent: NodeId::read_bytes(&buf[NodeLayout::INTERNAL_OFFSET_PARENT..]),
            child_kind,
            keys,
            children,
        })
    }
}

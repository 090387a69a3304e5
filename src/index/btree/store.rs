//! Node store - typed node I/O on top of the disk manager.
//!
//! The [`NodeStore`] owns the backing file, the in-memory copy of the tree
//! header, and the layout derived from it. Every node read and write of the
//! tree engines goes through here; there is no caching, a node is read from
//! the file each time it is needed.

use std::marker::PhantomData;

use tracing::debug;

use crate::common::{Error, NodeId, Result, TreeConfig};
use crate::storage::record::TreeHeader;
use crate::storage::{DiskManager, Storable};

use super::layout::NodeLayout;
use super::node::{ChildKind, InternalNode, LeafNode};
use super::stats::TreeStats;
use super::tree::{BTreeKey, BTreeValue};

/// Owns the store file and the tree header for one tree.
///
/// # Allocation
/// New nodes are placed at `header.eof`, which only moves forward. Space
/// left behind by merged nodes is never reused; [`NodeStore::reset`] is the
/// only way to reclaim it.
pub struct NodeStore<K, V> {
    disk: DiskManager,
    layout: NodeLayout,
    pub(crate) header: TreeHeader,
    pub(crate) stats: TreeStats,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K: BTreeKey, V: BTreeValue> NodeStore<K, V> {
    /// Initialize an empty tree in a new (empty) file.
    pub fn create(mut disk: DiskManager, config: &TreeConfig) -> Result<Self> {
        let layout = NodeLayout::for_types::<K, V>(config)?;
        disk.set_sync_on_write(config.sync_on_write);
        disk.truncate()?;

        let mut store = Self {
            disk,
            layout,
            header: layout.new_header(),
            stats: TreeStats::default(),
            _marker: PhantomData,
        };
        store.build_empty()?;

        debug!(
            leaf_capacity = layout.leaf_capacity(),
            internal_capacity = layout.internal_capacity(),
            "btree.store.create"
        );
        Ok(store)
    }

    /// Load the tree stored in an existing file.
    ///
    /// # Errors
    /// - `Error::Corrupted` if the header record fails validation
    /// - `Error::InvalidConfig` if the stored key/value sizes differ from
    ///   `K`/`V`
    pub fn open(mut disk: DiskManager, config: &TreeConfig) -> Result<Self> {
        disk.set_sync_on_write(config.sync_on_write);

        let mut buf = [0u8; TreeHeader::SIZE];
        disk.read_at(0, &mut buf)?;
        let header = TreeHeader::from_bytes(&buf)?;
        let layout = NodeLayout::from_header::<K, V>(&header)?;

        if header.root.is_none() || header.head.is_none() || header.tail.is_none() {
            return Err(Error::corrupted(0, "header has no root or leaf chain"));
        }
        if header.eof > disk.len() {
            return Err(Error::corrupted(
                0,
                format!("allocation mark {} beyond end of store {}", header.eof, disk.len()),
            ));
        }

        debug!(
            size = header.size,
            root = %header.root,
            leaf_capacity = layout.leaf_capacity(),
            internal_capacity = layout.internal_capacity(),
            "btree.store.open"
        );
        Ok(Self {
            disk,
            layout,
            header,
            stats: TreeStats {
                records_read: 1,
                ..Default::default()
            },
            _marker: PhantomData,
        })
    }

    /// Write a fresh header plus a root holding one empty leaf.
    fn build_empty(&mut self) -> Result<()> {
        let root_id = self.allocate_internal();
        let leaf_id = self.allocate_leaf();

        let leaf = LeafNode::new(leaf_id, root_id);
        let mut root = InternalNode::new(root_id, NodeId::NONE, ChildKind::Leaf);
        // Never consulted while the tree is empty; the first insert replaces it.
        root.keys.push(K::read_bytes(&vec![0u8; K::SIZE]));
        root.children.push(leaf_id);

        self.header.root = root_id;
        self.header.head = leaf_id;
        self.header.tail = leaf_id;
        self.header.size = 0;

        self.write_leaf(&leaf)?;
        self.write_internal(&root)?;
        self.write_header()
    }

    /// Discard every node and start over with an empty tree.
    pub fn reset(&mut self) -> Result<()> {
        self.disk.truncate()?;
        self.header = self.layout.new_header();
        self.build_empty()?;
        debug!("btree.store.reset");
        Ok(())
    }

    #[inline]
    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    #[inline]
    pub fn header(&self) -> &TreeHeader {
        &self.header
    }

    #[inline]
    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    /// Reserve `size` bytes at the end of the store.
    fn allocate(&mut self, size: usize) -> NodeId {
        let id = NodeId::new(self.header.eof);
        self.header.eof += size as u64;
        self.stats.nodes_allocated += 1;
        id
    }

    pub fn allocate_leaf(&mut self) -> NodeId {
        self.allocate(self.layout.leaf_record_size())
    }

    pub fn allocate_internal(&mut self) -> NodeId {
        self.allocate(self.layout.internal_record_size())
    }

    pub fn read_leaf(&mut self, id: NodeId) -> Result<LeafNode<K, V>> {
        self.check_location(id)?;
        let mut buf = vec![0u8; self.layout.leaf_record_size()];
        self.disk.read_at(id.offset(), &mut buf)?;
        self.stats.records_read += 1;
        LeafNode::decode(id, &self.layout, &buf)
    }

    pub fn write_leaf(&mut self, leaf: &LeafNode<K, V>) -> Result<()> {
        self.check_location(leaf.id)?;
        let buf = leaf.encode(&self.layout)?;
        self.disk.write_at(leaf.id.offset(), &buf)?;
        self.stats.records_written += 1;
        Ok(())
    }

    pub fn read_internal(&mut self, id: NodeId) -> Result<InternalNode<K>> {
        self.check_location(id)?;
        let mut buf = vec![0u8; self.layout.internal_record_size()];
        self.disk.read_at(id.offset(), &mut buf)?;
        self.stats.records_read += 1;
        InternalNode::decode(id, &self.layout, &buf)
    }

    pub fn write_internal(&mut self, node: &InternalNode<K>) -> Result<()> {
        self.check_location(node.id)?;
        let buf = node.encode(&self.layout)?;
        self.disk.write_at(node.id.offset(), &buf)?;
        self.stats.records_written += 1;
        Ok(())
    }

    pub fn write_header(&mut self) -> Result<()> {
        let buf = self.header.to_bytes();
        self.disk.write_at(0, &buf)?;
        self.stats.records_written += 1;
        Ok(())
    }

    /// Run one tree mutation against the in-memory header.
    ///
    /// The header is only written once the mutation's node writes are done.
    /// If `op` fails part way, the in-memory copy is put back to the last
    /// value written so a later mutation cannot persist a half-applied
    /// `size`, `eof` or root.
    pub fn with_header_rollback<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = self.header.clone();
        let result = op(self);
        if result.is_err() {
            self.header = saved;
        }
        result
    }

    /// Point `child`'s parent link at `parent`.
    pub fn set_parent(&mut self, child: NodeId, kind: ChildKind, parent: NodeId) -> Result<()> {
        match kind {
            ChildKind::Leaf => {
                let mut leaf = self.read_leaf(child)?;
                leaf.parent = parent;
                self.write_leaf(&leaf)
            }
            ChildKind::Internal => {
                let mut node = self.read_internal(child)?;
                node.parent = parent;
                self.write_internal(&node)
            }
        }
    }

    pub fn sync(&mut self) -> Result<()> {
        self.disk.sync()
    }

    /// Node locations are always past the header and below the allocation mark.
    fn check_location(&self, id: NodeId) -> Result<()> {
        if id.offset() < TreeHeader::SIZE as u64 || id.offset() >= self.header.eof {
            return Err(Error::invariant(format!(
                "{} is outside the allocated region [{}, {})",
                id,
                TreeHeader::SIZE,
                self.header.eof
            )));
        }
        Ok(())
    }
}

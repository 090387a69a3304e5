//! Descent from the root to the leaf responsible for a key.

use crate::common::{NodeId, Result};

use super::node::ChildKind;
use super::store::NodeStore;
use super::tree::{BTreeKey, BTreeValue};

impl<K: BTreeKey, V: BTreeValue> NodeStore<K, V> {
    /// Find the leaf whose key range covers `key`.
    ///
    /// Returns `None` when the tree is empty or `key` is smaller than every
    /// key in the tree; in both cases the key would belong in the head leaf.
    pub fn locate_leaf(&mut self, key: &K) -> Result<Option<NodeId>> {
        if self.header.size == 0 {
            return Ok(None);
        }

        let mut id = self.header.root;
        loop {
            let node = self.read_internal(id)?;
            let Some(slot) = node.descend_slot(key) else {
                return Ok(None);
            };
            match node.child_kind {
                ChildKind::Leaf => return Ok(Some(node.children[slot])),
                ChildKind::Internal => id = node.children[slot],
            }
        }
    }

    /// Walk up from `child` (whose parent is `parent_id`), setting the
    /// separator that leads to it to `key` for as long as the walk follows
    /// leftmost children.
    ///
    /// Used after the smallest key under `child` changed.
    pub(crate) fn repair_leading_key(
        &mut self,
        mut child: NodeId,
        mut parent_id: NodeId,
        key: &K,
    ) -> Result<()> {
        while parent_id.is_some() {
            let mut parent = self.read_internal(parent_id)?;
            let slot = parent.child_slot(child)?;
            if parent.keys[slot] != *key {
                parent.keys[slot] = key.clone();
                self.write_internal(&parent)?;
            }
            if slot != 0 {
                break;
            }
            child = parent.id;
            parent_id = parent.parent;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::common::TreeConfig;
    use crate::storage::DiskManager;

    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_locate_in_empty_tree() {
        let dir = tempdir().unwrap();
        let disk = DiskManager::create(dir.path().join("tree.db")).unwrap();
        let mut store = NodeStore::<u32, u32>::create(disk, &TreeConfig::default()).unwrap();

        assert_eq!(store.locate_leaf(&0).unwrap(), None);
        assert_eq!(store.locate_leaf(&42).unwrap(), None);
    }

    #[test]
    fn test_locate_below_minimum() {
        let dir = tempdir().unwrap();
        let disk = DiskManager::create(dir.path().join("tree.db")).unwrap();
        let mut store = NodeStore::<u32, u32>::create(disk, &TreeConfig::default()).unwrap();

        store.insert_entry(10, 1).unwrap();
        store.insert_entry(20, 2).unwrap();

        let head = store.header().head;
        assert_eq!(store.locate_leaf(&9).unwrap(), None);
        assert_eq!(store.locate_leaf(&10).unwrap(), Some(head));
        assert_eq!(store.locate_leaf(&15).unwrap(), Some(head));
        assert_eq!(store.locate_leaf(&1000).unwrap(), Some(head));
    }
}

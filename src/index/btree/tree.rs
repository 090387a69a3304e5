//! The public tree handle.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::common::{Error, Result, TreeConfig};
use crate::storage::{DiskManager, Storable};

use super::cursor::{Cursor, CursorMut, Iter};
use super::stats::TreeStats;
use super::store::NodeStore;
use super::verify::VerifyReport;

/// Key types: fixed-width and totally ordered.
pub trait BTreeKey: Storable + Ord + Clone {}

impl<T: Storable + Ord + Clone> BTreeKey for T {}

/// Value types: fixed-width.
pub trait BTreeValue: Storable + Clone {}

impl<T: Storable + Clone> BTreeValue for T {}

/// A B+ tree stored in a single file.
///
/// Every node is read from the file when it is needed and written back as
/// soon as it changes, so the tree never holds more than a few nodes in
/// memory.
///
/// # Thread Safety
/// Lookups and cursors take `&self` and serialize on an internal mutex.
/// Mutations take `&mut self`, so the borrow checker guarantees no cursor is
/// alive while the tree changes shape.
///
/// # Example
/// ```no_run
/// use bplusdb::{BPlusTree, TreeConfig};
///
/// let mut tree = BPlusTree::<u64, [u8; 16]>::open("index.db", TreeConfig::default())?;
/// tree.insert(7, *b"seven...........")?;
/// assert_eq!(tree.at(&7)?, *b"seven...........");
///
/// tree.erase(&7)?;
/// assert!(tree.is_empty());
/// # Ok::<(), bplusdb::Error>(())
/// ```
pub struct BPlusTree<K, V> {
    path: PathBuf,
    pub(super) store: Mutex<NodeStore<K, V>>,
}

impl<K: BTreeKey, V: BTreeValue> BPlusTree<K, V> {
    /// Open the tree stored at `path`, creating an empty one if the file is
    /// missing or empty.
    ///
    /// For an existing store the capacities recorded in it are used and
    /// those in `config` are ignored.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` if `config` cannot produce a valid layout, or
    ///   the store holds different key/value sizes
    /// - `Error::Corrupted` if the header record is damaged
    pub fn open<P: AsRef<Path>>(path: P, config: TreeConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let disk = DiskManager::open_or_create(&path)?;
        let store = if disk.is_empty() {
            NodeStore::create(disk, &config)?
        } else {
            NodeStore::open(disk, &config)?
        };

        debug!(path = %path.display(), size = store.header().size, "btree.open");
        Ok(Self {
            path,
            store: Mutex::new(store),
        })
    }

    /// Create a new, empty tree at `path`.
    ///
    /// # Errors
    /// Fails if the file already exists.
    pub fn create<P: AsRef<Path>>(path: P, config: TreeConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let disk = DiskManager::create(&path)?;
        let store = NodeStore::create(disk, &config)?;

        debug!(path = %path.display(), "btree.create");
        Ok(Self {
            path,
            store: Mutex::new(store),
        })
    }

    /// Insert a new entry and return a cursor at it.
    ///
    /// # Errors
    /// `Error::DuplicateKey` if `key` is already present; the tree is left
    /// untouched.
    pub fn insert(&mut self, key: K, value: V) -> Result<CursorMut<'_, K, V>> {
        let pos = self.store.get_mut().insert_entry(key, value)?;
        Ok(CursorMut::new(self, pos))
    }

    /// Remove `key`, returning its value.
    ///
    /// # Errors
    /// `Error::KeyNotFound` if `key` is absent; the tree is left untouched.
    pub fn erase(&mut self, key: &K) -> Result<V> {
        self.store.get_mut().erase_entry(key)
    }

    /// Cursor at `key`, or [`end`](Self::end) if it is absent.
    pub fn find(&self, key: &K) -> Result<Cursor<'_, K, V>> {
        let mut store = self.store.lock();
        let pos = match store.find_position(key)? {
            Some(pos) => pos,
            None => store.end_position()?,
        };
        drop(store);
        Ok(Cursor::new(self, pos))
    }

    /// Mutable cursor at `key`, or at the end position if it is absent.
    pub fn find_mut(&mut self, key: &K) -> Result<CursorMut<'_, K, V>> {
        let store = self.store.get_mut();
        let pos = match store.find_position(key)? {
            Some(pos) => pos,
            None => store.end_position()?,
        };
        Ok(CursorMut::new(self, pos))
    }

    pub fn get(&self, key: &K) -> Result<Option<V>> {
        let mut store = self.store.lock();
        match store.find_position(key)? {
            Some(pos) => Ok(Some(store.entry_at(pos)?.1)),
            None => Ok(None),
        }
    }

    /// Value stored under `key`.
    ///
    /// # Errors
    /// `Error::KeyNotFound` if `key` is absent.
    pub fn at(&self, key: &K) -> Result<V> {
        self.get(key)?.ok_or(Error::KeyNotFound)
    }

    /// Number of entries with `key`: 0 or 1.
    pub fn count(&self, key: &K) -> Result<usize> {
        Ok(usize::from(self.contains_key(key)?))
    }

    pub fn contains_key(&self, key: &K) -> Result<bool> {
        Ok(self.store.lock().find_position(key)?.is_some())
    }

    /// Cursor at the smallest entry, equal to [`end`](Self::end) when empty.
    pub fn begin(&self) -> Cursor<'_, K, V> {
        let pos = self.store.lock().begin_position();
        Cursor::new(self, pos)
    }

    pub fn begin_mut(&mut self) -> CursorMut<'_, K, V> {
        let pos = self.store.get_mut().begin_position();
        CursorMut::new(self, pos)
    }

    /// Cursor one past the largest entry.
    pub fn end(&self) -> Result<Cursor<'_, K, V>> {
        let pos = self.store.lock().end_position()?;
        Ok(Cursor::new(self, pos))
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        let store = self.store.lock();
        let front = store.begin_position();
        let len = store.header().size as usize;
        drop(store);
        Iter::new(self, front, len)
    }

    pub fn len(&self) -> usize {
        self.store.lock().header().size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry. The file is truncated and rebuilt as an empty
    /// tree.
    pub fn clear(&mut self) -> Result<()> {
        debug!(path = %self.path.display(), "btree.clear");
        self.store.get_mut().reset()
    }

    /// Force all written records to stable storage.
    pub fn flush(&self) -> Result<()> {
        self.store.lock().sync()
    }

    pub fn stats(&self) -> TreeStats {
        self.store.lock().stats()
    }

    /// Walk the whole tree and check its structural invariants.
    pub fn verify(&self) -> Result<VerifyReport> {
        self.store.lock().verify()
    }

    /// Maximum entries per leaf.
    pub fn leaf_capacity(&self) -> usize {
        self.store.lock().layout().leaf_capacity()
    }

    /// Maximum children per internal node.
    pub fn internal_capacity(&self) -> usize {
        self.store.lock().layout().internal_capacity()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<K, V> std::fmt::Debug for BPlusTree<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BPlusTree").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn small_tree(dir: &tempfile::TempDir) -> BPlusTree<u32, u64> {
        let config = TreeConfig::default()
            .with_leaf_capacity(4)
            .with_internal_capacity(4);
        BPlusTree::create(dir.path().join("tree.db"), config).unwrap()
    }

    #[test]
    fn test_new_tree_is_empty() {
        let dir = tempdir().unwrap();
        let tree = small_tree(&dir);

        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.begin(), tree.end().unwrap());
        assert!(tree.begin().is_end().unwrap());
        assert_eq!(tree.leaf_capacity(), 4);
        assert_eq!(tree.internal_capacity(), 4);
    }

    #[test]
    fn test_insert_returns_cursor_at_entry() {
        let dir = tempdir().unwrap();
        let mut tree = small_tree(&dir);

        let mut cursor = tree.insert(3, 30).unwrap();
        assert_eq!(cursor.entry().unwrap(), (3, 30));
        cursor.modify(31).unwrap();

        assert_eq!(tree.at(&3).unwrap(), 31);
    }

    #[test]
    fn test_lookups() {
        let dir = tempdir().unwrap();
        let mut tree = small_tree(&dir);
        for k in [5, 1, 9, 3, 7] {
            tree.insert(k, u64::from(k) * 100).unwrap();
        }

        assert_eq!(tree.at(&9).unwrap(), 900);
        assert!(matches!(tree.at(&4), Err(Error::KeyNotFound)));
        assert_eq!(tree.get(&4).unwrap(), None);
        assert_eq!(tree.count(&7).unwrap(), 1);
        assert_eq!(tree.count(&8).unwrap(), 0);
        assert!(tree.find(&8).unwrap().is_end().unwrap());
        assert_eq!(tree.find(&1).unwrap(), tree.begin());
    }

    #[test]
    fn test_find_mut_modify() {
        let dir = tempdir().unwrap();
        let mut tree = small_tree(&dir);
        for k in 0..10 {
            tree.insert(k, 0).unwrap();
        }

        tree.find_mut(&6).unwrap().modify(66).unwrap();
        assert_eq!(tree.at(&6).unwrap(), 66);

        let mut missing = tree.find_mut(&60).unwrap();
        assert!(matches!(missing.modify(1), Err(Error::CursorAtEnd)));
    }

    #[test]
    fn test_clear() {
        let dir = tempdir().unwrap();
        let mut tree = small_tree(&dir);
        for k in 0..50 {
            tree.insert(k, 1).unwrap();
        }

        tree.clear().unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.iter().count(), 0);
        assert_eq!(tree.verify().unwrap().leaf_sizes, vec![0]);
    }

    #[test]
    fn test_open_empty_file_bootstraps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tree.db");
        std::fs::File::create(&path).unwrap();

        let tree = BPlusTree::<u32, u32>::open(&path, TreeConfig::default()).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.path(), path.as_path());
    }
}

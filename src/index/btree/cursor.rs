//! Cursors and iterators over the leaf chain.
//!
//! A cursor is a `(leaf, index)` position plus a reference to its tree:
//!
//! ```text
//!  begin()                                        end()
//!    ↓                                              ↓
//! [1 2] <-> [3 4] <-> [5 6 7]                 (tail, tail.len)
//! ```
//!
//! `end()` sits one past the last entry of the tail leaf. In an empty tree
//! `begin()` and `end()` are the same position. Cursors borrow the tree, so
//! none can survive an insert or erase.

use std::fmt;
use std::iter::FusedIterator;
use std::ptr;

use crate::common::{Error, NodeId, Result};

use super::node::LeafNode;
use super::store::NodeStore;
use super::tree::{BPlusTree, BTreeKey, BTreeValue};

/// A slot in the leaf chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub leaf: NodeId,
    pub index: usize,
}

impl Position {
    pub fn new(leaf: NodeId, index: usize) -> Self {
        Self { leaf, index }
    }
}

/// Position following `index` in `leaf`.
fn successor<K, V>(leaf: &LeafNode<K, V>, index: usize) -> Position {
    if index + 1 < leaf.entries.len() {
        Position::new(leaf.id, index + 1)
    } else if leaf.next.is_some() {
        Position::new(leaf.next, 0)
    } else {
        Position::new(leaf.id, leaf.entries.len())
    }
}

impl<K: BTreeKey, V: BTreeValue> NodeStore<K, V> {
    pub fn begin_position(&self) -> Position {
        Position::new(self.header.head, 0)
    }

    pub fn end_position(&mut self) -> Result<Position> {
        let tail = self.read_leaf(self.header.tail)?;
        Ok(Position::new(tail.id, tail.len()))
    }

    pub fn is_end(&mut self, pos: Position) -> Result<bool> {
        if pos.leaf != self.header.tail {
            return Ok(false);
        }
        Ok(pos.index >= self.read_leaf(pos.leaf)?.len())
    }

    /// Position of `key`, or `None` if it is absent.
    pub fn find_position(&mut self, key: &K) -> Result<Option<Position>> {
        let Some(leaf_id) = self.locate_leaf(key)? else {
            return Ok(None);
        };
        let leaf = self.read_leaf(leaf_id)?;
        Ok(leaf.search(key).ok().map(|index| Position::new(leaf_id, index)))
    }

    /// # Errors
    /// `Error::CursorAtEnd` if `pos` is the end position.
    pub fn entry_at(&mut self, pos: Position) -> Result<(K, V)> {
        let leaf = self.read_leaf(pos.leaf)?;
        leaf.entries
            .get(pos.index)
            .cloned()
            .ok_or(Error::CursorAtEnd)
    }

    /// Overwrite the value stored at `pos`. The key and the tree shape are
    /// unchanged, so no separator needs repair.
    pub fn set_value_at(&mut self, pos: Position, value: V) -> Result<()> {
        let mut leaf = self.read_leaf(pos.leaf)?;
        let slot = leaf.entries.get_mut(pos.index).ok_or(Error::CursorAtEnd)?;
        slot.1 = value;
        self.write_leaf(&leaf)
    }

    /// The entry at `pos` and the position after it.
    fn entry_and_successor(&mut self, pos: Position) -> Result<((K, V), Position)> {
        let leaf = self.read_leaf(pos.leaf)?;
        let entry = leaf.entries.get(pos.index).cloned().ok_or(Error::CursorAtEnd)?;
        Ok((entry, successor(&leaf, pos.index)))
    }

    /// The position before `pos` and the entry there, or `None` at `begin()`.
    fn predecessor_entry(&mut self, pos: Position) -> Result<Option<(Position, (K, V))>> {
        let leaf = self.read_leaf(pos.leaf)?;
        if pos.index > 0 {
            let index = pos.index.min(leaf.len()) - 1;
            return Ok(Some((Position::new(leaf.id, index), leaf.entries[index].clone())));
        }
        if leaf.prev.is_none() {
            return Ok(None);
        }

        let prev = self.read_leaf(leaf.prev)?;
        match prev.entries.last() {
            Some(entry) => Ok(Some((Position::new(prev.id, prev.len() - 1), entry.clone()))),
            None => Err(Error::invariant(format!("{} in the leaf chain is empty", prev.id))),
        }
    }

    /// Position after `pos`, or `None` if `pos` is `end()`.
    pub fn step_forward(&mut self, pos: Position) -> Result<Option<Position>> {
        let leaf = self.read_leaf(pos.leaf)?;
        if pos.index >= leaf.len() {
            return Ok(None);
        }
        Ok(Some(successor(&leaf, pos.index)))
    }

    /// Position before `pos`, or `None` if `pos` is `begin()`.
    pub fn step_backward(&mut self, pos: Position) -> Result<Option<Position>> {
        Ok(self.predecessor_entry(pos)?.map(|(pos, _)| pos))
    }
}

/// A read-only cursor into a [`BPlusTree`].
///
/// # Example
/// ```no_run
/// use bplusdb::{BPlusTree, TreeConfig};
///
/// let mut tree = BPlusTree::<u64, u64>::open("cursor.db", TreeConfig::default())?;
/// tree.insert(1, 10)?;
/// tree.insert(2, 20)?;
///
/// let mut cursor = tree.begin();
/// while !cursor.is_end()? {
///     println!("{} => {}", cursor.key()?, cursor.value()?);
///     cursor.move_next()?;
/// }
/// # Ok::<(), bplusdb::Error>(())
/// ```
pub struct Cursor<'a, K, V> {
    tree: &'a BPlusTree<K, V>,
    pos: Position,
}

impl<'a, K: BTreeKey, V: BTreeValue> Cursor<'a, K, V> {
    pub(crate) fn new(tree: &'a BPlusTree<K, V>, pos: Position) -> Self {
        Self { tree, pos }
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    pub fn entry(&self) -> Result<(K, V)> {
        self.tree.store.lock().entry_at(self.pos)
    }

    pub fn key(&self) -> Result<K> {
        self.entry().map(|(key, _)| key)
    }

    pub fn value(&self) -> Result<V> {
        self.entry().map(|(_, value)| value)
    }

    pub fn is_end(&self) -> Result<bool> {
        self.tree.store.lock().is_end(self.pos)
    }

    /// Advance one entry. Returns `false`, leaving the cursor in place, at
    /// `end()`.
    pub fn move_next(&mut self) -> Result<bool> {
        let next = self.tree.store.lock().step_forward(self.pos)?;
        Ok(self.jump(next))
    }

    /// Step back one entry. Returns `false`, leaving the cursor in place, at
    /// `begin()`.
    pub fn move_prev(&mut self) -> Result<bool> {
        let prev = self.tree.store.lock().step_backward(self.pos)?;
        Ok(self.jump(prev))
    }

    fn jump(&mut self, to: Option<Position>) -> bool {
        match to {
            Some(pos) => {
                self.pos = pos;
                true
            }
            None => false,
        }
    }
}

impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Cursor<'_, K, V> {}

impl<K, V> PartialEq for Cursor<'_, K, V> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.tree, other.tree) && self.pos == other.pos
    }
}

impl<K, V> Eq for Cursor<'_, K, V> {}

impl<K, V> fmt::Debug for Cursor<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("leaf", &self.pos.leaf)
            .field("index", &self.pos.index)
            .finish()
    }
}

/// A cursor that can also overwrite the value under it.
///
/// Holds the tree exclusively, so no other cursor exists while it lives.
pub struct CursorMut<'a, K, V> {
    tree: &'a mut BPlusTree<K, V>,
    pos: Position,
}

impl<'a, K: BTreeKey, V: BTreeValue> CursorMut<'a, K, V> {
    pub(crate) fn new(tree: &'a mut BPlusTree<K, V>, pos: Position) -> Self {
        Self { tree, pos }
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    /// A read-only view at the same position.
    pub fn as_cursor(&self) -> Cursor<'_, K, V> {
        Cursor::new(&*self.tree, self.pos)
    }

    pub fn entry(&mut self) -> Result<(K, V)> {
        self.tree.store.get_mut().entry_at(self.pos)
    }

    pub fn key(&mut self) -> Result<K> {
        self.entry().map(|(key, _)| key)
    }

    pub fn value(&mut self) -> Result<V> {
        self.entry().map(|(_, value)| value)
    }

    pub fn is_end(&mut self) -> Result<bool> {
        self.tree.store.get_mut().is_end(self.pos)
    }

    /// Replace the value under the cursor and write the leaf back.
    ///
    /// # Errors
    /// `Error::CursorAtEnd` at `end()`.
    pub fn modify(&mut self, value: V) -> Result<()> {
        self.tree.store.get_mut().set_value_at(self.pos, value)
    }

    pub fn move_next(&mut self) -> Result<bool> {
        match self.tree.store.get_mut().step_forward(self.pos)? {
            Some(pos) => {
                self.pos = pos;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn move_prev(&mut self) -> Result<bool> {
        match self.tree.store.get_mut().step_backward(self.pos)? {
            Some(pos) => {
                self.pos = pos;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<'b, K, V> PartialEq<Cursor<'b, K, V>> for CursorMut<'_, K, V> {
    fn eq(&self, other: &Cursor<'b, K, V>) -> bool {
        ptr::eq(&*self.tree, other.tree) && self.pos == other.pos
    }
}

impl<K, V> fmt::Debug for CursorMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorMut")
            .field("leaf", &self.pos.leaf)
            .field("index", &self.pos.index)
            .finish()
    }
}

/// In-order iterator over `(key, value)` pairs, from either end.
///
/// Yields `Err` at most once: after an error the iterator is exhausted.
pub struct Iter<'a, K, V> {
    tree: &'a BPlusTree<K, V>,
    front: Position,
    /// One past the last entry not yet yielded from the back; `None` until
    /// `next_back` is first called.
    back: Option<Position>,
    remaining: usize,
}

impl<'a, K: BTreeKey, V: BTreeValue> Iter<'a, K, V> {
    pub(crate) fn new(tree: &'a BPlusTree<K, V>, front: Position, len: usize) -> Self {
        Self {
            tree,
            front,
            back: None,
            remaining: len,
        }
    }
}

impl<K: BTreeKey, V: BTreeValue> Iterator for Iter<'_, K, V> {
    type Item = Result<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let step = self.tree.store.lock().entry_and_successor(self.front);
        match step {
            Ok((entry, next)) => {
                self.front = next;
                self.remaining -= 1;
                Some(Ok(entry))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: BTreeKey, V: BTreeValue> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let step = {
            let mut store = self.tree.store.lock();
            let back = match self.back {
                Some(pos) => Ok(pos),
                None => store.end_position(),
            };
            back.and_then(|pos| store.predecessor_entry(pos))
        };
        match step {
            Ok(Some((pos, entry))) => {
                self.back = Some(pos);
                self.remaining -= 1;
                Some(Ok(entry))
            }
            Ok(None) => {
                self.remaining = 0;
                Some(Err(Error::invariant("leaf chain shorter than the tree size")))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}

impl<K: BTreeKey, V: BTreeValue> ExactSizeIterator for Iter<'_, K, V> {}

impl<K: BTreeKey, V: BTreeValue> FusedIterator for Iter<'_, K, V> {}

impl<'a, K: BTreeKey, V: BTreeValue> IntoIterator for &'a BPlusTree<K, V> {
    type Item = Result<(K, V)>;
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: u64, next: u64, len: u32) -> LeafNode<u32, u32> {
        LeafNode {
            id: NodeId::new(id),
            parent: NodeId::new(128),
            prev: NodeId::NONE,
            next: NodeId::new(next),
            entries: (0..len).map(|k| (k, k)).collect(),
        }
    }

    #[test]
    fn test_successor_within_leaf() {
        assert_eq!(successor(&leaf(200, 300, 3), 0), Position::new(NodeId::new(200), 1));
    }

    #[test]
    fn test_successor_crosses_to_next_leaf() {
        assert_eq!(successor(&leaf(200, 300, 3), 2), Position::new(NodeId::new(300), 0));
    }

    #[test]
    fn test_successor_of_last_entry_is_end() {
        assert_eq!(successor(&leaf(200, 0, 3), 2), Position::new(NodeId::new(200), 3));
    }
}

//! bplusdb - A disk-resident B+ tree with offset-addressed nodes in one file.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            bplusdb                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Public API (index::btree::tree)             │   │
//! │  │     BPlusTree: insert / erase / find / at / clear        │   │
//! │  │          Cursor, CursorMut, Iter over the leaf chain     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Tree engines (index::btree)               │   │
//! │  │     locate → insert (split) / delete (borrow, merge)     │   │
//! │  │            NodeStore: typed node I/O + header            │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Storage layer (storage/)                  │   │
//! │  │   DiskManager + RecordHeader (CRC32) + TreeHeader        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (NodeId, Error, config)
//! - [`storage`] - Disk I/O, record framing and the fixed-width codec
//! - [`index`] - The B+ tree
//!
//! # Quick Start
//! ```no_run
//! use bplusdb::{BPlusTree, TreeConfig};
//!
//! let mut tree = BPlusTree::<u64, u64>::open("my_index.db", TreeConfig::default())?;
//! for k in 0..100 {
//!     tree.insert(k, k * k)?;
//! }
//! assert_eq!(tree.at(&9)?, 81);
//!
//! for entry in tree.iter().rev().take(3) {
//!     let (key, value) = entry?;
//!     println!("{key} => {value}");
//! }
//! # Ok::<(), bplusdb::Error>(())
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{DEFAULT_RECORD_SIZE, MAX_RECORD_SIZE, MIN_FANOUT};
pub use common::{Error, NodeId, Result, TreeConfig};

pub use index::btree::{
    BPlusTree, BTreeKey, BTreeValue, Cursor, CursorMut, Iter, Position, TreeStats, VerifyReport,
};
pub use storage::Storable;

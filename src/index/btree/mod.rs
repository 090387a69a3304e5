//! Disk-resident B+ tree.
//!
//! # Structure
//! ```text
//!                      ┌───────────────┐
//!   header.root ─────▶ │ [k0 | k1 | …] │   internal (root is always internal)
//!                      └───┬───┬───────┘
//!                  ┌───────┘   └──────┐
//!            ┌─────▼─────┐      ┌─────▼─────┐
//!            │  internal │      │  internal │
//!            └──┬─────┬──┘      └──┬─────┬──┘
//!               ▼     ▼            ▼     ▼
//! header.head ▶ [leaf]⇄[leaf] ⇄ [leaf]⇄[leaf] ◀ header.tail
//! ```
//!
//! - `keys[i]` of an internal node is the smallest key under `children[i]`.
//! - Leaves hold the entries and form a doubly linked chain in key order.
//! - All leaves sit at the same depth.
//! - Every node except the root is at least half full.
//!
//! # Modules
//! - `layout` - record sizes and fan-outs
//! - `node` - leaf and internal node records
//! - `store` - node I/O, allocation and the header
//! - `locate` / `insert` / `delete` - the tree algorithms
//! - `cursor` - cursors and iteration over the leaf chain
//! - `verify` - structural checking
//! - `tree` - the public [`BPlusTree`] handle

mod cursor;
mod delete;
mod insert;
mod layout;
mod locate;
mod node;
mod stats;
mod store;
mod tree;
mod verify;

pub use cursor::{Cursor, CursorMut, Iter, Position};
pub use layout::NodeLayout;
pub use stats::TreeStats;
pub use tree::{BPlusTree, BTreeKey, BTreeValue};
pub use verify::VerifyReport;

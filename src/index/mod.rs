//! Index structures.
//!
//! - [`btree`] - B+ tree over offset-addressed node records

pub mod btree;

pub use btree::BPlusTree;

//! Storage layer - disk I/O and record formats.
//!
//! This module handles persistent storage:
//! - [`DiskManager`] - Low-level offset-addressed file I/O
//! - [`record`] - Record framing and the tree header
//! - [`Storable`] - Fixed-width encoding of keys, values and fields

mod disk_manager;
pub mod record;
mod storable;

pub use disk_manager::DiskManager;
pub use storable::Storable;

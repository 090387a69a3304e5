//! Record formats.
//!
//! This module contains:
//! - [`RecordHeader`] - Kind tag and checksum at the start of every record
//! - [`RecordKind`] - Discriminator for the record formats
//! - [`TreeHeader`] - The tree-wide state at offset 0
//!
//! Node records themselves are encoded by `index::btree::node`.

mod record_header;
mod tree_header;

pub use record_header::{RecordHeader, RecordKind};
pub use tree_header::{TreeHeader, FORMAT_VERSION, MAGIC};

//! Counters for record I/O and structural changes.

use std::fmt;

/// A snapshot of what a tree has done since it was opened.
///
/// The counters live inside the node store, which is only ever touched under
/// the tree's lock, so plain integers suffice.
///
/// # Example
/// ```
/// use bplusdb::TreeStats;
///
/// let stats = TreeStats::default();
/// assert_eq!(stats.structural_changes(), 0);
/// println!("{}", stats);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    /// Node and header records read from the file.
    pub records_read: u64,
    /// Node and header records written to the file.
    pub records_written: u64,
    /// Node records handed out by the allocator.
    pub nodes_allocated: u64,
    pub leaf_splits: u64,
    pub internal_splits: u64,
    /// Entries or children moved from a sibling to fix an underflow.
    pub borrows: u64,
    /// Siblings combined to fix an underflow.
    pub merges: u64,
    /// Root grown by a split or collapsed onto its only child.
    pub root_changes: u64,
}

impl TreeStats {
    pub fn structural_changes(&self) -> u64 {
        self.leaf_splits + self.internal_splits + self.borrows + self.merges + self.root_changes
    }
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ reads: {}, writes: {}, allocated: {}, splits: {}/{}, borrows: {}, merges: {}, root_changes: {} }}",
            self.records_read,
            self.records_written,
            self.nodes_allocated,
            self.leaf_splits,
            self.internal_splits,
            self.borrows,
            self.merges,
            self.root_changes
        )
    }
}

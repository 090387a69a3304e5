//! Node location type.

use std::fmt;

/// Byte offset of a node record inside the backing file.
///
/// Every cross-reference between nodes (parent, prev, next, children) is a
/// `NodeId`, never a memory address. Offset 0 always holds the tree header,
/// so it doubles as the "no node" sentinel.
///
/// # Example
/// ```
/// use bplusdb::NodeId;
///
/// let id = NodeId::new(128);
/// assert!(id.is_some());
/// assert!(NodeId::NONE.is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Sentinel for "no node" (no parent, no sibling).
    pub const NONE: NodeId = NodeId(0);

    /// Create a new NodeId.
    #[inline]
    pub fn new(offset: u64) -> Self {
        NodeId(offset)
    }

    /// Byte offset of the record.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    #[inline]
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "Node(NONE)")
        } else {
            write!(f, "Node(@{})", self.0)
        }
    }
}

//! Configuration constants and tree options for bplusdb.

/// Default target size of a node record in bytes (4KB).
///
/// Fan-outs are derived from this so a full node roughly fills one OS page.
pub const DEFAULT_RECORD_SIZE: usize = 4096;

/// Smallest fan-out accepted for either node type.
///
/// With fewer than four slots a node could underflow with no sibling able to
/// lend or absorb entries.
pub const MIN_FANOUT: usize = 4;

/// Largest node record the store will read or write (16MB).
///
/// Every node access allocates a buffer of the record size, so explicit
/// capacities are bounded through this.
pub const MAX_RECORD_SIZE: usize = 16 * 1024 * 1024;

/// Size of the tree header record at offset 0.
pub const HEADER_RECORD_SIZE: usize = 128;

/// Options used when creating or opening a tree.
///
/// Capacities left as `None` are derived from `record_size` and the key/value
/// sizes. On reopen, the capacities recorded in the store take precedence.
///
/// # Example
/// ```
/// use bplusdb::TreeConfig;
///
/// let config = TreeConfig::default()
///     .with_leaf_capacity(4)
///     .with_internal_capacity(4);
/// assert_eq!(config.leaf_capacity, Some(4));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConfig {
    /// Target record size used to derive fan-outs.
    pub record_size: usize,
    /// Explicit maximum number of entries per leaf (`L`).
    pub leaf_capacity: Option<usize>,
    /// Explicit maximum number of children per internal node (`M`).
    pub internal_capacity: Option<usize>,
    /// Call `sync_data` after every record write.
    pub sync_on_write: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            record_size: DEFAULT_RECORD_SIZE,
            leaf_capacity: None,
            internal_capacity: None,
            sync_on_write: false,
        }
    }
}

impl TreeConfig {
    pub fn with_record_size(mut self, record_size: usize) -> Self {
        self.record_size = record_size;
        self
    }

    pub fn with_leaf_capacity(mut self, capacity: usize) -> Self {
        self.leaf_capacity = Some(capacity);
        self
    }

    pub fn with_internal_capacity(mut self, capacity: usize) -> Self {
        self.internal_capacity = Some(capacity);
        self
    }

    pub fn with_sync_on_write(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TreeConfig::default();
        assert_eq!(config.record_size, 4096);
        assert!(config.record_size.is_power_of_two());
        assert_eq!(config.leaf_capacity, None);
        assert_eq!(config.internal_capacity, None);
        assert!(!config.sync_on_write);
    }

    #[test]
    fn test_builder() {
        let config = TreeConfig::default()
            .with_record_size(512)
            .with_leaf_capacity(8)
            .with_internal_capacity(6)
            .with_sync_on_write(true);

        assert_eq!(config.record_size, 512);
        assert_eq!(config.leaf_capacity, Some(8));
        assert_eq!(config.internal_capacity, Some(6));
        assert!(config.sync_on_write);
    }
}

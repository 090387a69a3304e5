//! Record sizes and fan-outs for one tree.

use crate::common::config::{MAX_RECORD_SIZE, MIN_FANOUT};
use crate::common::{Error, Result, TreeConfig};
use crate::storage::record::{RecordHeader, TreeHeader};
use crate::storage::Storable;

/// Fixed sizes derived once per tree from the key/value widths and the
/// configured (or persisted) capacities.
///
/// # Leaf record
/// ```text
/// 0   RecordHeader (5)
/// 5   parent  u64
/// 13  prev    u64
/// 21  next    u64
/// 29  count   u32
/// 33  L × (key, value)
/// ```
///
/// # Internal record
/// ```text
/// 0   RecordHeader (5)
/// 5   parent      u64
/// 13  count       u32
/// 17  child_kind  u8
/// 18  M × key
/// ..  M × child   u64
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    key_size: usize,
    value_size: usize,
    leaf_capacity: usize,
    internal_capacity: usize,
}

impl NodeLayout {
    pub const LEAF_OFFSET_PARENT: usize = RecordHeader::SIZE;
    pub const LEAF_OFFSET_PREV: usize = 13;
    pub const LEAF_OFFSET_NEXT: usize = 21;
    pub const LEAF_OFFSET_COUNT: usize = 29;
    pub const LEAF_FIXED: usize = 33;

    pub const INTERNAL_OFFSET_PARENT: usize = RecordHeader::SIZE;
    pub const INTERNAL_OFFSET_COUNT: usize = 13;
    pub const INTERNAL_OFFSET_KIND: usize = 17;
    pub const INTERNAL_FIXED: usize = 18;

    const CHILD_SIZE: usize = 8;

    /// Derive the layout for a new store of `K → V`.
    ///
    /// # Errors
    /// `Error::InvalidConfig` if the key is zero-sized or either fan-out
    /// ends up below [`MIN_FANOUT`].
    pub fn for_types<K: Storable, V: Storable>(config: &TreeConfig) -> Result<Self> {
        if K::SIZE == 0 {
            return Err(Error::InvalidConfig(
                "keys must have a non-zero encoded size".into(),
            ));
        }

        let entry_size = K::SIZE + V::SIZE;
        let leaf_capacity = config.leaf_capacity.unwrap_or_else(|| {
            config.record_size.saturating_sub(Self::LEAF_FIXED) / entry_size
        });
        let internal_capacity = config.internal_capacity.unwrap_or_else(|| {
            config.record_size.saturating_sub(Self::INTERNAL_FIXED) / (K::SIZE + Self::CHILD_SIZE)
        });

        let layout = Self {
            key_size: K::SIZE,
            value_size: V::SIZE,
            leaf_capacity,
            internal_capacity,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Rebuild the layout recorded in an existing store, checking it matches
    /// the types it is being opened with.
    pub fn from_header<K: Storable, V: Storable>(header: &TreeHeader) -> Result<Self> {
        if header.key_size as usize != K::SIZE || header.value_size as usize != V::SIZE {
            return Err(Error::InvalidConfig(format!(
                "store holds {}-byte keys and {}-byte values, opened with {} and {}",
                header.key_size,
                header.value_size,
                K::SIZE,
                V::SIZE
            )));
        }

        let layout = Self {
            key_size: K::SIZE,
            value_size: V::SIZE,
            leaf_capacity: header.leaf_capacity as usize,
            internal_capacity: header.internal_capacity as usize,
        };
        layout.validate()?;
        Ok(layout)
    }

    fn validate(&self) -> Result<()> {
        let records = [
            ("leaf", self.leaf_capacity, Self::LEAF_FIXED, self.entry_size()),
            (
                "internal",
                self.internal_capacity,
                Self::INTERNAL_FIXED,
                self.key_size + Self::CHILD_SIZE,
            ),
        ];

        for (name, capacity, fixed, slot_size) in records {
            if capacity < MIN_FANOUT {
                return Err(Error::InvalidConfig(format!(
                    "{} capacity {} is below the minimum of {}",
                    name, capacity, MIN_FANOUT
                )));
            }
            let record_size = capacity
                .checked_mul(slot_size)
                .and_then(|slots| slots.checked_add(fixed));
            match record_size {
                Some(size) if size <= MAX_RECORD_SIZE && capacity <= u32::MAX as usize => {}
                _ => {
                    return Err(Error::InvalidConfig(format!(
                        "{} capacity {} exceeds the maximum record size of {} bytes",
                        name, capacity, MAX_RECORD_SIZE
                    )));
                }
            }
        }
        Ok(())
    }

    /// A fresh header describing this layout.
    pub fn new_header(&self) -> TreeHeader {
        TreeHeader::new(
            self.key_size as u32,
            self.value_size as u32,
            self.leaf_capacity as u32,
            self.internal_capacity as u32,
        )
    }

    #[inline]
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    #[inline]
    pub fn value_size(&self) -> usize {
        self.value_size
    }

    /// Maximum entries per leaf (`L`).
    #[inline]
    pub fn leaf_capacity(&self) -> usize {
        self.leaf_capacity
    }

    /// Maximum children per internal node (`M`).
    #[inline]
    pub fn internal_capacity(&self) -> usize {
        self.internal_capacity
    }

    /// Minimum entries of a non-root leaf (`LMIN`).
    #[inline]
    pub fn leaf_min(&self) -> usize {
        (self.leaf_capacity + 1) / 2
    }

    /// Minimum children of a non-root internal node (`MMIN`).
    #[inline]
    pub fn internal_min(&self) -> usize {
        (self.internal_capacity + 1) / 2
    }

    #[inline]
    pub fn entry_size(&self) -> usize {
        self.key_size + self.value_size
    }

    pub fn leaf_record_size(&self) -> usize {
        Self::LEAF_FIXED + self.leaf_capacity * self.entry_size()
    }

    pub fn internal_record_size(&self) -> usize {
        Self::INTERNAL_FIXED + self.internal_capacity * (self.key_size + Self::CHILD_SIZE)
    }

    #[inline]
    pub fn leaf_entry_offset(&self, index: usize) -> usize {
        Self::LEAF_FIXED + index * self.entry_size()
    }

    #[inline]
    pub fn internal_key_offset(&self, index: usize) -> usize {
        Self::INTERNAL_FIXED + index * self.key_size
    }

    #[inline]
    pub fn internal_child_offset(&self, index: usize) -> usize {
        Self::INTERNAL_FIXED
            + self.internal_capacity * self.key_size
            + index * Self::CHILD_SIZE
    }
}

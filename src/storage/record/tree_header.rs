//! The tree header record stored at offset 0.

use crate::common::config::HEADER_RECORD_SIZE;
use crate::common::{Error, NodeId, Result};
use crate::storage::storable::Storable;

use super::record_header::{RecordHeader, RecordKind};

/// Identifies a bplusdb store.
pub const MAGIC: [u8; 8] = *b"BPLUSDB\0";

/// On-disk format version.
pub const FORMAT_VERSION: u16 = 1;

/// Tree-wide state persisted at offset 0.
///
/// # Layout (128 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       5     RecordHeader (kind = TreeHeader, CRC32)
/// 5       8     magic "BPLUSDB\0"
/// 13      2     format version
/// 15      4     key_size
/// 19      4     value_size
/// 23      4     leaf_capacity (L)
/// 27      4     internal_capacity (M)
/// 31      8     root
/// 39      8     head (first leaf)
/// 47      8     tail (last leaf)
/// 55      8     size (entry count)
/// 63      8     eof (next free offset)
/// 71      57    zero padding
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeHeader {
    pub key_size: u32,
    pub value_size: u32,
    pub leaf_capacity: u32,
    pub internal_capacity: u32,
    /// Current root node (always an internal node).
    pub root: NodeId,
    /// First leaf in key order.
    pub head: NodeId,
    /// Last leaf in key order.
    pub tail: NodeId,
    /// Total number of entries.
    pub size: u64,
    /// Next unused offset; allocation only moves it forward.
    pub eof: u64,
}

impl TreeHeader {
    pub const SIZE: usize = HEADER_RECORD_SIZE;

    const OFFSET_MAGIC: usize = RecordHeader::SIZE;
    const OFFSET_VERSION: usize = 13;
    const OFFSET_KEY_SIZE: usize = 15;
    const OFFSET_VALUE_SIZE: usize = 19;
    const OFFSET_LEAF_CAPACITY: usize = 23;
    const OFFSET_INTERNAL_CAPACITY: usize = 27;
    const OFFSET_ROOT: usize = 31;
    const OFFSET_HEAD: usize = 39;
    const OFFSET_TAIL: usize = 47;
    const OFFSET_SIZE: usize = 55;
    const OFFSET_EOF: usize = 63;

    /// A header for an empty store: no nodes, allocation starts right after
    /// the header record.
    pub fn new(key_size: u32, value_size: u32, leaf_capacity: u32, internal_capacity: u32) -> Self {
        Self {
            key_size,
            value_size,
            leaf_capacity,
            internal_capacity,
            root: NodeId::NONE,
            head: NodeId::NONE,
            tail: NodeId::NONE,
            size: 0,
            eof: Self::SIZE as u64,
        }
    }

    /// Encode into a sealed 128-byte record.
    pub fn to_bytes(&self) -> [u8; HEADER_RECORD_SIZE] {
        let mut buf = [0u8; HEADER_RECORD_SIZE];
        buf[Self::OFFSET_MAGIC..Self::OFFSET_MAGIC + MAGIC.len()].copy_from_slice(&MAGIC);
        FORMAT_VERSION.write_bytes(&mut buf[Self::OFFSET_VERSION..]);
        self.key_size.write_bytes(&mut buf[Self::OFFSET_KEY_SIZE..]);
        self.value_size.write_bytes(&mut buf[Self::OFFSET_VALUE_SIZE..]);
        self.leaf_capacity
            .write_bytes(&mut buf[Self::OFFSET_LEAF_CAPACITY..]);
        self.internal_capacity
            .write_bytes(&mut buf[Self::OFFSET_INTERNAL_CAPACITY..]);
        self.root.write_bytes(&mut buf[Self::OFFSET_ROOT..]);
        self.head.write_bytes(&mut buf[Self::OFFSET_HEAD..]);
        self.tail.write_bytes(&mut buf[Self::OFFSET_TAIL..]);
        self.size.write_bytes(&mut buf[Self::OFFSET_SIZE..]);
        self.eof.write_bytes(&mut buf[Self::OFFSET_EOF..]);
        RecordHeader::seal(&mut buf, RecordKind::TreeHeader);
        buf
    }

    /// Decode and validate a header record read from offset 0.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(Error::corrupted(0, "header record truncated"));
        }
        let buf = &buf[..Self::SIZE];
        // Offset 0 is always the header, so any other kind there is damage.
        if RecordKind::from_u8(buf[RecordHeader::OFFSET_KIND]) != RecordKind::TreeHeader {
            return Err(Error::corrupted(0, "not a tree header record"));
        }
        RecordHeader::check(buf, 0, RecordKind::TreeHeader)?;

        if buf[Self::OFFSET_MAGIC..Self::OFFSET_MAGIC + MAGIC.len()] != MAGIC {
            return Err(Error::corrupted(0, "bad magic"));
        }
        let version = u16::read_bytes(&buf[Self::OFFSET_VERSION..]);
        if version != FORMAT_VERSION {
            return Err(Error::corrupted(
                0,
                format!("unsupported format version {}", version),
            ));
        }

        Ok(Self {
            key_size: u32::read_bytes(&buf[Self::OFFSET_KEY_SIZE..]),
            value_size: u32::read_bytes(&buf[Self::OFFSET_VALUE_SIZE..]),
            leaf_capacity: u32::read_bytes(&buf[Self::OFFSET_LEAF_CAPACITY..]),
            internal_capacity: u32::read_bytes(&buf[Self::OFFSET_INTERNAL_CAPACITY..]),
            root: NodeId::read_bytes(&buf[Self::OFFSET_ROOT..]),
            head: NodeId::read_bytes(&buf[Self::OFFSET_HEAD..]),
            tail: NodeId::read_bytes(&buf[Self::OFFSET_TAIL..]),
            size: u64::read_bytes(&buf[Self::OFFSET_SIZE..]),
            eof: u64::read_bytes(&buf[Self::OFFSET_EOF..]),
        })
    }
}

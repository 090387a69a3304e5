//! Record header and kind definitions.
//!
//! Every record in the store starts with a [`RecordHeader`] containing:
//! - [`RecordKind`] discriminator
//! - CRC32 checksum for integrity

use crate::common::{Error, Result};

/// Kind of record stored at an offset.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Uninitialized or corrupted record.
    #[default]
    Invalid = 0,
    /// The tree header at offset 0.
    TreeHeader = 1,
    /// B+ tree internal node.
    Internal = 2,
    /// B+ tree leaf node.
    Leaf = 3,
}

impl RecordKind {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => RecordKind::TreeHeader,
            2 => RecordKind::Internal,
            3 => RecordKind::Leaf,
            _ => RecordKind::Invalid,
        }
    }
}

/// Metadata stored at the beginning of every record.
///
/// # Layout (5 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     kind (RecordKind as u8)
/// 1       4     checksum (CRC32, little-endian)
/// ```
///
/// # Checksum
/// The checksum is computed over the entire record with the checksum field
/// itself set to zero. This allows verification without special handling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Kind of this record.
    pub kind: RecordKind,
    /// CRC32 checksum of the record contents.
    pub checksum: u32,
}

impl RecordHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 5;

    pub const OFFSET_KIND: usize = 0;
    pub const OFFSET_CHECKSUM: usize = 1;

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < RecordHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for RecordHeader");

        let kind = RecordKind::from_u8(data[Self::OFFSET_KIND]);
        let checksum = u32::from_le_bytes([
            data[Self::OFFSET_CHECKSUM],
            data[Self::OFFSET_CHECKSUM + 1],
            data[Self::OFFSET_CHECKSUM + 2],
            data[Self::OFFSET_CHECKSUM + 3],
        ]);

        Self { kind, checksum }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < RecordHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for RecordHeader");

        data[Self::OFFSET_KIND] = self.kind as u8;
        data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&self.checksum.to_le_bytes());
    }

    /// Compute the CRC32 checksum of a record.
    ///
    /// The checksum field (bytes 1-4) is fed as zeros, so the checksum
    /// doesn't include itself.
    pub fn compute_checksum(record: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&record[..Self::OFFSET_CHECKSUM]);
        hasher.update(&[0u8; 4]);
        hasher.update(&record[Self::OFFSET_CHECKSUM + 4..]);
        hasher.finalize()
    }

    /// Verify that the stored checksum matches the computed checksum.
    pub fn verify_checksum(&self, record: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(record)
    }

    /// Stamp `kind` and a fresh checksum onto a fully encoded record.
    ///
    /// Call this after all other fields of the record have been written.
    pub fn seal(record: &mut [u8], kind: RecordKind) {
        record[Self::OFFSET_KIND] = kind as u8;
        let header = RecordHeader {
            kind,
            checksum: Self::compute_checksum(record),
        };
        header.write_to(record);
    }

    /// Validate a record read from `offset` and check it has the expected kind.
    ///
    /// The kind byte is inspected first: records of different kinds have
    /// different sizes, so a checksum over `record` is only meaningful once
    /// the kind matches. A known kind other than `expected` means a node
    /// reference points at the wrong thing, which is an
    /// [`Error::InvariantViolation`]. An unknown kind or a checksum failure
    /// is [`Error::Corrupted`].
    pub fn check(record: &[u8], offset: u64, expected: RecordKind) -> Result<()> {
        let header = Self::from_bytes(record);
        if header.kind == RecordKind::Invalid {
            tracing::warn!(offset, kind = record[Self::OFFSET_KIND], "record.kind.invalid");
            return Err(Error::corrupted(offset, "unknown record kind"));
        }
        if header.kind != expected {
            return Err(Error::invariant(format!(
                "record at offset {} is {:?}, expected {:?}",
                offset, header.kind, expected
            )));
        }
        if !header.verify_checksum(record) {
            tracing::warn!(offset, kind = ?header.kind, "record.checksum.mismatch");
            return Err(Error::corrupted(offset, "checksum mismatch"));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // --- RecordKind tests ---

    #[test]
    fn test_record_kind_from_u8() {
        assert_eq!(RecordKind::from_u8(0), RecordKind::Invalid);
        assert_eq!(RecordKind::from_u8(1), RecordKind::TreeHeader);
        assert_eq!(RecordKind::from_u8(2), RecordKind::Internal);
        assert_eq!(RecordKind::from_u8(3), RecordKind::Leaf);
        assert_eq!(RecordKind::from_u8(255), RecordKind::Invalid);
    }

    // --- RecordHeader tests ---

    #[test]
    fn test_record_header_byte_layout() {
        let header = RecordHeader {
            kind: RecordKind::Leaf,
            checksum: 0x04030201, // Little-endian: 01 02 03 04
        };

        let mut buffer = [0u8; RecordHeader::SIZE];
        header.write_to(&mut buffer);

        assert_eq!(buffer, [3, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(RecordHeader::from_bytes(&buffer), header);
    }

    // --- Checksum tests ---

    #[test]
    fn test_checksum_changes_with_data() {
        let mut record1 = [0u8; 64];
        let mut record2 = [0u8; 64];

        record1[40] = 0xFF;
        record2[40] = 0xFE;

        assert_ne!(
            RecordHeader::compute_checksum(&record1),
            RecordHeader::compute_checksum(&record2)
        );
    }

    #[test]
    fn test_checksum_ignores_checksum_field() {
        let mut record = [0u8; 64];
        record[20] = 0xAB;

        let checksum1 = RecordHeader::compute_checksum(&record);
        record[1..5].copy_from_slice(&[0xFF; 4]);
        let checksum2 = RecordHeader::compute_checksum(&record);

        assert_eq!(checksum1, checksum2);
    }

    #[test]
    fn test_seal_then_check() {
        let mut record = [0u8; 64];
        record[30] = 0x42;

        RecordHeader::seal(&mut record, RecordKind::Internal);

        assert!(RecordHeader::check(&record, 128, RecordKind::Internal).is_ok());
    }

    #[test]
    fn test_check_detects_corruption() {
        let mut record = [0u8; 64];
        RecordHeader::seal(&mut record, RecordKind::Leaf);

        record[50] ^= 0x01;

        match RecordHeader::check(&record, 256, RecordKind::Leaf) {
            Err(Error::Corrupted { offset, .. }) => assert_eq!(offset, 256),
            other => panic!("expected corruption, got {:?}", other),
        }
    }

    #[test]
    fn test_check_detects_wrong_kind() {
        let mut record = [0u8; 64];
        RecordHeader::seal(&mut record, RecordKind::Leaf);

        let result = RecordHeader::check(&record, 256, RecordKind::Internal);
        assert!(matches!(result, Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_check_wrong_kind_with_different_length() {
        // An internal record read with the leaf record size spans extra bytes
        // past its own end; the kind still decides the error.
        let mut internal = [0u8; 66];
        RecordHeader::seal(&mut internal[..60], RecordKind::Internal);
        internal[60..].copy_from_slice(&[0xAA; 6]);

        let result = RecordHeader::check(&internal, 128, RecordKind::Leaf);
        assert!(matches!(result, Err(Error::InvariantViolation(_))));

        let result = RecordHeader::check(&internal[..55], 128, RecordKind::Leaf);
        assert!(matches!(result, Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_zeroed_record_is_rejected() {
        let record = [0u8; 64];
        assert!(matches!(
            RecordHeader::check(&record, 0, RecordKind::Leaf),
            Err(Error::Corrupted { offset: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_kind_is_corrupted() {
        let mut record = [0u8; 64];
        RecordHeader::seal(&mut record, RecordKind::Leaf);
        record[RecordHeader::OFFSET_KIND] = 9;

        assert!(matches!(
            RecordHeader::check(&record, 64, RecordKind::Leaf),
            Err(Error::Corrupted { offset: 64, .. })
        ));
    }
}

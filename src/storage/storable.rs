//! Fixed-size binary encoding for keys, values and record fields.
//!
//! Every type stored in the tree has one encoded width, known at compile
//! time, so node records have a fixed size for the life of a store.

use crate::common::NodeId;

/// A type with a fixed-width little-endian binary representation.
///
/// `write_bytes` receives a slice of at least `SIZE` bytes and fills its
/// first `SIZE` bytes; `read_bytes` decodes from the first `SIZE` bytes.
///
/// # Example
/// ```
/// use bplusdb::Storable;
///
/// let mut buf = [0u8; 8];
/// 42u64.write_bytes(&mut buf);
/// assert_eq!(u64::read_bytes(&buf), 42);
/// ```
pub trait Storable: Sized {
    /// Encoded width in bytes.
    const SIZE: usize;

    fn write_bytes(&self, out: &mut [u8]);

    fn read_bytes(bytes: &[u8]) -> Self;
}

macro_rules! impl_storable_for_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl Storable for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                #[inline]
                fn write_bytes(&self, out: &mut [u8]) {
                    out[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_bytes(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_storable_for_int!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128);

impl<const N: usize> Storable for [u8; N] {
    const SIZE: usize = N;

    #[inline]
    fn write_bytes(&self, out: &mut [u8]) {
        out[..N].copy_from_slice(self);
    }

    #[inline]
    fn read_bytes(bytes: &[u8]) -> Self {
        let mut raw = [0u8; N];
        raw.copy_from_slice(&bytes[..N]);
        raw
    }
}

// Zero-width values turn a tree into an ordered set.
impl Storable for () {
    const SIZE: usize = 0;

    #[inline]
    fn write_bytes(&self, _out: &mut [u8]) {}

    #[inline]
    fn read_bytes(_bytes: &[u8]) -> Self {}
}

impl<A: Storable, B: Storable> Storable for (A, B) {
    const SIZE: usize = A::SIZE + B::SIZE;

    fn write_bytes(&self, out: &mut [u8]) {
        self.0.write_bytes(&mut out[..A::SIZE]);
        self.1.write_bytes(&mut out[A::SIZE..Self::SIZE]);
    }

    fn read_bytes(bytes: &[u8]) -> Self {
        (
            A::read_bytes(&bytes[..A::SIZE]),
            B::read_bytes(&bytes[A::SIZE..Self::SIZE]),
        )
    }
}

impl Storable for NodeId {
    const SIZE: usize = 8;

    #[inline]
    fn write_bytes(&self, out: &mut [u8]) {
        self.0.write_bytes(out);
    }

    #[inline]
    fn read_bytes(bytes: &[u8]) -> Self {
        NodeId(u64::read_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_sizes() {
        assert_eq!(u8::SIZE, 1);
        assert_eq!(i32::SIZE, 4);
        assert_eq!(u64::SIZE, 8);
        assert_eq!(i128::SIZE, 16);
    }

    #[test]
    fn test_int_little_endian_layout() {
        let mut buf = [0u8; 4];
        0x04030201u32.write_bytes(&mut buf);
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(u32::read_bytes(&buf), 0x04030201);
    }

    #[test]
    fn test_signed_values() {
        let mut buf = [0u8; 8];
        (-17i64).write_bytes(&mut buf);
        assert_eq!(i64::read_bytes(&buf), -17);
    }

    #[test]
    fn test_writes_only_prefix() {
        let mut buf = [0xFFu8; 6];
        7u16.write_bytes(&mut buf);
        assert_eq!(buf, [7, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_byte_array() {
        let mut buf = [0u8; 3];
        (*b"abc").write_bytes(&mut buf);
        assert_eq!(<[u8; 3]>::read_bytes(&buf), *b"abc");
    }

    #[test]
    fn test_pair() {
        assert_eq!(<(u32, u16)>::SIZE, 6);

        let mut buf = [0u8; 6];
        (9u32, 3u16).write_bytes(&mut buf);
        assert_eq!(<(u32, u16)>::read_bytes(&buf), (9, 3));
    }

    #[test]
    fn test_unit_is_zero_width() {
        assert_eq!(<()>::SIZE, 0);
        <()>::read_bytes(&[]);
    }

    #[test]
    fn test_node_id() {
        let mut buf = [0u8; 8];
        NodeId::new(4242).write_bytes(&mut buf);
        assert_eq!(NodeId::read_bytes(&buf), NodeId::new(4242));
    }
}

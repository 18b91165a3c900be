//! Fixed-size records and their byte layout
//!
//! A record is an opaque, immutable byte buffer. Typed values go in and out
//! through [`FixedLayout`], which fixes each type's encoded size so the hub
//! can reject a value whose size differs from the declared record size.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::RecordError;

/// Encode to / decode from a fixed-size byte layout
///
/// `encode` must write exactly `SIZE` bytes. `decode` is only called with a
/// buffer of exactly `SIZE` bytes.
///
/// # Example
/// ```
/// use bytes::{Buf, BufMut};
/// use fanout_rs::registry::{FixedLayout, Record};
///
/// #[derive(Debug, PartialEq)]
/// struct Position {
///     x: i32,
///     y: i32,
/// }
///
/// impl FixedLayout for Position {
///     const SIZE: usize = 8;
///
///     fn encode<B: BufMut>(&self, buf: &mut B) {
///         buf.put_i32_le(self.x);
///         buf.put_i32_le(self.y);
///     }
///
///     fn decode<B: Buf>(buf: &mut B) -> Self {
///         Position { x: buf.get_i32_le(), y: buf.get_i32_le() }
///     }
/// }
///
/// let record = Record::encode(&Position { x: 3, y: -4 }).unwrap();
/// assert_eq!(record.len(), 8);
/// assert_eq!(record.decode::<Position>().unwrap(), Position { x: 3, y: -4 });
/// ```
pub trait FixedLayout: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Write the value's bytes
    fn encode<B: BufMut>(&self, buf: &mut B);

    /// Read a value back
    fn decode<B: Buf>(buf: &mut B) -> Self;
}

/// An immutable fixed-size byte buffer
///
/// Cheap to clone: clones share the same allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    data: Bytes,
}

impl Record {
    /// Encode a typed value
    ///
    /// Fails if the value's `encode` wrote a byte count other than its
    /// declared `SIZE`.
    pub fn encode<T: FixedLayout>(value: &T) -> Result<Self, RecordError> {
        let mut buf = BytesMut::with_capacity(T::SIZE);
        value.encode(&mut buf);

        if buf.len() != T::SIZE {
            return Err(RecordError::SizeMismatch {
                expected: T::SIZE,
                actual: buf.len(),
            });
        }

        Ok(Self { data: buf.freeze() })
    }

    /// Wrap raw bytes
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Decode as `T`, failing if `T::SIZE` differs from the buffer size
    pub fn decode<T: FixedLayout>(&self) -> Result<T, RecordError> {
        if self.data.len() != T::SIZE {
            return Err(RecordError::SizeMismatch {
                expected: self.data.len(),
                actual: T::SIZE,
            });
        }

        let mut buf = self.data.clone();
        Ok(T::decode(&mut buf))
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-length record
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the underlying bytes
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Take the underlying bytes
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl AsRef<[u8]> for Record {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Bytes> for Record {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

macro_rules! fixed_layout_le {
    ($($ty:ty => $put:ident, $get:ident;)*) => {
        $(
            impl FixedLayout for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn encode<B: BufMut>(&self, buf: &mut B) {
                    buf.$put(*self);
                }

                fn decode<B: Buf>(buf: &mut B) -> Self {
                    buf.$get()
                }
            }
        )*
    };
}

fixed_layout_le! {
    u8 => put_u8, get_u8;
    i8 => put_i8, get_i8;
    u16 => put_u16_le, get_u16_le;
    i16 => put_i16_le, get_i16_le;
    u32 => put_u32_le, get_u32_le;
    i32 => put_i32_le, get_i32_le;
    u64 => put_u64_le, get_u64_le;
    i64 => put_i64_le, get_i64_le;
    u128 => put_u128_le, get_u128_le;
    i128 => put_i128_le, get_i128_le;
    f32 => put_f32_le, get_f32_le;
    f64 => put_f64_le, get_f64_le;
}

impl FixedLayout for bool {
    const SIZE: usize = 1;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(u8::from(*self));
    }

    fn decode<B: Buf>(buf: &mut B) -> Self {
        buf.get_u8() != 0
    }
}

impl<const N: usize> FixedLayout for [u8; N] {
    const SIZE: usize = N;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(self);
    }

    fn decode<B: Buf>(buf: &mut B) -> Self {
        let mut out = [0u8; N];
        buf.copy_to_slice(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Person {
        name: [u8; 30],
        age: u32,
        is_adult: bool,
    }

    impl FixedLayout for Person {
        const SIZE: usize = <[u8; 30]>::SIZE + u32::SIZE + bool::SIZE;

        fn encode<B: BufMut>(&self, buf: &mut B) {
            self.name.encode(buf);
            self.age.encode(buf);
            self.is_adult.encode(buf);
        }

        fn decode<B: Buf>(buf: &mut B) -> Self {
            Person {
                name: FixedLayout::decode(buf),
                age: FixedLayout::decode(buf),
                is_adult: FixedLayout::decode(buf),
            }
        }
    }

    /// Declares more bytes than it writes
    struct Liar;

    impl FixedLayout for Liar {
        const SIZE: usize = 4;

        fn encode<B: BufMut>(&self, buf: &mut B) {
            buf.put_u16_le(1);
        }

        fn decode<B: Buf>(_buf: &mut B) -> Self {
            Liar
        }
    }

    fn person(age: u32) -> Person {
        let mut name = [0u8; 30];
        name[..5].copy_from_slice(b"alice");
        Person {
            name,
            age,
            is_adult: age >= 18,
        }
    }

    #[test]
    fn test_struct_layout() {
        let record = Record::encode(&person(33)).unwrap();

        assert_eq!(record.len(), 35);
        let back: Person = record.decode().unwrap();
        assert_eq!(back, person(33));
    }

    #[test]
    fn test_decode_size_mismatch() {
        let record = Record::encode(&7u64).unwrap();

        let err = record.decode::<u32>().unwrap_err();
        assert_eq!(
            err,
            RecordError::SizeMismatch {
                expected: 8,
                actual: 4
            }
        );
    }

    #[test]
    fn test_encode_rejects_short_write() {
        assert_eq!(
            Record::encode(&Liar).unwrap_err(),
            RecordError::SizeMismatch {
                expected: 4,
                actual: 2
            }
        );
    }

    #[test]
    fn test_little_endian() {
        let record = Record::encode(&0x0102_0304u32).unwrap();

        assert_eq!(record.as_ref(), &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn test_clone_shares_allocation() {
        let record = Record::from_bytes(Bytes::from_static(b"abcd"));
        let copy = record.clone();

        assert_eq!(record.as_bytes().as_ptr(), copy.as_bytes().as_ptr());
        assert_eq!(copy.into_bytes(), Bytes::from_static(b"abcd"));
    }

    #[test]
    fn test_bool_and_float() {
        assert!(Record::encode(&true).unwrap().decode::<bool>().unwrap());
        let pi = Record::encode(&3.5f64).unwrap().decode::<f64>().unwrap();
        assert_eq!(pi, 3.5);
    }
}

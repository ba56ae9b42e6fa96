use std::convert::TryFrom;
use std::fmt::Debug;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use strum_macros::{Display, EnumString};

use crate::SerializerError;

type Result<T> = std::result::Result<T, SerializerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Endian {
    Little,
    Big,
}

mod sealed {
    pub trait Sealed {}
}

/// Fixed-width scalar that the serializer can move through a stream.
///
/// The set of implementors is closed: integers of 8 to 64 bits and both float
/// widths. Booleans and strings depend on the active context and have their
/// own codecs.
pub trait Primitive: Copy + Default + Debug + PartialEq + sealed::Sealed {
    const SIZE: usize;

    fn read_from(endian: Endian, bytes: &[u8]) -> Self;

    fn write_to(self, endian: Endian, bytes: &mut [u8]);
}

/// Integer primitives usable as length prefixes and bit-field containers.
pub trait Integer: Primitive {
    /// Raw bits of the value, sign-extended for signed types.
    fn to_bits(self) -> u64;

    /// Truncates `bits` to the width of the type.
    fn from_bits(bits: u64) -> Self;

    /// `None` when the value is negative or does not fit in `usize`.
    fn to_length(self) -> Option<usize>;

    fn from_length(length: usize) -> Option<Self>;
}

impl sealed::Sealed for u8 {}
impl sealed::Sealed for i8 {}

impl Primitive for u8 {
    const SIZE: usize = 1;

    fn read_from(_endian: Endian, bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn write_to(self, _endian: Endian, bytes: &mut [u8]) {
        bytes[0] = self;
    }
}

impl Primitive for i8 {
    const SIZE: usize = 1;

    fn read_from(_endian: Endian, bytes: &[u8]) -> Self {
        bytes[0] as i8
    }

    fn write_to(self, _endian: Endian, bytes: &mut [u8]) {
        bytes[0] = self as u8;
    }
}

macro_rules! multi_byte_primitive {
    ($ty:ty, $size:expr, $read:ident, $write:ident) => {
        impl sealed::Sealed for $ty {}

        impl Primitive for $ty {
            const SIZE: usize = $size;

            fn read_from(endian: Endian, bytes: &[u8]) -> Self {
                match endian {
                    Endian::Little => LittleEndian::$read(bytes),
                    Endian::Big => BigEndian::$read(bytes),
                }
            }

            fn write_to(self, endian: Endian, bytes: &mut [u8]) {
                match endian {
                    Endian::Little => LittleEndian::$write(bytes, self),
                    Endian::Big => BigEndian::$write(bytes, self),
                }
            }
        }
    };
}

multi_byte_primitive!(u16, 2, read_u16, write_u16);
multi_byte_primitive!(i16, 2, read_i16, write_i16);
multi_byte_primitive!(u32, 4, read_u32, write_u32);
multi_byte_primitive!(i32, 4, read_i32, write_i32);
multi_byte_primitive!(u64, 8, read_u64, write_u64);
multi_byte_primitive!(i64, 8, read_i64, write_i64);
multi_byte_primitive!(f32, 4, read_f32, write_f32);
multi_byte_primitive!(f64, 8, read_f64, write_f64);

macro_rules! integer {
    ($ty:ty) => {
        impl Integer for $ty {
            fn to_bits(self) -> u64 {
                self as u64
            }

            fn from_bits(bits: u64) -> Self {
                bits as $ty
            }

            fn to_length(self) -> Option<usize> {
                usize::try_from(self).ok()
            }

            fn from_length(length: usize) -> Option<Self> {
                <$ty>::try_from(length).ok()
            }
        }
    };
}

integer!(u8);
integer!(i8);
integer!(u16);
integer!(i16);
integer!(u32);
integer!(i32);
integer!(u64);
integer!(i64);

impl Endian {
    pub fn decode<T: Primitive>(&self, bytes: &[u8]) -> Result<T> {
        if bytes.len() != T::SIZE {
            return Err(SerializerError::InvalidArgument(format!(
                "expected {} bytes, got {}",
                T::SIZE,
                bytes.len()
            )));
        }
        Ok(T::read_from(*self, bytes))
    }

    pub fn encode<T: Primitive>(&self, value: T) -> Vec<u8> {
        let mut bytes = vec![0; T::SIZE];
        value.write_to(*self, &mut bytes);
        bytes
    }
}

//! NcType - the external (on-disk) element types of the classic NetCDF format.

use std::fmt;

/// Element type of a NetCDF variable or attribute.
///
/// The discriminants are the on-disk type codes of the classic format.
/// All values are stored big-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NcType {
    /// 8-bit signed integer
    Byte = 1,
    /// 8-bit character (text data)
    Char = 2,
    /// 16-bit signed integer
    Short = 3,
    /// 32-bit signed integer
    Int = 4,
    /// 32-bit IEEE float
    Float = 5,
    /// 64-bit IEEE float
    Double = 6,
}

impl NcType {
    /// Decode an on-disk type code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Byte),
            2 => Some(Self::Char),
            3 => Some(Self::Short),
            4 => Some(Self::Int),
            5 => Some(Self::Float),
            6 => Some(Self::Double),
            _ => None,
        }
    }

    /// The on-disk type code.
    #[inline]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Size of one element in bytes.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Byte | Self::Char => 1,
            Self::Short => 2,
            Self::Int | Self::Float => 4,
            Self::Double => 8,
        }
    }

    /// CDL name of the type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Float => "float",
            Self::Double => "double",
        }
    }
}

impl fmt::Display for NcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

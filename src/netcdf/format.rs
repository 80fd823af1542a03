//! Classic NetCDF format constants and layout helpers.
//!
//! The classic format is a single header (dimensions, attributes, variable
//! table) followed by the data section: fixed-size variables at their
//! declared offsets, then the records of the unlimited dimension, one slab
//! per record variable per record. All integers and floats are big-endian.

/// Magic bytes at the start of a classic NetCDF file.
pub const MAGIC: &[u8; 3] = b"CDF";

/// Header list tag for the dimension list.
pub const TAG_DIMENSION: i32 = 0x0A;

/// Header list tag for a variable list.
pub const TAG_VARIABLE: i32 = 0x0B;

/// Header list tag for an attribute list.
pub const TAG_ATTRIBUTE: i32 = 0x0C;

/// Tag of an absent (empty) header list; followed by a zero count.
pub const TAG_ABSENT: i32 = 0;

/// Classic format flavor, distinguished by the version byte after the magic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NcVersion {
    /// CDF-1: 32-bit data offsets.
    Classic,
    /// CDF-2: 64-bit data offsets (the `NETCDF3_64BIT` flavor).
    Offset64,
}

impl NcVersion {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Classic),
            2 => Some(Self::Offset64),
            _ => None,
        }
    }

    #[inline]
    pub const fn byte(self) -> u8 {
        match self {
            Self::Classic => 1,
            Self::Offset64 => 2,
        }
    }

    /// Width of a variable's `begin` offset field in the header.
    #[inline]
    pub const fn offset_bytes(self) -> usize {
        match self {
            Self::Classic => 4,
            Self::Offset64 => 8,
        }
    }
}

/// Bytes needed to round `n` up to a 4-byte boundary.
#[inline]
pub const fn pad4(n: usize) -> usize {
    (4 - (n % 4)) % 4
}

/// `n` rounded up to a 4-byte boundary.
#[inline]
pub const fn padded4(n: usize) -> usize {
    n + pad4(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert_eq!(pad4(0), 0);
        assert_eq!(pad4(1), 3);
        assert_eq!(pad4(4), 0);
        assert_eq!(pad4(5), 3);
        assert_eq!(padded4(6), 8);
        assert_eq!(padded4(8), 8);
    }

    #[test]
    fn test_version_bytes() {
        assert_eq!(NcVersion::from_byte(1), Some(NcVersion::Classic));
        assert_eq!(NcVersion::from_byte(2), Some(NcVersion::Offset64));
        assert_eq!(NcVersion::from_byte(3), None);
        assert_eq!(NcVersion::Classic.offset_bytes(), 4);
        assert_eq!(NcVersion::Offset64.offset_bytes(), 8);
    }
}

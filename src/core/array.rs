//! Typed array and attribute payloads exchanged through the dataset traits.

use crate::util::{Error, NcType, Result};

/// Value of a global or per-variable attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Bytes(Vec<i8>),
    /// Character data; the on-disk element count is the byte length.
    Text(String),
    Shorts(Vec<i16>),
    Ints(Vec<i32>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
}

impl AttrValue {
    /// Convenience constructor for text attributes.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Element type of the payload.
    pub fn nc_type(&self) -> NcType {
        match self {
            Self::Bytes(_) => NcType::Byte,
            Self::Text(_) => NcType::Char,
            Self::Shorts(_) => NcType::Short,
            Self::Ints(_) => NcType::Int,
            Self::Floats(_) => NcType::Float,
            Self::Doubles(_) => NcType::Double,
        }
    }

    /// Number of on-disk elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(v) => v.len(),
            Self::Text(s) => s.len(),
            Self::Shorts(v) => v.len(),
            Self::Ints(v) => v.len(),
            Self::Floats(v) => v.len(),
            Self::Doubles(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The typed values of an [`ArrayData`].
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayValues {
    Bytes(Vec<i8>),
    Chars(Vec<u8>),
    Shorts(Vec<i16>),
    Ints(Vec<i32>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
}

/// A typed multi-dimensional array, stored flat in row-major order.
///
/// `shape` is the logical extent along each axis; an empty shape denotes a
/// scalar (one value). For a single frame read from a frame-dimensioned
/// variable the shape covers the non-frame axes only.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayData {
    pub values: ArrayValues,
    pub shape: Vec<usize>,
}

fn permute<T: Copy + Default>(src: &[T], row_size: usize, dest: &[usize]) -> Vec<T> {
    let mut out = vec![T::default(); src.len()];
    for (i, &d) in dest.iter().enumerate() {
        out[d * row_size..(d + 1) * row_size].copy_from_slice(&src[i * row_size..(i + 1) * row_size]);
    }
    out
}

impl ArrayData {
    pub fn new(values: ArrayValues, shape: Vec<usize>) -> Self {
        Self { values, shape }
    }

    /// Build an array of the given element type from `f64` values.
    ///
    /// Used to materialize the corrected timeline in whatever type the time
    /// variable was declared with.
    pub fn from_f64(nc_type: NcType, values: &[f64], shape: Vec<usize>) -> Self {
        let values = match nc_type {
            NcType::Byte => ArrayValues::Bytes(values.iter().map(|&v| v as i8).collect()),
            NcType::Char => ArrayValues::Chars(values.iter().map(|&v| v as u8).collect()),
            NcType::Short => ArrayValues::Shorts(values.iter().map(|&v| v as i16).collect()),
            NcType::Int => ArrayValues::Ints(values.iter().map(|&v| v as i32).collect()),
            NcType::Float => ArrayValues::Floats(values.iter().map(|&v| v as f32).collect()),
            NcType::Double => ArrayValues::Doubles(values.to_vec()),
        };
        Self { values, shape }
    }

    /// Element type of the payload.
    pub fn nc_type(&self) -> NcType {
        match &self.values {
            ArrayValues::Bytes(_) => NcType::Byte,
            ArrayValues::Chars(_) => NcType::Char,
            ArrayValues::Shorts(_) => NcType::Short,
            ArrayValues::Ints(_) => NcType::Int,
            ArrayValues::Floats(_) => NcType::Float,
            ArrayValues::Doubles(_) => NcType::Double,
        }
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        match &self.values {
            ArrayValues::Bytes(v) => v.len(),
            ArrayValues::Chars(v) => v.len(),
            ArrayValues::Shorts(v) => v.len(),
            ArrayValues::Ints(v) => v.len(),
            ArrayValues::Floats(v) => v.len(),
            ArrayValues::Doubles(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All values widened to `f64`, in storage order.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match &self.values {
            ArrayValues::Bytes(v) => v.iter().map(|&x| x as f64).collect(),
            ArrayValues::Chars(v) => v.iter().map(|&x| x as f64).collect(),
            ArrayValues::Shorts(v) => v.iter().map(|&x| x as f64).collect(),
            ArrayValues::Ints(v) => v.iter().map(|&x| x as f64).collect(),
            ArrayValues::Floats(v) => v.iter().map(|&x| x as f64).collect(),
            ArrayValues::Doubles(v) => v.clone(),
        }
    }

    /// All values truncated to `i64`, in storage order.
    ///
    /// Used for particle identifier variables, which are integer-typed in
    /// practice but occasionally stored as floats.
    pub fn to_i64_vec(&self) -> Vec<i64> {
        match &self.values {
            ArrayValues::Bytes(v) => v.iter().map(|&x| x as i64).collect(),
            ArrayValues::Chars(v) => v.iter().map(|&x| x as i64).collect(),
            ArrayValues::Shorts(v) => v.iter().map(|&x| x as i64).collect(),
            ArrayValues::Ints(v) => v.iter().map(|&x| x as i64).collect(),
            ArrayValues::Floats(v) => v.iter().map(|&x| x as i64).collect(),
            ArrayValues::Doubles(v) => v.iter().map(|&x| x as i64).collect(),
        }
    }

    /// True if no element is NaN or infinite. Integer and character arrays
    /// are always finite.
    pub fn is_finite(&self) -> bool {
        match &self.values {
            ArrayValues::Floats(v) => v.iter().all(|x| x.is_finite()),
            ArrayValues::Doubles(v) => v.iter().all(|x| x.is_finite()),
            _ => true,
        }
    }

    /// Permute the rows along the first axis.
    ///
    /// Row `i` of the input is placed at row `dest[i]` of the output. The
    /// destination array must be a permutation of `0..shape[0]`.
    pub fn permute_rows(&self, dest: &[usize]) -> Result<ArrayData> {
        let nrows = *self
            .shape
            .first()
            .ok_or_else(|| Error::invalid("cannot permute rows of a scalar"))?;
        if dest.len() != nrows {
            return Err(Error::invalid(format!(
                "row permutation has {} entries for {} rows",
                dest.len(),
                nrows
            )));
        }
        if let Some(&bad) = dest.iter().find(|&&d| d >= nrows) {
            return Err(Error::invalid(format!(
                "row permutation target {} out of range (rows: {})",
                bad, nrows
            )));
        }
        let row_size = if nrows == 0 { 0 } else { self.len() / nrows };
        let values = match &self.values {
            ArrayValues::Bytes(v) => ArrayValues::Bytes(permute(v, row_size, dest)),
            ArrayValues::Chars(v) => ArrayValues::Chars(permute(v, row_size, dest)),
            ArrayValues::Shorts(v) => ArrayValues::Shorts(permute(v, row_size, dest)),
            ArrayValues::Ints(v) => ArrayValues::Ints(permute(v, row_size, dest)),
            ArrayValues::Floats(v) => ArrayValues::Floats(permute(v, row_size, dest)),
            ArrayValues::Doubles(v) => ArrayValues::Doubles(permute(v, row_size, dest)),
        };
        Ok(ArrayData {
            values,
            shape: self.shape.clone(),
        })
    }
}

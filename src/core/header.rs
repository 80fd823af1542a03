//! Dimension and variable schema descriptions.

use crate::core::AttrValue;
use crate::util::NcType;

/// A named dimension of a dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    /// Current length; for the unlimited dimension this is the record count.
    pub len: usize,
    /// True for the growable (record) dimension.
    pub unlimited: bool,
}

impl Dimension {
    pub fn fixed(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            len,
            unlimited: false,
        }
    }

    pub fn unlimited(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            len: 0,
            unlimited: true,
        }
    }
}

/// Schema of one variable: name, element type, dimension names, attributes.
///
/// Attribute order is preserved; classic NetCDF headers are order-sensitive
/// and tools diff them textually.
#[derive(Clone, Debug, PartialEq)]
pub struct VarSchema {
    pub name: String,
    pub nc_type: NcType,
    pub dims: Vec<String>,
    pub attrs: Vec<(String, AttrValue)>,
}

impl VarSchema {
    pub fn new(name: impl Into<String>, nc_type: NcType, dims: &[&str]) -> Self {
        Self {
            name: name.into(),
            nc_type,
            dims: dims.iter().map(|d| d.to_string()).collect(),
            attrs: Vec::new(),
        }
    }

    /// Add an attribute, keeping definition order.
    pub fn with_attr(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.attrs.push((name.into(), value));
        self
    }

    /// Look up an attribute by name.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// True if the leading dimension is `dim` (frame-indexed variables).
    pub fn first_dim_is(&self, dim: &str) -> bool {
        self.dims.first().map(String::as_str) == Some(dim)
    }

    /// True if the second dimension is `dim` (per-particle variables).
    pub fn second_dim_is(&self, dim: &str) -> bool {
        self.dims.get(1).map(String::as_str) == Some(dim)
    }
}

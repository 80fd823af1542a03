//! Abstract traits over the dataset container.
//!
//! The joining algorithms only ever see these capabilities, never a concrete
//! file format. The `netcdf` module provides the classic NetCDF-3
//! implementation.

use std::path::Path;

use crate::core::{ArrayData, AttrValue, Dimension, VarSchema};
use crate::util::Result;

// ============================================================================
// Reader
// ============================================================================

/// Read access to one segment file.
pub trait DatasetReader {
    /// Path the dataset was opened from.
    fn path(&self) -> &Path;

    /// All dimensions, in definition order.
    fn dimensions(&self) -> &[Dimension];

    /// All variable schemas, in definition order.
    fn variables(&self) -> &[VarSchema];

    /// Global attributes, in definition order.
    fn global_attrs(&self) -> &[(String, AttrValue)];

    /// Number of frames (records along the unlimited dimension).
    fn num_frames(&self) -> usize;

    /// Read a variable in full. For frame-indexed variables the leading
    /// shape axis is the frame count.
    fn read_all(&self, name: &str) -> Result<ArrayData>;

    /// Read one frame slice of a frame-indexed variable.
    fn read_frame(&self, name: &str, frame: usize) -> Result<ArrayData>;

    /// Look up a variable schema by name.
    fn variable(&self, name: &str) -> Option<&VarSchema> {
        self.variables().iter().find(|v| v.name == name)
    }

    /// Look up a dimension by name.
    fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions().iter().find(|d| d.name == name)
    }

    fn has_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    fn has_dimension(&self, name: &str) -> bool {
        self.dimension(name).is_some()
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Write access to the merged output dataset.
///
/// Implementations follow a define-then-write lifecycle: dimensions,
/// variables, and attributes are declared first; the first data write
/// commits the schema, after which further declarations fail.
pub trait DatasetWriter {
    /// Path the dataset is being written to.
    fn path(&self) -> &Path;

    /// True when the storage format does not allow a variable to share a
    /// dimension's name. Classic NetCDF-3 allows it; the hook exists so the
    /// copier can skip such variables on formats that forbid it.
    fn forbids_dim_name_collision(&self) -> bool {
        false
    }

    fn has_dimension(&self, name: &str) -> bool;

    fn has_variable(&self, name: &str) -> bool;

    /// Create a dimension. `len` of `None` creates the growable frame
    /// dimension.
    fn add_dimension(&mut self, name: &str, len: Option<usize>) -> Result<()>;

    /// Create a variable with its attributes.
    fn add_variable(&mut self, schema: &VarSchema) -> Result<()>;

    /// Set a global attribute.
    fn put_global_attr(&mut self, name: &str, value: AttrValue) -> Result<()>;

    /// Write a non-frame-indexed variable in full.
    fn write_all(&mut self, name: &str, data: &ArrayData) -> Result<()>;

    /// Write one frame slice of a frame-indexed variable at the given frame
    /// offset.
    fn write_frame(&mut self, name: &str, frame: usize, data: &ArrayData) -> Result<()>;

    /// Flush and finalize the dataset.
    fn close(self: Box<Self>) -> Result<()>;
}

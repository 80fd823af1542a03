//! In-memory dataset implementations for unit tests.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::core::{
    ArrayData, ArrayValues, AttrValue, DatasetReader, DatasetWriter, Dimension, VarSchema,
};
use crate::util::{Error, NcType, Result};

fn slice_rows(data: &ArrayData, frame: usize) -> ArrayData {
    let rows = data.shape[0];
    let row_size: usize = data.shape[1..].iter().product();
    assert!(frame < rows, "frame {frame} out of {rows}");
    let range = frame * row_size..(frame + 1) * row_size;
    let values = match &data.values {
        ArrayValues::Bytes(v) => ArrayValues::Bytes(v[range].to_vec()),
        ArrayValues::Chars(v) => ArrayValues::Chars(v[range].to_vec()),
        ArrayValues::Shorts(v) => ArrayValues::Shorts(v[range].to_vec()),
        ArrayValues::Ints(v) => ArrayValues::Ints(v[range].to_vec()),
        ArrayValues::Floats(v) => ArrayValues::Floats(v[range].to_vec()),
        ArrayValues::Doubles(v) => ArrayValues::Doubles(v[range].to_vec()),
    };
    ArrayData::new(values, data.shape[1..].to_vec())
}

/// Read-only dataset backed by owned arrays.
#[derive(Clone, Debug, Default)]
pub struct MemReader {
    path: PathBuf,
    dims: Vec<Dimension>,
    vars: Vec<VarSchema>,
    gattrs: Vec<(String, AttrValue)>,
    data: HashMap<String, ArrayData>,
    frames: usize,
}

impl MemReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_dim(mut self, name: &str, len: usize, unlimited: bool) -> Self {
        if unlimited {
            self.frames = len;
        }
        self.dims.push(Dimension {
            name: name.to_string(),
            len,
            unlimited,
        });
        self
    }

    pub fn with_gattr(mut self, name: &str, value: AttrValue) -> Self {
        self.gattrs.push((name.to_string(), value));
        self
    }

    pub fn with_var(mut self, schema: VarSchema, data: ArrayData) -> Self {
        self.data.insert(schema.name.clone(), data);
        self.vars.push(schema);
        self
    }

    /// A minimal trajectory: `time(frame)` and `coordinates(frame, atom)`.
    pub fn trajectory(path: &str, times: &[f64], coords: &[f64], atoms: usize) -> Self {
        let frames = times.len();
        Self::new(path)
            .with_dim("frame", frames, true)
            .with_dim("atom", atoms, false)
            .with_var(
                VarSchema::new("time", NcType::Double, &["frame"]),
                ArrayData::new(ArrayValues::Doubles(times.to_vec()), vec![frames]),
            )
            .with_var(
                VarSchema::new("coordinates", NcType::Double, &["frame", "atom"]),
                ArrayData::new(ArrayValues::Doubles(coords.to_vec()), vec![frames, atoms]),
            )
    }

    /// A trajectory with no time variable; frame indices serve as times.
    pub fn trajectory_without_time(path: &str, coords: &[f64], atoms: usize) -> Self {
        let frames = coords.len() / atoms;
        Self::new(path)
            .with_dim("frame", frames, true)
            .with_dim("atom", atoms, false)
            .with_var(
                VarSchema::new("coordinates", NcType::Double, &["frame", "atom"]),
                ArrayData::new(ArrayValues::Doubles(coords.to_vec()), vec![frames, atoms]),
            )
    }
}

impl DatasetReader for MemReader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn dimensions(&self) -> &[Dimension] {
        &self.dims
    }

    fn variables(&self) -> &[VarSchema] {
        &self.vars
    }

    fn global_attrs(&self) -> &[(String, AttrValue)] {
        &self.gattrs
    }

    fn num_frames(&self) -> usize {
        self.frames
    }

    fn read_all(&self, name: &str) -> Result<ArrayData> {
        self.data
            .get(name)
            .cloned()
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))
    }

    fn read_frame(&self, name: &str, frame: usize) -> Result<ArrayData> {
        let data = self
            .data
            .get(name)
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))?;
        Ok(slice_rows(data, frame))
    }
}

/// Growable dataset capturing everything the copier writes.
#[derive(Debug, Default)]
pub struct MemWriter {
    path: PathBuf,
    pub dims: Vec<Dimension>,
    pub vars: Vec<VarSchema>,
    pub gattrs: Vec<(String, AttrValue)>,
    pub fixed: HashMap<String, ArrayData>,
    pub frames: HashMap<String, BTreeMap<usize, ArrayData>>,
    pub forbid_collision: bool,
}

impl MemWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Frame rows of one variable in write order, flattened to `f64`.
    pub fn frame_values(&self, name: &str) -> Vec<f64> {
        self.frames
            .get(name)
            .map(|rows| rows.values().flat_map(|r| r.to_f64_vec()).collect())
            .unwrap_or_default()
    }

    pub fn frame_count(&self, name: &str) -> usize {
        self.frames.get(name).map_or(0, |rows| rows.len())
    }
}

impl DatasetWriter for MemWriter {
    fn path(&self) -> &Path {
        &self.path
    }

    fn forbids_dim_name_collision(&self) -> bool {
        self.forbid_collision
    }

    fn has_dimension(&self, name: &str) -> bool {
        self.dims.iter().any(|d| d.name == name)
    }

    fn has_variable(&self, name: &str) -> bool {
        self.vars.iter().any(|v| v.name == name)
    }

    fn add_dimension(&mut self, name: &str, len: Option<usize>) -> Result<()> {
        self.dims.push(match len {
            Some(n) => Dimension::fixed(name, n),
            None => Dimension::unlimited(name),
        });
        Ok(())
    }

    fn add_variable(&mut self, schema: &VarSchema) -> Result<()> {
        self.vars.push(schema.clone());
        Ok(())
    }

    fn put_global_attr(&mut self, name: &str, value: AttrValue) -> Result<()> {
        self.gattrs.push((name.to_string(), value));
        Ok(())
    }

    fn write_all(&mut self, name: &str, data: &ArrayData) -> Result<()> {
        self.fixed.insert(name.to_string(), data.clone());
        Ok(())
    }

    fn write_frame(&mut self, name: &str, frame: usize, data: &ArrayData) -> Result<()> {
        self.frames
            .entry(name.to_string())
            .or_default()
            .insert(frame, data.clone());
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

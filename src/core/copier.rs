//! Frame copying: moves the selected frames of every segment into the
//! output dataset, restoring canonical particle order on the way.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::core::sequence::SegmentSelection;
use crate::core::{ArrayData, DatasetReader, DatasetWriter, VarSchema};
use crate::util::{Error, Result};

/// Name of the per-frame axis.
pub const FRAME_DIM: &str = "frame";

/// Name of the per-particle axis.
pub const ATOM_DIM: &str = "atom";

/// Knobs of the copying stage.
#[derive(Clone, Debug)]
pub struct CopyParams {
    /// Frame-indexed variable rewritten from the corrected timeline.
    pub time_var: String,
    /// Persistent particle identifier variable; always excluded from output.
    pub index_var: String,
    /// Added to an identifier to obtain the zero-based storage row.
    pub index_offset: i64,
    /// Additional variables excluded from output.
    pub exclude: BTreeSet<String>,
}

impl Default for CopyParams {
    fn default() -> Self {
        Self {
            time_var: "time".to_string(),
            index_var: "id".to_string(),
            index_offset: -1,
            exclude: BTreeSet::new(),
        }
    }
}

impl CopyParams {
    fn excludes(&self, name: &str) -> bool {
        name == self.index_var || self.exclude.contains(name)
    }
}

/// Verify the identifier variable is shaped `(frame, atom)`; returns whether
/// it exists at all.
fn check_index_var(reader: &impl DatasetReader, index_var: &str) -> Result<bool> {
    match reader.variable(index_var) {
        None => Ok(false),
        Some(schema) => {
            if schema.dims.len() == 2
                && schema.first_dim_is(FRAME_DIM)
                && schema.second_dim_is(ATOM_DIM)
            {
                Ok(true)
            } else {
                Err(Error::MalformedIndexVariable(index_var.to_string()))
            }
        }
    }
}

/// Mirror any not-yet-present variable schema (with its dimensions and
/// attributes) into the output.
fn ensure_schema<R: DatasetReader, W: DatasetWriter>(
    reader: &R,
    writer: &mut W,
    params: &CopyParams,
) -> Result<()> {
    for var in reader.variables() {
        if params.excludes(&var.name) || writer.has_variable(&var.name) {
            continue;
        }
        if writer.forbids_dim_name_collision() && reader.has_dimension(&var.name) {
            warn!(
                "skipping variable '{}' because there is a dimension of the same name",
                var.name
            );
            continue;
        }
        for dim_name in &var.dims {
            if !writer.has_dimension(dim_name) {
                let dim = reader
                    .dimension(dim_name)
                    .ok_or_else(|| Error::DimensionNotFound(dim_name.clone()))?;
                debug!("creating dimension '{}'", dim_name);
                let len = if dim.unlimited { None } else { Some(dim.len) };
                writer.add_dimension(dim_name, len)?;
            }
        }
        debug!("creating variable '{}'", var.name);
        writer.add_variable(var)?;
    }
    Ok(())
}

/// Map identifiers to storage rows, validating the range.
fn dest_positions(ids: &[i64], offset: i64, rows: usize) -> Result<Vec<usize>> {
    ids.iter()
        .map(|&id| {
            let pos = id + offset;
            if pos < 0 || pos as usize >= rows {
                Err(Error::invalid(format!(
                    "particle identifier {} maps to row {} outside 0..{}",
                    id, pos, rows
                )))
            } else {
                Ok(pos as usize)
            }
        })
        .collect()
}

fn copy_frame_var<R: DatasetReader, W: DatasetWriter>(
    reader: &R,
    writer: &mut W,
    var: &VarSchema,
    sel: &SegmentSelection,
    cursor: usize,
    has_index: bool,
    params: &CopyParams,
) -> Result<()> {
    let reorder = has_index && var.dims.len() > 1 && var.second_dim_is(ATOM_DIM);
    for (oframe, &iframe) in sel.frames.iter().enumerate() {
        let mut row = reader.read_frame(&var.name, iframe)?;
        if !row.is_finite() {
            warn!(
                "data is nan or inf in variable '{}' at frame {}",
                var.name,
                cursor + oframe
            );
        }
        if reorder {
            let ids = reader.read_frame(&params.index_var, iframe)?.to_i64_vec();
            let dest = dest_positions(&ids, params.index_offset, row.shape[0])?;
            row = row.permute_rows(&dest)?;
        }
        writer.write_frame(&var.name, cursor + oframe, &row)?;
    }
    Ok(())
}

/// Per-file variables are written once and value-checked against the
/// immediately previous segment afterwards.
fn copy_per_file_var<R: DatasetReader, W: DatasetWriter>(
    reader: &R,
    prev: Option<&R>,
    writer: &mut W,
    var: &VarSchema,
) -> Result<()> {
    match prev {
        Some(p) if p.has_variable(&var.name) => {
            debug!("checking variable '{}' for consistency across files", var.name);
            if reader.read_all(&var.name)? != p.read_all(&var.name)? {
                return Err(Error::PerFileVarMismatch {
                    variable: var.name.clone(),
                    file1: p.path().to_path_buf(),
                    file2: reader.path().to_path_buf(),
                });
            }
        }
        _ => {
            debug!("copying variable '{}'", var.name);
            writer.write_all(&var.name, &reader.read_all(&var.name)?)?;
        }
    }
    Ok(())
}

/// Copy every selected frame into the output and return the total frame
/// count written.
///
/// Segments are reopened through `open` and processed strictly in order; the
/// previous segment's reader stays open one step longer than the current one
/// so per-file variables can be compared across the pair.
pub fn copy_frames<R, W, F>(
    selections: &[SegmentSelection],
    writer: &mut W,
    params: &CopyParams,
    open: F,
) -> Result<usize>
where
    R: DatasetReader,
    W: DatasetWriter,
    F: Fn(&Path) -> Result<R>,
{
    let mut cursor = 0usize;
    let mut prev: Option<R> = None;

    for sel in selections {
        let reader = open(&sel.path)?;
        info!(
            "appending '{}' starting at frame {} ({} frames)",
            sel.path.display(),
            cursor,
            sel.times.len()
        );

        let has_index = check_index_var(&reader, &params.index_var)?;
        ensure_schema(&reader, writer, params)?;

        for var in reader.variables() {
            if params.excludes(&var.name) {
                continue;
            }
            // Label variables sharing a dimension's name carry no frame
            // data; only their schema travels.
            if reader.has_dimension(&var.name) {
                continue;
            }
            // Dropped by the dimension-name collision policy.
            if !writer.has_variable(&var.name) {
                continue;
            }

            if var.first_dim_is(FRAME_DIM) {
                if var.name == params.time_var {
                    for (oframe, &t) in sel.times.iter().enumerate() {
                        let row = ArrayData::from_f64(var.nc_type, &[t], Vec::new());
                        writer.write_frame(&var.name, cursor + oframe, &row)?;
                    }
                } else {
                    copy_frame_var(&reader, writer, var, sel, cursor, has_index, params)?;
                }
            } else {
                copy_per_file_var(&reader, prev.as_ref(), writer, var)?;
            }
        }

        cursor += sel.times.len();
        // Keeps the previous handle alive exactly one segment longer.
        prev = Some(reader);
    }

    Ok(cursor)
}

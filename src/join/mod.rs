//! End-to-end joining of trajectory segments into one output file.
//!
//! This ties the pipeline together: sequence the segments into a corrected
//! timeline, optionally resample it onto a uniform interval, then copy the
//! selected frames into a freshly created NetCDF file.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::info;

use crate::core::copier::{copy_frames, CopyParams};
use crate::core::resample::resample;
use crate::core::sequence::{sequence_segments, Segment, StitchParams};
use crate::core::timeline::Tolerance;
use crate::core::{DatasetReader, DatasetWriter};
use crate::netcdf::{NcReader, NcVersion, NcWriter};
use crate::util::{Error, Result};

/// Everything the join needs to know, with the same defaults the command
/// line uses.
#[derive(Clone, Debug)]
pub struct JoinConfig {
    /// Ordered input segments.
    pub segments: Vec<Segment>,
    /// Per-frame time variable.
    pub time_var: String,
    /// Variable compared across segments to locate overlaps.
    pub test_var: String,
    /// Restrict the comparison to one element of the test variable's second
    /// axis.
    pub test_index: Option<usize>,
    /// Comparison tolerance.
    pub tolerance: Tolerance,
    /// Resample the joined timeline onto this interval, if set.
    pub every: Option<f64>,
    /// Persistent particle identifier variable.
    pub index_var: String,
    /// Added to an identifier to obtain the zero-based storage row.
    pub index_offset: i64,
    /// Variables dropped from the output.
    pub exclude: BTreeSet<String>,
    /// Output path; must not exist.
    pub output: PathBuf,
    /// Output format flavor.
    pub format: NcVersion,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            segments: Vec::new(),
            time_var: "time".to_string(),
            test_var: "coordinates".to_string(),
            test_index: None,
            tolerance: Tolerance::default(),
            every: None,
            index_var: "id".to_string(),
            index_offset: -1,
            exclude: BTreeSet::new(),
            output: PathBuf::from("traj.nc"),
            format: NcVersion::Offset64,
        }
    }
}

/// What the join produced.
#[derive(Clone, Debug)]
pub struct JoinSummary {
    pub frames_written: usize,
    pub output: PathBuf,
}

/// Run the whole pipeline described by `config`.
pub fn join(config: &JoinConfig) -> Result<JoinSummary> {
    if config.segments.is_empty() {
        return Err(Error::other("no input files given"));
    }
    if config.output.exists() {
        return Err(Error::OutputExists(config.output.clone()));
    }

    let stitch = StitchParams {
        time_var: config.time_var.clone(),
        test_var: config.test_var.clone(),
        test_index: config.test_index,
        tolerance: config.tolerance.clone(),
    };
    let mut selections = sequence_segments(&config.segments, &stitch, |p| NcReader::open(p))?;

    if let Some(every) = config.every {
        selections = resample(&selections, every)?;
    }

    let total: usize = selections.iter().map(|s| s.times.len()).sum();
    info!(
        "writing {} frames from {} segments to '{}'",
        total,
        selections.len(),
        config.output.display()
    );

    let mut writer = NcWriter::create(&config.output, config.format)?;
    {
        // Global attributes travel from the first retained segment.
        let first = NcReader::open(&selections[0].path)?;
        for (name, value) in first.global_attrs() {
            writer.put_global_attr(name, value.clone())?;
        }
    }

    let params = CopyParams {
        time_var: config.time_var.clone(),
        index_var: config.index_var.clone(),
        index_offset: config.index_offset,
        exclude: config.exclude.clone(),
    };
    let frames_written = copy_frames(&selections, &mut writer, &params, |p| NcReader::open(p))?;
    writer.finish()?;

    Ok(JoinSummary {
        frames_written,
        output: config.output.clone(),
    })
}

//! Segment sequencing: drives the timeline builder over the full ordered
//! file list and produces one selection record per segment.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::timeline::{find_overlap, fix_time, TestSeries, Tolerance};
use crate::core::DatasetReader;
use crate::util::{Error, Result};

/// One input trajectory file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub path: PathBuf,
    /// Skip the overlap check against the preceding segment and keep all of
    /// its frames, including the last.
    pub trusted: bool,
}

impl Segment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            trusted: false,
        }
    }

    pub fn trusted(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            trusted: true,
        }
    }
}

/// The frames of one segment chosen for output, with corrected timestamps.
///
/// Invariant: `frames` is strictly increasing and `frames.len() == times.len()`.
#[derive(Clone, Debug)]
pub struct SegmentSelection {
    pub path: PathBuf,
    pub trusted: bool,
    /// Local frame indices to copy, in order.
    pub frames: Vec<usize>,
    /// Corrected timeline values for those frames.
    pub times: Vec<f64>,
}

/// Inputs of the stitching search.
#[derive(Clone, Debug)]
pub struct StitchParams {
    /// Name of the per-frame time variable.
    pub time_var: String,
    /// Name of the variable compared across segments.
    pub test_var: String,
    /// Restrict the comparison to one index of the test variable's second
    /// axis.
    pub test_index: Option<usize>,
    pub tolerance: Tolerance,
}

impl Default for StitchParams {
    fn default() -> Self {
        Self {
            time_var: "time".to_string(),
            test_var: "coordinates".to_string(),
            test_index: None,
            tolerance: Tolerance::default(),
        }
    }
}

fn test_series(reader: &impl DatasetReader, params: &StitchParams) -> Result<TestSeries> {
    let data = reader.read_all(&params.test_var)?;
    let mut series = TestSeries::from_array(&data, params.test_index)?;
    if params.test_var == params.time_var {
        series.fix_as_time();
    }
    Ok(series)
}

/// The segment's declared times, or frame indices when it declares none.
fn frame_times(reader: &impl DatasetReader, time_var: &str) -> Result<Vec<f64>> {
    if reader.has_variable(time_var) {
        Ok(reader.read_all(time_var)?.to_f64_vec())
    } else {
        Ok((0..reader.num_frames()).map(|i| i as f64).collect())
    }
}

/// Cut the retained slice, fix its first timestamp, and shift it onto the
/// running timeline. Returns the record times and the continuation point for
/// the next segment.
fn corrected_slice(
    full_times: &[f64],
    first1: usize,
    last1: usize,
    last_time: Option<f64>,
) -> (Vec<f64>, Option<f64>) {
    let mut times = full_times[first1..last1.min(full_times.len())].to_vec();
    fix_time(&mut times);
    if let (Some(last), Some(&first)) = (last_time, times.first()) {
        let offset = last - first;
        for t in &mut times {
            *t += offset;
        }
    }

    let next_last = if last1 >= full_times.len() {
        // Nothing of this segment was dropped (trusted join); the next
        // segment starts one step past the end.
        match times.len() {
            0 => last_time,
            1 => Some(times[0] + 1.0),
            n => Some(times[n - 1] + (times[n - 1] - times[n - 2])),
        }
    } else {
        times.last().copied().or(last_time)
    };
    (times, next_last)
}

/// Walk the ordered segment list, find every adjacent overlap, and produce
/// per-segment selection records with a contiguous corrected timeline.
///
/// Segments are opened pairwise through `open` and released as soon as their
/// arrays are extracted; at most two are open at a time. Any failure aborts
/// the whole sequencing.
pub fn sequence_segments<R, F>(
    segments: &[Segment],
    params: &StitchParams,
    open: F,
) -> Result<Vec<SegmentSelection>>
where
    R: DatasetReader,
    F: Fn(&Path) -> Result<R>,
{
    if segments.is_empty() {
        return Err(Error::other("no input segments"));
    }

    let mut selections = Vec::with_capacity(segments.len());
    let mut last_time: Option<f64> = None;
    let mut first1 = 0usize;

    let mut current = open(&segments[0].path)?;
    let mut test_cur = test_series(&current, params)?;

    for pair in segments.windows(2) {
        let (seg, next_seg) = (&pair[0], &pair[1]);
        let next = open(&next_seg.path)?;
        let test_next = test_series(&next, params)?;

        info!("... {} and {} ...", seg.path.display(), next_seg.path.display());

        let (first2, last1) = if next_seg.trusted {
            (0, test_cur.len())
        } else {
            if test_cur.is_empty() || test_next.is_empty() {
                let empty = if test_cur.is_empty() { seg } else { next_seg };
                return Err(Error::invalid(format!(
                    "'{}' contains no frames",
                    empty.path.display()
                )));
            }
            if test_cur.row_len() != test_next.row_len() {
                return Err(Error::invalid(format!(
                    "test variable '{}' has {} elements per frame in '{}' but {} in '{}'",
                    params.test_var,
                    test_cur.row_len(),
                    seg.path.display(),
                    test_next.row_len(),
                    next_seg.path.display(),
                )));
            }
            match find_overlap(&test_cur, &test_next, &params.tolerance) {
                Ok(overlap) => (overlap.first2, overlap.last1),
                Err(bounds) => {
                    return Err(Error::NotConsecutive {
                        file1: seg.path.clone(),
                        file2: next_seg.path.clone(),
                        min_residual: bounds.min,
                        max_residual: bounds.max,
                    })
                }
            }
        };
        // A match before this segment's own continuation point would leave a
        // backward retained range; the files cannot be in playback order.
        if last1 < first1 {
            return Err(Error::invalid(format!(
                "'{}' continues into '{}' at frame {}, before frame {} where it \
                 took over from the previous file; check the input order",
                seg.path.display(),
                next_seg.path.display(),
                last1,
                first1
            )));
        }
        debug!(
            "frame {} of '{}' continues at frame {} of '{}'",
            last1,
            seg.path.display(),
            first2,
            next_seg.path.display()
        );

        let full_times = frame_times(&current, &params.time_var)?;
        let (times, next_last) = corrected_slice(&full_times, first1, last1, last_time);
        selections.push(SegmentSelection {
            path: seg.path.clone(),
            trusted: seg.trusted,
            frames: (first1..last1.min(full_times.len())).collect(),
            times,
        });
        last_time = next_last;

        // The next segment starts where we think it should start.
        first1 = first2;
        current = next;
        test_cur = test_next;
    }

    // The final segment keeps everything from its continuation point on.
    let last_seg = segments.last().unwrap_or_else(|| unreachable!());
    let full_times = frame_times(&current, &params.time_var)?;
    let end = full_times.len();
    let (times, _) = corrected_slice(&full_times, first1, end, last_time);
    selections.push(SegmentSelection {
        path: last_seg.path.clone(),
        trusted: last_seg.trusted,
        frames: (first1..end).collect(),
        times,
    });

    Ok(selections)
}

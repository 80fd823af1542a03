//! Timeline building for one pair of adjacent segments.
//!
//! Two segment files continue each other when some late frame of the first
//! matches an early frame of the second within a tolerance. The match is
//! searched numerically on a per-frame test quantity (coordinates by
//! convention), and each segment's declared timestamps are corrected for a
//! known recording artifact before the merged timeline is assembled.

use crate::core::ArrayData;
use crate::util::{Error, Result};

/// Timestamp spacing mismatch above this threshold triggers the first-slot
/// time fix.
pub const TIME_FIX_EPS: f64 = 1e-3;

/// Upper bound on how many leading frames of the later segment are tried as
/// the continuation point.
pub const MAX_START_CANDIDATES: usize = 6;

/// Tolerance for the frame-overlap comparison.
#[derive(Clone, Debug, PartialEq)]
pub enum Tolerance {
    /// One bound for every element of the test row.
    Scalar(f64),
    /// Per-element bounds, broadcast cyclically over the row (a length-3
    /// vector applies per spatial component of a flattened (atom, 3) row).
    /// An empty vector gives no bound at all and matches nothing.
    PerElement(Vec<f64>),
}

impl Tolerance {
    /// True when every element pair differs by at most its bound.
    pub fn allows(&self, a: &[f64], b: &[f64]) -> bool {
        match self {
            Self::Scalar(tol) => a.iter().zip(b).all(|(x, y)| (x - y).abs() <= *tol),
            Self::PerElement(tols) if tols.is_empty() => false,
            Self::PerElement(tols) => a
                .iter()
                .zip(b)
                .enumerate()
                .all(|(k, (x, y))| (x - y).abs() <= tols[k % tols.len()]),
        }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::Scalar(1e-6)
    }
}

/// Per-frame rows of the test quantity, flattened to `f64`.
#[derive(Clone, Debug)]
pub struct TestSeries {
    values: Vec<f64>,
    rows: usize,
    row_len: usize,
}

impl TestSeries {
    /// Build from a whole-variable read with shape `(frames, ...)`.
    ///
    /// `element` restricts the row to one index of the second axis, the way
    /// `coordinates[0]` selects one atom's trajectory.
    pub fn from_array(data: &ArrayData, element: Option<usize>) -> Result<Self> {
        let rows = *data
            .shape
            .first()
            .ok_or_else(|| Error::invalid("test variable has no frame dimension"))?;
        let full_row: usize = data.shape[1..].iter().product();
        let values = data.to_f64_vec();

        match element {
            None => Ok(Self {
                values,
                rows,
                row_len: full_row,
            }),
            Some(idx) => {
                let second = *data.shape.get(1).ok_or_else(|| {
                    Error::invalid("test variable element index requires a second dimension")
                })?;
                if idx >= second {
                    return Err(Error::invalid(format!(
                        "test variable element index {} out of range (size: {})",
                        idx, second
                    )));
                }
                let sub: usize = data.shape[2..].iter().product();
                let mut restricted = Vec::with_capacity(rows * sub);
                for r in 0..rows {
                    let start = r * full_row + idx * sub;
                    restricted.extend_from_slice(&values[start..start + sub]);
                }
                Ok(Self {
                    values: restricted,
                    rows,
                    row_len: sub,
                })
            }
        }
    }

    /// Number of frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Elements per frame row.
    #[inline]
    pub fn row_len(&self) -> usize {
        self.row_len
    }

    /// One frame's flattened row.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.row_len..(i + 1) * self.row_len]
    }

    /// Apply the timestamp artifact fix when the series is itself a time
    /// series (one element per frame).
    pub fn fix_as_time(&mut self) {
        if self.row_len == 1 {
            fix_time(&mut self.values);
        }
    }
}

/// Where segment B continues segment A.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overlap {
    /// Frame of B that duplicates frame `last1` of A.
    pub first2: usize,
    /// First frame of A not retained; A keeps `[.., last1)`.
    pub last1: usize,
}

/// Smallest and largest per-row residual seen during a failed search.
#[derive(Clone, Copy, Debug)]
pub struct ResidualBounds {
    pub min: f64,
    pub max: f64,
}

fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Search for the frame offset at which `b` continues `a`.
///
/// Candidates for B's continuation frame are tried from 0 upward, at most
/// [`MAX_START_CANDIDATES`]; for each, A is scanned backward from its final
/// frame. The first in-tolerance pair wins. On failure the observed residual
/// bounds are returned for diagnostics.
pub fn find_overlap(
    a: &TestSeries,
    b: &TestSeries,
    tol: &Tolerance,
) -> std::result::Result<Overlap, ResidualBounds> {
    let mut bounds = ResidualBounds {
        min: f64::INFINITY,
        max: 0.0,
    };
    for first2 in 0..b.len().min(MAX_START_CANDIDATES) {
        let target = b.row(first2);
        for last1 in (0..a.len()).rev() {
            let row = a.row(last1);
            if tol.allows(row, target) {
                return Ok(Overlap { first2, last1 });
            }
            let r = max_abs_diff(row, target);
            bounds.min = bounds.min.min(r);
            bounds.max = bounds.max.max(r);
        }
    }
    if bounds.min > bounds.max {
        // No comparison ran (one series was empty); report zero residuals
        // rather than an infinite minimum.
        bounds = ResidualBounds { min: 0.0, max: 0.0 };
    }
    Err(bounds)
}

/// Correct the known first-timestamp artifact in place.
///
/// Some recorders emit a zero in the first time slot. When the first three
/// values are not evenly spaced, the first is recomputed assuming a constant
/// step: `t[0] = t[1] - (t[2] - t[1])`.
pub fn fix_time(time: &mut [f64]) {
    if time.len() > 2 && ((time[2] - time[1]) - (time[1] - time[0])).abs() > TIME_FIX_EPS {
        time[0] = time[1] - (time[2] - time[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ArrayValues;

    fn series(rows: &[&[f64]]) -> TestSeries {
        let row_len = rows.first().map_or(0, |r| r.len());
        let values: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        let data = ArrayData::new(ArrayValues::Doubles(values), vec![rows.len(), row_len]);
        TestSeries::from_array(&data, None).unwrap()
    }

    #[test]
    fn test_fix_time_recomputes_bad_first_slot() {
        let mut t = [0.0, 5.0, 6.0, 7.0];
        fix_time(&mut t);
        assert_eq!(t, [4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_fix_time_keeps_evenly_spaced() {
        let mut t = [1.0, 2.0, 3.0, 4.0];
        fix_time(&mut t);
        assert_eq!(t, [1.0, 2.0, 3.0, 4.0]);

        // Too short to judge spacing.
        let mut short = [0.0, 9.0];
        fix_time(&mut short);
        assert_eq!(short, [0.0, 9.0]);
    }

    #[test]
    fn test_find_overlap_two_frame_overlap() {
        // A's last two frames repeat as B's first two.
        let a = series(&[&[0.0], &[1.0], &[2.0], &[3.0]]);
        let b = series(&[&[2.0], &[3.0], &[4.0], &[5.0]]);
        let m = find_overlap(&a, &b, &Tolerance::Scalar(1e-9)).unwrap();
        assert_eq!(m, Overlap { first2: 0, last1: 2 });
    }

    #[test]
    fn test_find_overlap_prefers_early_continuation_frame() {
        // B starts one frame before A's end; frame B[1] equals A[3].
        let a = series(&[&[0.0], &[1.0], &[2.0], &[3.0]]);
        let b = series(&[&[10.0], &[3.0], &[4.0]]);
        let m = find_overlap(&a, &b, &Tolerance::Scalar(1e-9)).unwrap();
        assert_eq!(m, Overlap { first2: 1, last1: 3 });
    }

    #[test]
    fn test_find_overlap_failure_reports_residuals() {
        let a = series(&[&[0.0], &[1.0]]);
        let b = series(&[&[10.0], &[11.0]]);
        let bounds = find_overlap(&a, &b, &Tolerance::Scalar(1e-6)).unwrap_err();
        assert!(bounds.min >= 8.0);
        assert!(bounds.max >= bounds.min);
    }

    #[test]
    fn test_find_overlap_respects_candidate_bound() {
        // The matching frame of B sits past the candidate window.
        let a = series(&[&[0.0], &[1.0]]);
        let mut rows: Vec<Vec<f64>> = (0..MAX_START_CANDIDATES).map(|i| vec![100.0 + i as f64]).collect();
        rows.push(vec![1.0]);
        let refs: Vec<&[f64]> = rows.iter().map(|r| r.as_slice()).collect();
        let b = series(&refs);
        assert!(find_overlap(&a, &b, &Tolerance::Scalar(1e-9)).is_err());
    }

    #[test]
    fn test_vector_tolerance_broadcasts_over_row() {
        // Loose bound on x, tight on y; rows are flattened (atom, 2).
        let a = series(&[&[0.0, 0.0, 1.0, 1.0]]);
        let b = series(&[&[0.4, 0.0, 1.4, 1.0]]);
        let tol = Tolerance::PerElement(vec![0.5, 1e-9]);
        assert!(find_overlap(&a, &b, &tol).is_ok());

        let tol = Tolerance::PerElement(vec![1e-9, 0.5]);
        assert!(find_overlap(&a, &b, &tol).is_err());
    }

    #[test]
    fn test_empty_vector_tolerance_matches_nothing() {
        let tol = Tolerance::PerElement(Vec::new());
        assert!(!tol.allows(&[0.0], &[0.0]));

        let a = series(&[&[0.0]]);
        let b = series(&[&[0.0]]);
        assert!(find_overlap(&a, &b, &tol).is_err());
    }

    #[test]
    fn test_failure_bounds_stay_ordered_without_comparisons() {
        let empty = series(&[]);
        let b = series(&[&[1.0]]);
        let bounds = find_overlap(&empty, &b, &Tolerance::Scalar(1e-6)).unwrap_err();
        assert!(bounds.min <= bounds.max);
        assert_eq!((bounds.min, bounds.max), (0.0, 0.0));
    }

    #[test]
    fn test_series_element_restriction() {
        // Shape (2 frames, 3 atoms, 2 components); select atom 1.
        let values: Vec<f64> = (0..12).map(|v| v as f64).collect();
        let data = ArrayData::new(ArrayValues::Doubles(values), vec![2, 3, 2]);
        let s = TestSeries::from_array(&data, Some(1)).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.row_len(), 2);
        assert_eq!(s.row(0), &[2.0, 3.0]);
        assert_eq!(s.row(1), &[8.0, 9.0]);

        assert!(TestSeries::from_array(&data, Some(3)).is_err());
    }
}

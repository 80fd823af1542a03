//! Down-sampling of the merged timeline to a uniform time interval.

use tracing::debug;

use crate::core::sequence::SegmentSelection;
use crate::util::{Error, Result};

/// A slot is only filled when the nearest frame is closer than this, in time
/// units.
pub const SLOT_TOLERANCE: f64 = 1.0;

/// Indices of the frames closest to the multiples of `every` spanning the
/// observed time range. `every` must be positive and finite.
///
/// For each slot the globally nearest time wins (first occurrence on ties);
/// slots with no frame within [`SLOT_TOLERANCE`] stay empty, and a frame is
/// never selected for more than one slot.
pub fn nearest_indices(times: &[f64], every: f64) -> Vec<usize> {
    if times.is_empty() {
        return Vec::new();
    }
    let t_min = times.iter().copied().fold(f64::INFINITY, f64::min);
    let t_max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lo = (t_min / every).floor() as i64;
    let hi = (t_max / every).floor() as i64;

    let mut picked = Vec::new();
    let mut last: Option<usize> = None;
    for k in lo..=hi {
        let target = k as f64 * every;
        let mut best = f64::INFINITY;
        let mut j = 0usize;
        for (i, &t) in times.iter().enumerate() {
            let d = (t - target).abs();
            if d < best {
                best = d;
                j = i;
            }
        }
        if best < SLOT_TOLERANCE && last != Some(j) {
            picked.push(j);
            last = Some(j);
        }
    }
    picked
}

/// Filter the selection records down to frames on a uniform `every` grid,
/// re-partitioned per segment in original order.
pub fn resample(selections: &[SegmentSelection], every: f64) -> Result<Vec<SegmentSelection>> {
    if !(every > 0.0) || !every.is_finite() {
        return Err(Error::invalid(format!(
            "resampling interval must be positive, got {every}"
        )));
    }
    let flat: Vec<(usize, usize, f64)> = selections
        .iter()
        .enumerate()
        .flat_map(|(s, sel)| {
            sel.frames
                .iter()
                .zip(&sel.times)
                .map(move |(&frame, &time)| (s, frame, time))
        })
        .collect();
    let times: Vec<f64> = flat.iter().map(|&(_, _, t)| t).collect();

    let picked = nearest_indices(&times, every);
    if picked.is_empty() {
        return Err(Error::EmptySelection);
    }
    debug!("{} of {} frames retained after filtering", picked.len(), flat.len());

    let mut out: Vec<SegmentSelection> = Vec::new();
    let mut cur: Option<usize> = None;
    for &i in &picked {
        let (s, frame, time) = flat[i];
        if cur != Some(s) {
            let src = &selections[s];
            out.push(SegmentSelection {
                path: src.path.clone(),
                trusted: src.trusted,
                frames: Vec::new(),
                times: Vec::new(),
            });
            cur = Some(s);
        }
        let rec = out.last_mut().unwrap_or_else(|| unreachable!());
        rec.frames.push(frame);
        rec.times.push(time);
    }
    Ok(out)
}

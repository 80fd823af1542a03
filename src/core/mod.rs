//! Core joining machinery: capability traits, typed arrays, and the
//! stitching pipeline (timeline builder, sequencer, resampler, copier).

pub mod array;
pub mod copier;
pub mod header;
pub mod resample;
pub mod sequence;
pub mod timeline;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use array::{ArrayData, ArrayValues, AttrValue};
pub use copier::{copy_frames, CopyParams, ATOM_DIM, FRAME_DIM};
pub use header::{Dimension, VarSchema};
pub use resample::{nearest_indices, resample, SLOT_TOLERANCE};
pub use sequence::{sequence_segments, Segment, SegmentSelection, StitchParams};
pub use timeline::{find_overlap, fix_time, Overlap, TestSeries, Tolerance};
pub use traits::{DatasetReader, DatasetWriter};

//! # ncjoin
//!
//! Joins consecutive AMBER-style NetCDF trajectory segments into a single
//! file with a continuous, corrected timeline.
//!
//! Restarted simulations leave behind per-segment trajectory files whose
//! ends overlap and whose time axes reset or drift. The joiner locates the
//! overlap between each adjacent pair by comparing a test variable within a
//! tolerance, drops the duplicated frames, rebuilds a monotone timeline,
//! optionally resamples it onto a uniform interval, and copies the surviving
//! frames over while restoring canonical particle order.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (NetCDF data types, errors)
//! - [`netcdf`] - Classic NetCDF (CDF-1 / CDF-2) reader and writer
//! - [`core`] - Dataset traits and the stitching, resampling, and copying
//!   algorithms
//! - [`join`] - End-to-end pipeline driven by a single configuration
//!
//! ## Example
//!
//! ```ignore
//! use ncjoin::join::{join, JoinConfig};
//! use ncjoin::core::Segment;
//!
//! let config = JoinConfig {
//!     segments: vec![Segment::new("traj-1.nc"), Segment::new("traj-2.nc")],
//!     ..JoinConfig::default()
//! };
//! let summary = join(&config)?;
//! println!("wrote {} frames", summary.frames_written);
//! ```

pub mod util;
pub mod netcdf;
pub mod core;
pub mod join;

// Re-export commonly used types
pub use util::{Error, NcType, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        ArrayData, ArrayValues, AttrValue, DatasetReader, DatasetWriter, Dimension, Segment,
        Tolerance, VarSchema,
    };
    pub use crate::join::{join, JoinConfig, JoinSummary};
    pub use crate::netcdf::{NcReader, NcVersion, NcWriter};
    pub use crate::util::{Error, NcType, Result};
}

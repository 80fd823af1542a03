//! Basic types shared across the crate: element types and errors.

pub mod data_type;
pub mod error;

pub use data_type::NcType;
pub use error::{Error, Result};

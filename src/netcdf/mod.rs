//! Classic NetCDF (CDF-1 / CDF-2) container support.
//!
//! The reader memory-maps the file and decodes the big-endian header and
//! data sections lazily; the writer builds the header in define mode and
//! streams records afterwards. Only the classic format is handled, which
//! is what AMBER-style trajectory files use.

pub mod format;
pub mod reader;
pub mod writer;

pub use format::NcVersion;
pub use reader::NcReader;
pub use writer::NcWriter;

//! Error types for the ncjoin library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ncjoin operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Output file already exists (the output is never overwritten)
    #[error("Output file exists already: {}", .0.display())]
    OutputExists(PathBuf),

    /// Invalid magic bytes at start of file
    #[error("Invalid NetCDF file: expected CDF magic bytes")]
    InvalidMagic,

    /// Unsupported NetCDF format version byte
    #[error("Unsupported NetCDF version: {0} (only classic formats 1 and 2 are supported)")]
    UnsupportedVersion(u8),

    /// File is truncated or corrupted
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Variable not found by name
    #[error("Variable not found: {0}")]
    VariableNotFound(String),

    /// Dimension not found by name
    #[error("Dimension not found: {0}")]
    DimensionNotFound(String),

    /// Frame index out of bounds
    #[error("Frame index {index} out of bounds (count: {count})")]
    FrameOutOfBounds { index: usize, count: usize },

    /// Schema change attempted after the header was committed
    #[error("Define mode is over: {0}")]
    DefineMode(String),

    /// No tolerance-matching overlap frame found between adjacent segments
    #[error(
        "'{}' and '{}' are not consecutive. Minimum residual found was {:e}, \
         maximum residual {:e}. It may help to increase the test tolerance.",
        .file1.display(), .file2.display(), .min_residual, .max_residual
    )]
    NotConsecutive {
        file1: PathBuf,
        file2: PathBuf,
        min_residual: f64,
        max_residual: f64,
    },

    /// Resampling left no frames to write
    #[error("No frames left after filtering")]
    EmptySelection,

    /// Particle identifier variable has the wrong shape
    #[error("Index variable '{0}' must have dimensions (frame, atom)")]
    MalformedIndexVariable(String),

    /// A per-file variable differs between segments that should share it
    #[error(
        "Data for per-file variable '{}' differs in '{}' and '{}'",
        .variable, .file1.display(), .file2.display()
    )]
    PerFileVarMismatch {
        variable: String,
        file1: PathBuf,
        file2: PathBuf,
    },

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }
}

/// Result type alias for ncjoin operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidMagic;
        assert!(e.to_string().contains("magic"));

        let e = Error::FrameOutOfBounds { index: 5, count: 3 };
        assert!(e.to_string().contains("5"));
        assert!(e.to_string().contains("3"));
    }

    #[test]
    fn test_not_consecutive_reports_residuals() {
        let e = Error::NotConsecutive {
            file1: PathBuf::from("a.nc"),
            file2: PathBuf::from("b.nc"),
            min_residual: 0.5,
            max_residual: 2.0,
        };
        let msg = e.to_string();
        assert!(msg.contains("a.nc"));
        assert!(msg.contains("b.nc"));
        assert!(msg.contains("tolerance"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}

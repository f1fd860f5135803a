//! Error types for mesh loading.

use thiserror::Error;

/// Errors that can occur while loading a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    /// Malformed ASCII STL.
    #[error("{file}, line {line}: expected {expected}")]
    Parse {
        /// File the error occurred in.
        file: String,
        /// 1-based line number.
        line: usize,
        /// The token or value that was expected.
        expected: String,
    },

    /// Binary STL ended mid-record.
    #[error("{file}: truncated binary STL at byte {offset}")]
    Truncated {
        /// File the error occurred in.
        file: String,
        /// Byte offset of the incomplete record.
        offset: usize,
    },

    /// The file parsed but contained no facets.
    #[error("mesh contains no facets")]
    EmptyMesh,

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for mesh loading.
pub type Result<T> = std::result::Result<T, MeshError>;

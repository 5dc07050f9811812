//! Error taxonomy shared by the whole pipeline.
//!
//! Missing optional fields during reading are downgraded to warnings at the
//! call site; everything that reaches this enum propagates to the caller
//! unmodified.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed variable or bin definitions.
    #[error("config error: {0}")]
    Config(String),

    /// Zero files resolved for a sample, or a referenced column is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Row-count mismatch after flattening. Internal invariant violation.
    #[error("schema error: {0}")]
    Schema(String),

    /// Invalid combination of plot inputs.
    #[error("render error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

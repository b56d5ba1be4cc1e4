//! Load failures.
//!
//! Loading is the only stage of a session that is allowed to fail. Once a
//! [`RawTable`](crate::raw::RawTable) exists, detection and normalization
//! always produce a usable result, so everything downstream reports problems
//! through `anyhow` only for configuration mistakes.

use std::path::PathBuf;

use thiserror::Error;

/// Why a raw source could not be turned into a table.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Opening input {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Reading CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row {row} is not valid {encoding} text")]
    Decode { row: usize, encoding: &'static str },

    #[error("Row {row} has {found} field(s) but the header declares {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Input contains no columns")]
    Empty,
}

pub type LoadResult<T> = std::result::Result<T, LoadError>;

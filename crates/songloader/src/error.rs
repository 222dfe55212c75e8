//! Error types for the song loader
//!
//! Every per-folder failure is contained at the loader boundary: these errors
//! are logged by the scanner and the folder is skipped.

use std::path::PathBuf;
use thiserror::Error;

/// Why a folder's descriptor could not be turned into a [`Descriptor`](crate::descriptor::Descriptor).
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("no info.dat or Info.dat in {0}")]
    Missing(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to deserialize {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum HashError {
    #[error("failed to read {path} while hashing: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("audio file {0} does not exist")]
    NotFound(PathBuf),

    #[error("failed to read audio properties of {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
}

/// Failure to produce an item for one folder.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("not a song folder: {0}")]
    NotAnItem(PathBuf),

    #[error("hashing failed: {0}")]
    Hash(#[from] HashError),
}

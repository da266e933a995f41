//! Error types for dep-graph.

use std::path::PathBuf;

use registry_client::RegistryError;
use thiserror::Error;

/// Errors that abort the expansion of a node's branch.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The root specifier could not be parsed
    #[error("could not resolve specifier '{0}'")]
    Unresolvable(String),

    /// Metadata for a node could not be fetched (anything but a 404)
    #[error("failed to fetch metadata for {full_name}: {source}")]
    Metadata {
        full_name: String,
        #[source]
        source: RegistryError,
    },
}

/// Errors of a single archive download.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The node's metadata had no `dist.tarball`
    #[error("{0} has no tarball to download")]
    NoTarball(String),

    /// The tarball URL has no final path segment to name the file after
    #[error("cannot derive a file name for {full_name} from '{url}'")]
    InvalidTarballUrl { full_name: String, url: String },

    /// Every download attempt failed
    #[error("failed to download {full_name}: {source}")]
    DownloadFailure {
        full_name: String,
        #[source]
        source: RegistryError,
    },

    /// The archive does not match the published integrity digest
    #[error("integrity mismatch for {full_name}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        full_name: String,
        expected: String,
        actual: String,
    },

    /// The archive could not be written
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

//! Error types for registry-client.

use thiserror::Error;

/// Errors that can occur while talking to the registry.
///
/// `Clone` so a single failed fetch can be handed to every caller that was
/// waiting on the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The registry answered 404, or a cached document has no such version
    #[error("{name}@{} not found in registry", .version.as_deref().unwrap_or("*"))]
    NotFound {
        name: String,
        version: Option<String>,
    },

    /// Every attempt failed
    #[error("giving up on {url} after {attempts} failed attempts: {last}")]
    TooManyFailures {
        url: String,
        attempts: u32,
        /// Reason of the final failed attempt
        last: String,
    },

    /// The HTTP client could not be built
    #[error("failed to build registry client: {0}")]
    Client(String),
}

impl RegistryError {
    pub fn not_found(name: &str, version: Option<&str>) -> Self {
        Self::NotFound {
            name: name.to_string(),
            version: version.map(str::to_string),
        }
    }

    /// Returns true for the non-fatal "unknown package or version" signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

//! Error types for spec-parser.

use thiserror::Error;

/// Errors produced while parsing a specifier or a full name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecParseError {
    /// The input was empty or whitespace only
    #[error("empty package specifier")]
    Empty,

    /// The package name part is not a valid registry name
    #[error("invalid package name '{0}'")]
    InvalidName(String),

    /// A scoped name without the `@scope/name` shape
    #[error("invalid scoped package name '{0}'")]
    InvalidScope(String),

    /// `name@` with nothing after the separator
    #[error("missing version after '@' in '{0}'")]
    EmptyVersion(String),

    /// A full name must carry an explicit version
    #[error("'{0}' is not a name@version full name")]
    MissingVersion(String),
}

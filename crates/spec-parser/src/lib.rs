//! # spec-parser
//!
//! Parse the package specifiers handed to the resolver.
//!
//! ## Grammar
//!
//! | Input | Name | Range |
//! |-------|------|-------|
//! | `left-pad` | `left-pad` | `latest` |
//! | `left-pad@1.3.0` | `left-pad` | `1.3.0` |
//! | `left-pad@^1.0.0` | `left-pad` | `^1.0.0` |
//! | `@babel/core` | `@babel/core` | `latest` |
//! | `@babel/core@7.24.0` | `@babel/core` | `7.24.0` |
//!
//! ## Example
//!
//! ```
//! use spec_parser::{parse, FullName};
//!
//! let spec = parse("@babel/core@^7.0.0").unwrap();
//! assert_eq!(spec.name, "@babel/core");
//! assert_eq!(spec.range, "^7.0.0");
//!
//! let full: FullName = "left-pad@1.3.0".parse().unwrap();
//! assert_eq!(full.to_string(), "left-pad@1.3.0");
//! ```

mod error;
mod specifier;

pub use error::SpecParseError;
pub use specifier::{parse, FullName, Specifier, DEFAULT_RANGE};

//! # registry-client
//!
//! Fetch package metadata and archives from an npm-style registry.
//!
//! ## Overview
//!
//! - **RegistryClient**: `GET <registry>/<name>/<version?>` with bounded
//!   immediate retry. Unscoped responses (no version) are cached per name
//!   for the lifetime of the client and shared between concurrent callers.
//! - **PackageMetadata**: the subset of the registry document the resolver
//!   reads (`dependencies`, `dist`, `versions`, `dist-tags`).
//! - **RetryObserver**: hook receiving every failed attempt, exhaustion and
//!   success, so callers can count attempts the retry loop would otherwise
//!   swallow.
//!
//! ## Example
//!
//! ```ignore
//! use registry_client::RegistryClient;
//!
//! let client = RegistryClient::new("https://registry.npmjs.org")?;
//!
//! // Unscoped: full document, cached for the rest of the run
//! let all = client.get_metadata("left-pad", None).await?;
//!
//! // Scoped: answered from the cached document when present
//! let one = client.get_metadata("left-pad", Some("1.3.0")).await?;
//! println!("{:?}", one.dist.as_ref().and_then(|d| d.tarball.as_deref()));
//! ```
//!
//! ## Failure model
//!
//! | Response | Outcome |
//! |----------|---------|
//! | 404 | `RegistryError::NotFound`, no retry |
//! | other non-2xx, transport error, unparsable body | failed attempt, retried at once |
//! | `max_tries` failed attempts | `RegistryError::TooManyFailures` |

mod client;
mod error;
mod metadata;
mod retry;

pub use client::{RegistryClient, DEFAULT_REGISTRY};
pub use error::RegistryError;
pub use metadata::{Dependencies, Dist, PackageMetadata};
pub use retry::{AttemptCounter, RetryObserver, TracingObserver, MAX_TRIES};

//! # dep-graph
//!
//! Resolve the transitive dependency graph of a registry package and fetch
//! the archive of every resolved version.
//!
//! ## Overview
//!
//! - **ResolutionContext**: one resolution run. Owns the registry client,
//!   the version resolver and the node cache; nothing is process-global, so
//!   independent runs (and tests) never share state.
//! - **ResolutionCache**: arena of [`PackageNode`]s keyed by full name
//!   (`name@version`). Edges are stored as full-name keys, never as owning
//!   references, so the graph may share nodes freely.
//! - **VersionResolver**: turns `^1.2.0`, `*`, `1.x || >=3`, ... into one
//!   concrete version, falling back to `latest`.
//! - **GraphResolver**: expands nodes level by level, dropping edges that
//!   would close a cycle through the expanding node's ancestor chain.
//! - **ArchiveDownloader**: writes each node's tarball into a flat directory.
//!
//! ## Example
//!
//! ```ignore
//! use dep_graph::ResolutionContext;
//! use registry_client::RegistryClient;
//!
//! let ctx = ResolutionContext::new(RegistryClient::new("https://registry.npmjs.org")?);
//! let root = ctx.from_specifier("express@^4.18.0").await.expect("valid specifier");
//! ctx.graph().resolve(root.clone()).await?;
//!
//! for node in ctx.cache().dependencies_of(&root) {
//!     println!("{}", node.full_name());
//! }
//! ```

mod cache;
mod context;
mod download;
mod error;
mod node;
mod resolver;
mod snapshot;
mod version;

#[cfg(test)]
mod testing;

pub use cache::ResolutionCache;
pub use context::{FanOut, ResolutionContext};
pub use download::{ArchiveDownloader, DEFAULT_DOWNLOAD_CONCURRENCY};
pub use error::{DownloadError, GraphError};
pub use node::PackageNode;
pub use resolver::GraphResolver;
pub use snapshot::{GraphSnapshot, SnapshotPackage};
pub use version::{VersionResolver, LATEST};

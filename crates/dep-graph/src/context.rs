//! ResolutionContext: everything one resolution run shares.

use std::sync::Arc;

use registry_client::RegistryClient;
use tracing::{debug, warn};

use crate::cache::ResolutionCache;
use crate::error::GraphError;
use crate::node::PackageNode;
use crate::resolver::GraphResolver;
use crate::snapshot::GraphSnapshot;
use crate::version::VersionResolver;

/// How the children of one node are resolved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FanOut {
    /// One dependency to completion before the next
    Sequential,
    /// All dependencies of a node at once, joined before the node completes
    #[default]
    Concurrent,
}

/// State of one resolution run, threaded through every operation.
#[derive(Debug)]
pub struct ResolutionContext {
    registry: RegistryClient,
    versions: VersionResolver,
    cache: ResolutionCache,
    fan_out: FanOut,
}

impl ResolutionContext {
    pub fn new(registry: RegistryClient) -> Self {
        Self {
            versions: VersionResolver::new(registry.clone()),
            registry,
            cache: ResolutionCache::new(),
            fan_out: FanOut::default(),
        }
    }

    pub fn with_fan_out(mut self, fan_out: FanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    pub fn versions(&self) -> &VersionResolver {
        &self.versions
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn fan_out(&self) -> FanOut {
        self.fan_out
    }

    pub fn graph(&self) -> GraphResolver<'_> {
        GraphResolver::new(self)
    }

    /// The node for `name` at the version `range` resolves to.
    pub async fn node_for(&self, name: &str, range: &str) -> Arc<PackageNode> {
        let version = self.versions.resolve_to_concrete_version(name, range).await;
        self.cache.get_or_create(name, &version)
    }

    /// Parse `spec` and return its node, or `None` if it does not parse.
    pub async fn from_specifier(&self, spec: &str) -> Option<Arc<PackageNode>> {
        let parsed = match spec_parser::parse(spec) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("could not parse specifier '{}': {}", spec, e);
                return None;
            }
        };
        debug!("specifier '{}' -> {}@{}", spec, parsed.name, parsed.range);
        Some(self.node_for(&parsed.name, &parsed.range).await)
    }

    /// Seed the cache from `name@version` strings, e.g. a previous result.
    pub fn fill_cache_from_full_names<I, S>(&self, full_names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cache.fill_from_full_names(full_names)
    }

    /// Parse `spec` and resolve its whole graph.
    ///
    /// On failure the partially built graph stays in the cache; nodes that
    /// failed carry their error flag.
    pub async fn resolve_specifier(&self, spec: &str) -> Result<Arc<PackageNode>, GraphError> {
        let root = self
            .from_specifier(spec)
            .await
            .ok_or_else(|| GraphError::Unresolvable(spec.to_string()))?;
        self.graph().resolve(Arc::clone(&root)).await?;
        Ok(root)
    }

    pub fn snapshot(&self, root: &PackageNode) -> GraphSnapshot {
        GraphSnapshot::collect(&self.cache, root)
    }
}

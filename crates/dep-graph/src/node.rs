//! PackageNode: one concrete `name@version` in the graph.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use registry_client::Dist;

/// One concrete package instance.
///
/// Nodes are created by [`ResolutionCache`](crate::ResolutionCache) and
/// mutated in place while the graph is built. `dependencies` and
/// `dependents` hold full-name keys into the cache; `dependents` records
/// "who asked for me" and only serves the ancestor walk used for cycle
/// detection.
#[derive(Debug)]
pub struct PackageNode {
    name: String,
    version: String,
    full_name: String,
    dependencies: RwLock<Vec<String>>,
    dependents: RwLock<Vec<String>>,
    dist: RwLock<Dist>,
    resolved: AtomicBool,
    loading: AtomicBool,
    error: AtomicBool,
    /// Set by the first branch that takes over the recursive expansion
    claimed: AtomicBool,
}

impl PackageNode {
    pub(crate) fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            full_name: full_name(name, version),
            dependencies: RwLock::new(Vec::new()),
            dependents: RwLock::new(Vec::new()),
            dist: RwLock::new(Dist::default()),
            resolved: AtomicBool::new(false),
            loading: AtomicBool::new(false),
            error: AtomicBool::new(false),
            claimed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `name@version`, the cache key of this node.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Full names of the children, in manifest order.
    pub fn dependency_keys(&self) -> Vec<String> {
        self.dependencies.read().clone()
    }

    /// Full names of the nodes that depend on this one.
    pub fn dependent_keys(&self) -> Vec<String> {
        self.dependents.read().clone()
    }

    pub fn is_root(&self) -> bool {
        self.dependents.read().is_empty()
    }

    pub fn tarball_url(&self) -> Option<String> {
        self.dist.read().tarball.clone()
    }

    pub fn integrity(&self) -> Option<String> {
        self.dist.read().integrity.clone()
    }

    pub fn shasum(&self) -> Option<String> {
        self.dist.read().shasum.clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::SeqCst)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn has_error(&self) -> bool {
        self.error.load(Ordering::SeqCst)
    }

    pub(crate) fn set_resolved(&self, resolved: bool) {
        self.resolved.store(resolved, Ordering::SeqCst);
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::SeqCst);
    }

    pub(crate) fn set_error(&self, error: bool) {
        self.error.store(error, Ordering::SeqCst);
    }

    /// Returns true for exactly one caller.
    pub(crate) fn claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn set_dist(&self, dist: Dist) {
        *self.dist.write() = dist;
    }

    pub(crate) fn set_dependencies(&self, keys: Vec<String>) {
        *self.dependencies.write() = keys;
    }

    /// Record `parent` as a dependent. Returns false if it already was one.
    pub(crate) fn add_dependent(&self, parent: &str) -> bool {
        let mut dependents = self.dependents.write();
        if dependents.iter().any(|d| d == parent) {
            return false;
        }
        dependents.push(parent.to_string());
        true
    }
}

impl PartialEq for PackageNode {
    fn eq(&self, other: &Self) -> bool {
        self.full_name == other.full_name
    }
}

impl Eq for PackageNode {}

pub(crate) fn full_name(name: &str, version: &str) -> String {
    format!("{}@{}", name, version)
}

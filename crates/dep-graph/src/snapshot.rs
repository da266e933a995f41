//! Serializable view of a resolved graph.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use crate::cache::ResolutionCache;
use crate::node::PackageNode;

/// The graph reachable from one root, in breadth-first order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    pub root: String,
    pub packages: Vec<SnapshotPackage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPackage {
    pub full_name: String,
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tarball: Option<String>,
    pub dependencies: Vec<String>,
    pub resolved: bool,
    pub error: bool,
}

impl SnapshotPackage {
    fn from_node(node: &PackageNode) -> Self {
        Self {
            full_name: node.full_name().to_string(),
            name: node.name().to_string(),
            version: node.version().to_string(),
            tarball: node.tarball_url(),
            dependencies: node.dependency_keys(),
            resolved: node.is_resolved(),
            error: node.has_error(),
        }
    }
}

impl GraphSnapshot {
    /// Walk dependency edges from `root`. Each package appears once.
    pub fn collect(cache: &ResolutionCache, root: &PackageNode) -> Self {
        let mut seen: HashSet<String> = HashSet::from([root.full_name().to_string()]);
        let mut queue: VecDeque<String> = VecDeque::from([root.full_name().to_string()]);
        let mut packages = Vec::new();

        while let Some(key) = queue.pop_front() {
            let package = match cache.get(&key) {
                Some(node) => SnapshotPackage::from_node(&node),
                // the root may come from a different cache
                None if key == root.full_name() => SnapshotPackage::from_node(root),
                None => continue,
            };
            for dep in &package.dependencies {
                if seen.insert(dep.clone()) {
                    queue.push_back(dep.clone());
                }
            }
            packages.push(package);
        }

        Self {
            root: root.full_name().to_string(),
            packages,
        }
    }

    /// Packages whose expansion failed.
    pub fn errored(&self) -> impl Iterator<Item = &SnapshotPackage> {
        self.packages.iter().filter(|p| p.error)
    }
}

//! ResolutionCache: one node per full name for the lifetime of a run.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use spec_parser::FullName;
use tracing::{trace, warn};

use crate::node::{full_name, PackageNode};
use crate::version::exact_version;

/// Arena of package nodes keyed by `name@version`.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    nodes: DashMap<String, Arc<PackageNode>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the node for `name@version`, creating it on first use.
    ///
    /// Concurrent callers for the same key always get the same node: the
    /// insert happens under the shard lock of the key.
    pub fn get_or_create(&self, name: &str, version: &str) -> Arc<PackageNode> {
        let key = full_name(name, version);
        if let Some(node) = self.nodes.get(&key) {
            return Arc::clone(node.value());
        }
        let entry = self.nodes.entry(key).or_insert_with(|| {
            trace!("creating node {}@{}", name, version);
            Arc::new(PackageNode::new(name, version))
        });
        Arc::clone(entry.value())
    }

    pub fn get(&self, full_name: &str) -> Option<Arc<PackageNode>> {
        self.nodes.get(full_name).map(|n| Arc::clone(n.value()))
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.nodes.contains_key(full_name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes, sorted by full name.
    pub fn nodes(&self) -> Vec<Arc<PackageNode>> {
        let mut nodes: Vec<Arc<PackageNode>> =
            self.nodes.iter().map(|n| Arc::clone(n.value())).collect();
        nodes.sort_by(|a, b| a.full_name().cmp(b.full_name()));
        nodes
    }

    /// Nodes whose expansion failed.
    pub fn errored(&self) -> Vec<Arc<PackageNode>> {
        self.nodes()
            .into_iter()
            .filter(|n| n.has_error())
            .collect()
    }

    pub fn dependencies_of(&self, node: &PackageNode) -> Vec<Arc<PackageNode>> {
        self.lookup(node.dependency_keys())
    }

    pub fn dependents_of(&self, node: &PackageNode) -> Vec<Arc<PackageNode>> {
        self.lookup(node.dependent_keys())
    }

    /// Record `parent` as a dependent of `child`; no-op if already recorded.
    pub fn add_dependent(&self, child: &PackageNode, parent: &PackageNode) -> bool {
        child.add_dependent(parent.full_name())
    }

    /// True if `candidate` is `node` itself or any node reachable from `node`
    /// through its dependents, i.e. one of its ancestors in some branch.
    pub fn is_ancestor_equal(&self, node: &PackageNode, candidate: &PackageNode) -> bool {
        let target = candidate.full_name();
        if node.full_name() == target {
            return true;
        }

        let mut visited: HashSet<String> = HashSet::from([node.full_name().to_string()]);
        let mut stack = node.dependent_keys();
        while let Some(key) = stack.pop() {
            if key == target {
                return true;
            }
            if !visited.insert(key.clone()) {
                continue;
            }
            if let Some(parent) = self.get(&key) {
                stack.extend(parent.dependent_keys());
            }
        }
        false
    }

    /// Pre-insert nodes from `name@version` strings and mark them resolved,
    /// without touching the network. Versions are normalized (`v1.2.3` is
    /// `1.2.3`); entries that do not parse or carry a range are skipped.
    /// Returns the number of nodes seeded.
    pub fn fill_from_full_names<I, S>(&self, full_names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seeded = 0;
        for raw in full_names {
            let raw = raw.as_ref();
            let full = match raw.parse::<FullName>() {
                Ok(full) => full,
                Err(e) => {
                    warn!("skipping seed entry '{}': {}", raw, e);
                    continue;
                }
            };
            let Some(version) = exact_version(&full.version) else {
                warn!("skipping seed entry '{}': not a concrete version", raw);
                continue;
            };
            let node = self.get_or_create(&full.name, &version);
            node.set_resolved(true);
            seeded += 1;
        }
        trace!("seeded {} nodes", seeded);
        seeded
    }

    fn lookup(&self, keys: Vec<String>) -> Vec<Arc<PackageNode>> {
        keys.iter().filter_map(|k| self.get(k)).collect()
    }
}

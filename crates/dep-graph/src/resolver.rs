//! GraphResolver: recursive, cycle-breaking expansion of package nodes.

use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tracing::{debug, error, trace};

use crate::context::{FanOut, ResolutionContext};
use crate::error::GraphError;
use crate::node::PackageNode;

/// Expands nodes of a [`ResolutionContext`].
#[derive(Debug, Clone, Copy)]
pub struct GraphResolver<'a> {
    ctx: &'a ResolutionContext,
}

impl<'a> GraphResolver<'a> {
    pub fn new(ctx: &'a ResolutionContext) -> Self {
        Self { ctx }
    }

    /// Expand one level: fetch the node's metadata, pin each dependency to a
    /// node and attach the edges that do not lead back into the node's
    /// ancestor chain.
    ///
    /// A 404 is not an error: the node simply has no known dependencies.
    /// Any other metadata failure flags the node and is returned.
    pub async fn expand_dependencies(
        &self,
        node: &Arc<PackageNode>,
    ) -> Result<Vec<Arc<PackageNode>>, GraphError> {
        node.set_loading(true);
        let res = self.expand(node).await;
        node.set_loading(false);
        res
    }

    async fn expand(&self, node: &Arc<PackageNode>) -> Result<Vec<Arc<PackageNode>>, GraphError> {
        let registry = self.ctx.registry();
        let meta = match registry.get_metadata(node.name(), Some(node.version())).await {
            Ok(meta) => meta,
            Err(e) if e.is_not_found() => {
                debug!("{} not in registry, treating as leaf", node.full_name());
                node.set_dependencies(Vec::new());
                return Ok(Vec::new());
            }
            Err(e) => {
                error!("failed to expand {}: {}", node.full_name(), e);
                node.set_error(true);
                return Err(GraphError::Metadata {
                    full_name: node.full_name().to_string(),
                    source: e,
                });
            }
        };

        if let Some(dist) = &meta.dist {
            node.set_dist(dist.clone());
        }

        let Some(dependencies) = &meta.dependencies else {
            trace!("{} has no dependency table", node.full_name());
            node.set_dependencies(Vec::new());
            return Ok(Vec::new());
        };

        let candidates = match self.ctx.fan_out() {
            FanOut::Sequential => {
                let mut candidates = Vec::with_capacity(dependencies.len());
                for (name, range) in dependencies.iter() {
                    candidates.push(self.ctx.node_for(name, range).await);
                }
                candidates
            }
            FanOut::Concurrent => {
                join_all(
                    dependencies
                        .iter()
                        .map(|(name, range)| self.ctx.node_for(name, range)),
                )
                .await
            }
        };

        let cache = self.ctx.cache();
        let mut children = Vec::with_capacity(candidates.len());
        for child in candidates {
            if cache.is_ancestor_equal(node, &child) {
                debug!(
                    "dropping cyclic edge {} -> {}",
                    node.full_name(),
                    child.full_name()
                );
                continue;
            }
            cache.add_dependent(&child, node);
            children.push(child);
        }

        node.set_dependencies(
            children
                .iter()
                .map(|c| c.full_name().to_string())
                .collect(),
        );
        trace!(
            "{} expanded to {} dependencies",
            node.full_name(),
            children.len()
        );
        Ok(children)
    }

    /// Expand `node` and, recursively, everything below it.
    ///
    /// Nodes already resolved (expanded before, or seeded) are not expanded
    /// again, and a node currently being expanded by another branch is left
    /// to that branch. The first error of a child branch is returned after
    /// its siblings have been joined; whatever was built stays in the cache.
    pub fn resolve(&self, node: Arc<PackageNode>) -> BoxFuture<'a, Result<(), GraphError>> {
        let this = *self;
        async move {
            if node.is_resolved() || !node.claim() {
                trace!("skipping {}, already handled", node.full_name());
                return Ok(());
            }

            let children = this.expand_dependencies(&node).await?;

            match this.ctx.fan_out() {
                FanOut::Sequential => {
                    for child in children {
                        this.resolve(child).await?;
                    }
                }
                FanOut::Concurrent => {
                    let results = join_all(children.into_iter().map(|c| this.resolve(c))).await;
                    results.into_iter().collect::<Result<Vec<()>, _>>()?;
                }
            }

            node.set_resolved(true);
            Ok(())
        }
        .boxed()
    }
}

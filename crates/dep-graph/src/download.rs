//! ArchiveDownloader: write each resolved node's tarball to disk.

use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::stream::{self, StreamExt};
use registry_client::RegistryClient;
use sha2::{Digest, Sha256, Sha512};
use tracing::{debug, info, warn};

use crate::cache::ResolutionCache;
use crate::error::DownloadError;
use crate::node::PackageNode;

pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 8;

/// Downloads archives into one flat directory, named after the last path
/// segment of each tarball URL.
#[derive(Debug, Clone)]
pub struct ArchiveDownloader {
    registry: RegistryClient,
    dest_dir: PathBuf,
    verify_integrity: bool,
    concurrency: usize,
}

impl ArchiveDownloader {
    pub fn new(registry: RegistryClient, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            dest_dir: dest_dir.into(),
            verify_integrity: true,
            concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
        }
    }

    /// Check archives against the published SRI digest before writing them.
    pub fn with_verify_integrity(mut self, verify: bool) -> Self {
        self.verify_integrity = verify;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Download the archive of `node` and return the written path.
    pub async fn download(&self, node: &PackageNode) -> Result<PathBuf, DownloadError> {
        let Some(url) = node.tarball_url() else {
            return Err(DownloadError::NoTarball(node.full_name().to_string()));
        };
        let Some(file_name) = archive_file_name(&url) else {
            return Err(DownloadError::InvalidTarballUrl {
                full_name: node.full_name().to_string(),
                url,
            });
        };

        let bytes = self
            .registry
            .fetch_archive(&url)
            .await
            .map_err(|source| DownloadError::DownloadFailure {
                full_name: node.full_name().to_string(),
                source,
            })?;

        if self.verify_integrity {
            match node.integrity() {
                Some(integrity) => check_integrity(node.full_name(), &integrity, &bytes)?,
                None => debug!("{} publishes no integrity digest", node.full_name()),
            }
        }

        let path = self.dest_dir.join(file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| DownloadError::Io {
                path: path.clone(),
                source,
            })?;

        info!("downloaded {} to {}", node.full_name(), path.display());
        Ok(path)
    }

    /// Download every node of `cache` without an error flag. Results are
    /// sorted by full name.
    ///
    /// Nodes that never saw their metadata (seeded ones) get their `dist`
    /// looked up first; a node still without tarball yields `NoTarball`.
    pub async fn download_all(
        &self,
        cache: &ResolutionCache,
    ) -> Vec<(Arc<PackageNode>, Result<PathBuf, DownloadError>)> {
        let nodes: Vec<Arc<PackageNode>> = cache
            .nodes()
            .into_iter()
            .filter(|n| {
                if n.has_error() {
                    warn!("skipping download of {}, it failed to resolve", n.full_name());
                    return false;
                }
                true
            })
            .collect();

        let mut results: Vec<_> = stream::iter(nodes)
            .map(|node| async move {
                if node.tarball_url().is_none() {
                    self.fill_dist(&node).await;
                }
                let res = self.download(&node).await;
                (node, res)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        results.sort_by(|(a, _), (b, _)| a.full_name().cmp(b.full_name()));
        results
    }

    async fn fill_dist(&self, node: &PackageNode) {
        match self
            .registry
            .get_metadata(node.name(), Some(node.version()))
            .await
        {
            Ok(meta) => {
                if let Some(dist) = &meta.dist {
                    node.set_dist(dist.clone());
                }
            }
            Err(e) => debug!("no dist for {}: {}", node.full_name(), e),
        }
    }
}

/// Final path segment of a tarball URL, e.g. `left-pad-1.3.0.tgz`.
pub(crate) fn archive_file_name(url: &str) -> Option<String> {
    let url = url::Url::parse(url).ok()?;
    let last = url.path_segments()?.next_back()?;
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.to_string())
}

/// Verify `bytes` against the first supported hash of an SRI string.
/// Unsupported algorithms (e.g. a bare `sha1-`) are skipped.
fn check_integrity(full_name: &str, integrity: &str, bytes: &[u8]) -> Result<(), DownloadError> {
    for entry in integrity.split_whitespace() {
        let Some((algorithm, expected)) = entry.split_once('-') else {
            continue;
        };
        let actual = match algorithm {
            "sha512" => STANDARD.encode(Sha512::digest(bytes)),
            "sha256" => STANDARD.encode(Sha256::digest(bytes)),
            _ => continue,
        };
        if actual != expected {
            return Err(DownloadError::IntegrityMismatch {
                full_name: full_name.to_string(),
                expected: entry.to_string(),
                actual: format!("{}-{}", algorithm, actual),
            });
        }
        debug!("{} matches {}", full_name, algorithm);
        return Ok(());
    }
    debug!("no supported digest for {} in '{}'", full_name, integrity);
    Ok(())
}

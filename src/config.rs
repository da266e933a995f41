use std::path::PathBuf;

use dep_graph::{FanOut, DEFAULT_DOWNLOAD_CONCURRENCY};
use registry_client::{DEFAULT_REGISTRY, MAX_TRIES};
use serde::Deserialize;
use tracing::debug;

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub registry: String,
    pub max_tries: u32,
    pub fan_out: FanOut,
    pub verify_integrity: bool,
    pub download_concurrency: usize,
    pub download_dir: Option<PathBuf>,
    pub seed: Vec<String>,
}

/// Options accepted as a JSON object through `--options`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    #[serde(default = "default_registry")]
    pub registry: String,
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
    #[serde(default = "default_true")]
    pub concurrent: bool,
    #[serde(default = "default_true")]
    pub verify_integrity: bool,
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            max_tries: default_max_tries(),
            concurrent: true,
            verify_integrity: true,
            download_concurrency: default_download_concurrency(),
        }
    }
}

fn default_registry() -> String {
    DEFAULT_REGISTRY.to_string()
}

fn default_max_tries() -> u32 {
    MAX_TRIES
}

fn default_true() -> bool {
    true
}

fn default_download_concurrency() -> usize {
    DEFAULT_DOWNLOAD_CONCURRENCY
}

/// Flag values that take precedence over [`UserConfig`].
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub registry: Option<String>,
    pub max_tries: Option<u32>,
    pub sequential: bool,
    pub no_verify: bool,
    pub download_dir: Option<PathBuf>,
    pub seed: Vec<String>,
}

impl UserConfig {
    pub fn from_json(raw: Option<&str>) -> Result<Self, serde_json::Error> {
        match raw {
            Some(raw) => serde_json::from_str(raw),
            None => Ok(Self::default()),
        }
    }

    pub fn merge(self, overrides: Overrides) -> Config {
        let fan_out = if overrides.sequential || !self.concurrent {
            FanOut::Sequential
        } else {
            FanOut::Concurrent
        };
        let config = Config {
            registry: overrides.registry.unwrap_or(self.registry),
            max_tries: overrides.max_tries.unwrap_or(self.max_tries),
            fan_out,
            verify_integrity: self.verify_integrity && !overrides.no_verify,
            download_concurrency: self.download_concurrency.max(1),
            download_dir: overrides.download_dir,
            seed: overrides.seed,
        };
        debug!("config {:?}", config);
        config
    }
}

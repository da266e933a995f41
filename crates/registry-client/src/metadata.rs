//! Registry metadata document.

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Registry response for `/<name>/` (full document) or `/<name>/<version>`.
///
/// Only the fields the resolver reads are modelled; everything else in the
/// document is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// `None` when the manifest has no dependency table at all
    #[serde(default)]
    pub dependencies: Option<Dependencies>,
    #[serde(default)]
    pub dist: Option<Dist>,
    /// Per-version documents, only present in a full (unscoped) response
    #[serde(default)]
    pub versions: HashMap<String, PackageMetadata>,
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: HashMap<String, String>,
}

/// Distribution info of one version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Dist {
    #[serde(default)]
    pub tarball: Option<String>,
    #[serde(default)]
    pub shasum: Option<String>,
    /// Subresource integrity string, e.g. `sha512-<base64>`
    #[serde(default)]
    pub integrity: Option<String>,
}

impl PackageMetadata {
    pub fn tarball(&self) -> Option<&str> {
        self.dist.as_ref()?.tarball.as_deref()
    }

    pub fn integrity(&self) -> Option<&str> {
        self.dist.as_ref()?.integrity.as_deref()
    }

    /// All published version keys of a full document.
    pub fn version_keys(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    /// Look up a version document by exact key, falling back to a dist-tag
    /// of the same name (`latest`, `next`, ...).
    pub fn version(&self, version: &str) -> Option<&PackageMetadata> {
        self.versions.get(version).or_else(|| {
            let tagged = self.dist_tags.get(version)?;
            self.versions.get(tagged)
        })
    }
}

/// Dependency table of a manifest, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies(Vec<(String, String)>);

impl Dependencies {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, r)| (n.as_str(), r.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Dependencies {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DependenciesVisitor;

        impl<'de> Visitor<'de> for DependenciesVisitor {
            type Value = Dependencies;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of dependency name to range")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, String)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(name) = map.next_key::<String>()? {
                    // non-string ranges (malformed manifests) are skipped
                    let value = map.next_value::<serde_json::Value>()?;
                    let Some(range) = value.as_str() else {
                        continue;
                    };
                    match entries.iter_mut().find(|(n, _)| *n == name) {
                        Some(entry) => entry.1 = range.to_string(),
                        None => entries.push((name, range.to_string())),
                    }
                }
                Ok(Dependencies(entries))
            }
        }

        deserializer.deserialize_map(DependenciesVisitor)
    }
}

//! VersionResolver: range specifier -> one concrete version.

use std::sync::OnceLock;

use regex::Regex;
use registry_client::RegistryClient;
use semver::{Version, VersionReq};
use tracing::debug;

/// Sentinel version used whenever a specifier cannot be pinned.
pub const LATEST: &str = "latest";

static WILDCARD_RE: OnceLock<Regex> = OnceLock::new();
static COERCE_RE: OnceLock<Regex> = OnceLock::new();

fn wildcard_re() -> &'static Regex {
    WILDCARD_RE.get_or_init(|| Regex::new(r"(^|[\s.])[xX*](\.|\s|$)").unwrap())
}

fn coerce_re() -> &'static Regex {
    COERCE_RE.get_or_init(|| Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").unwrap())
}

/// Pins range specifiers to concrete versions using registry metadata.
#[derive(Debug, Clone)]
pub struct VersionResolver {
    registry: RegistryClient,
}

impl VersionResolver {
    pub fn new(registry: RegistryClient) -> Self {
        Self { registry }
    }

    /// Turn `range` into one concrete version of `name`. Never fails: any
    /// ambiguity resolves to [`LATEST`].
    ///
    /// - `*` (or empty, or `latest`) is `latest`
    /// - an exact version is returned as is, without network activity
    /// - range syntax picks the highest published version that satisfies it
    /// - anything else is coerced to the first `X.Y.Z`-like token
    pub async fn resolve_to_concrete_version(&self, name: &str, range: &str) -> String {
        let range = range.trim();
        if range.is_empty() || range == "*" || range == LATEST {
            return LATEST.to_string();
        }

        if let Some(exact) = exact_version(range) {
            return exact;
        }

        if is_range(range) {
            let Some(reqs) = parse_npm_range(range) else {
                debug!("unsupported range '{}' for {}, using latest", range, name);
                return LATEST.to_string();
            };
            let meta = match self.registry.get_metadata(name, None).await {
                Ok(meta) => meta,
                Err(e) => {
                    debug!("no version list for {} ({}), using latest", name, e);
                    return LATEST.to_string();
                }
            };
            return match max_satisfying(meta.version_keys(), &reqs) {
                Some(version) => {
                    debug!("resolved {}@{} to {}", name, range, version);
                    version
                }
                None => {
                    debug!("no version of {} satisfies '{}', using latest", name, range);
                    LATEST.to_string()
                }
            };
        }

        coerce(range).unwrap_or_else(|| {
            debug!("cannot coerce '{}' for {}, using latest", range, name);
            LATEST.to_string()
        })
    }
}

/// `1.2.3`, `v1.2.3`, `=1.2.3-beta.1` -> the version itself.
pub(crate) fn exact_version(spec: &str) -> Option<String> {
    let bare = spec.trim_start_matches('=').trim_start().trim_start_matches('v');
    Version::parse(bare).ok().map(|v| v.to_string())
}

fn is_range(spec: &str) -> bool {
    spec.contains(['<', '>', '=', '^', '~', '|', '*', '-'])
        || spec.contains(char::is_whitespace)
        || wildcard_re().is_match(spec)
}

/// Translate an npm range into alternatives of cargo-style requirements.
///
/// npm separates comparators with spaces, alternatives with `||`, allows
/// `a - b` hyphen ranges and treats a bare version as exact; `semver`
/// wants commas and treats a bare version as a caret requirement.
fn parse_npm_range(range: &str) -> Option<Vec<VersionReq>> {
    range
        .split("||")
        .map(|alt| translate_alternative(alt.trim()))
        .collect()
}

fn translate_alternative(alt: &str) -> Option<VersionReq> {
    if let Some((low, high)) = alt.split_once(" - ") {
        let low = normalize_comparator(&format!(">={}", low.trim()))?;
        let high = normalize_comparator(&format!("<={}", high.trim()))?;
        return VersionReq::parse(&format!("{}, {}", low, high)).ok();
    }

    let mut comparators = Vec::new();
    let mut pending_op = String::new();
    for token in alt.split_whitespace() {
        if token.chars().all(|c| "<>=^~".contains(c)) {
            pending_op.push_str(token);
            continue;
        }
        let token = format!("{}{}", std::mem::take(&mut pending_op), token);
        comparators.push(normalize_comparator(&token)?);
    }
    if !pending_op.is_empty() {
        return None;
    }

    comparators.retain(|c| c != "*");
    if comparators.is_empty() {
        return Some(VersionReq::STAR);
    }
    VersionReq::parse(&comparators.join(", ")).ok()
}

/// One npm comparator in `semver` syntax, or `*` for a match-all.
fn normalize_comparator(token: &str) -> Option<String> {
    let split = token
        .find(|c: char| !"<>=^~".contains(c))
        .unwrap_or(token.len());
    let (op, version) = token.split_at(split);
    let version = version.trim_start_matches(['v', 'V']);
    if version.is_empty() {
        return None;
    }

    // drop wildcard components: 1.2.x -> 1.2, x -> match-all
    let parts: Vec<&str> = version
        .split('.')
        .take_while(|p| !matches!(*p, "x" | "X" | "*"))
        .collect();
    if parts.is_empty() {
        return Some("*".to_string());
    }
    let version = parts.join(".");

    let op = match op {
        "" => "=",
        "==" => "=",
        other => other,
    };
    Some(format!("{}{}", op, version))
}

/// Highest version among `versions` matching any of `reqs`.
fn max_satisfying<'a>(
    versions: impl Iterator<Item = &'a str>,
    reqs: &[VersionReq],
) -> Option<String> {
    versions
        .filter_map(|key| Version::parse(key).ok().map(|v| (v, key)))
        .filter(|(v, _)| reqs.iter().any(|r| r.matches(v)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, key)| key.to_string())
}

/// Lenient parse: the first version-like token, missing parts zero-filled.
fn coerce(spec: &str) -> Option<String> {
    let caps = coerce_re().captures(spec)?;
    let part = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(format!("{}.{}.{}", part(1)?, part(2)?, part(3)?))
}

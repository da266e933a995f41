//! RegistryClient: metadata and archive fetches with a per-run cache.

use std::sync::Arc;

use moka::future::Cache;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::StatusCode;
use tracing::debug;

use crate::error::RegistryError;
use crate::metadata::PackageMetadata;
use crate::retry::{with_retry, AttemptError, RetryObserver, TracingObserver, MAX_TRIES};

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Characters escaped in the name path segment; keeps `@scope/name` in one segment.
const NAME_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?');

/// Registry client shared by every stage of a resolution run.
///
/// Cloning is cheap and clones share the HTTP connection pool and the
/// metadata cache.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
    max_tries: u32,
    /// Full (unscoped) documents by package name. No TTL: entries live as
    /// long as the client, i.e. one resolution run.
    metadata_cache: Cache<String, Arc<PackageMetadata>>,
    observer: Arc<dyn RetryObserver>,
}

impl RegistryClient {
    /// Build a client for `base_url` with its own HTTP client.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RegistryError> {
        // reqwest is built without a bundled crypto provider
        let _ = rustls::crypto::ring::default_provider().install_default();
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RegistryError::Client(e.to_string()))?;
        Ok(Self::with_http_client(http, base_url))
    }

    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            max_tries: MAX_TRIES,
            metadata_cache: Cache::builder().build(),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }

    /// Fetch metadata for `name`, or for one `version` of it.
    ///
    /// Without a version the full document is fetched once and cached;
    /// concurrent callers for the same name share the in-flight request.
    /// With a version, a cached full document answers the query. A version
    /// missing from a cached document is reported as `NotFound` rather
    /// than refetched.
    #[tracing::instrument(name = "registry_metadata", level = "trace", skip(self))]
    pub async fn get_metadata(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<Arc<PackageMetadata>, RegistryError> {
        let Some(version) = version else {
            return self
                .metadata_cache
                .try_get_with(name.to_string(), self.fetch_metadata(name, None))
                .await
                .map_err(|e| (*e).clone());
        };

        if let Some(full) = self.metadata_cache.get(name).await {
            debug!("cache hit for '{}', picking version {}", name, version);
            return full
                .version(version)
                .cloned()
                .map(Arc::new)
                .ok_or_else(|| RegistryError::not_found(name, Some(version)));
        }

        self.fetch_metadata(name, Some(version)).await
    }

    /// The cached full document for `name`, without any network activity.
    pub async fn cached(&self, name: &str) -> Option<Arc<PackageMetadata>> {
        self.metadata_cache.get(name).await
    }

    /// Fetch the raw bytes behind an archive URL with the same retry policy
    /// as metadata. A 404 is an ordinary failed attempt here.
    pub async fn fetch_archive(&self, url: &str) -> Result<Vec<u8>, RegistryError> {
        debug!("downloading archive {}", url);
        let http = &self.http;
        with_retry(url, self.max_tries, self.observer.as_ref(), move || async move {
            let resp = http
                .get(url)
                .send()
                .await
                .map_err(|e| AttemptError::Retry(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(AttemptError::Retry(format!("archive host returned {}", status)));
            }
            let body = resp
                .bytes()
                .await
                .map_err(|e| AttemptError::Retry(e.to_string()))?;
            Ok(body.to_vec())
        })
        .await
    }

    pub(crate) fn metadata_url(&self, name: &str, version: Option<&str>) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            utf8_percent_encode(name, NAME_SEGMENT),
            version.unwrap_or("")
        )
    }

    async fn fetch_metadata(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<Arc<PackageMetadata>, RegistryError> {
        let url = self.metadata_url(name, version);
        debug!("cache miss for '{}', fetching {}", name, url);

        let http = &self.http;
        let target = url.as_str();
        with_retry(&url, self.max_tries, self.observer.as_ref(), move || async move {
            let resp = http
                .get(target)
                .send()
                .await
                .map_err(|e| AttemptError::Retry(e.to_string()))?;
            let status = resp.status();
            if status == StatusCode::NOT_FOUND {
                return Err(AttemptError::Fatal(RegistryError::not_found(name, version)));
            }
            if !status.is_success() {
                return Err(AttemptError::Retry(format!("registry returned {}", status)));
            }
            let body = resp
                .bytes()
                .await
                .map_err(|e| AttemptError::Retry(e.to_string()))?;
            serde_json::from_slice::<PackageMetadata>(&body)
                .map(Arc::new)
                .map_err(|e| AttemptError::Retry(format!("unparsable metadata: {}", e)))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::retry::AttemptCounter;

    fn left_pad_doc() -> serde_json::Value {
        json!({
            "name": "left-pad",
            "dist-tags": { "latest": "1.3.0" },
            "versions": {
                "1.2.0": {
                    "name": "left-pad",
                    "version": "1.2.0",
                    "dist": { "tarball": "https://example.test/left-pad/-/left-pad-1.2.0.tgz" }
                },
                "1.3.0": {
                    "name": "left-pad",
                    "version": "1.3.0",
                    "dist": { "tarball": "https://example.test/left-pad/-/left-pad-1.3.0.tgz" }
                }
            }
        })
    }

    #[test]
    fn test_metadata_url() {
        let client = RegistryClient::new("http://reg.test/").unwrap();
        assert_eq!(
            client.metadata_url("left-pad", None),
            "http://reg.test/left-pad/"
        );
        assert_eq!(
            client.metadata_url("left-pad", Some("1.3.0")),
            "http://reg.test/left-pad/1.3.0"
        );
        assert_eq!(
            client.metadata_url("@babel/core", Some("7.24.0")),
            "http://reg.test/@babel%2Fcore/7.24.0"
        );
    }

    #[tokio::test]
    async fn test_unscoped_response_is_cached_and_serves_versions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/left-pad/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(left_pad_doc()))
            .expect(1)
            .mount(&server)
            .await;

        let client = RegistryClient::new(server.uri()).unwrap();
        let full = client.get_metadata("left-pad", None).await.unwrap();
        assert_eq!(full.versions.len(), 2);
        let again = client.get_metadata("left-pad", None).await.unwrap();
        assert!(Arc::ptr_eq(&full, &again));

        let one = client
            .get_metadata("left-pad", Some("1.2.0"))
            .await
            .unwrap();
        assert_eq!(
            one.tarball(),
            Some("https://example.test/left-pad/-/left-pad-1.2.0.tgz")
        );

        let tagged = client
            .get_metadata("left-pad", Some("latest"))
            .await
            .unwrap();
        assert_eq!(tagged.version.as_deref(), Some("1.3.0"));

        let missing = client.get_metadata("left-pad", Some("9.9.9")).await;
        assert_eq!(
            missing.unwrap_err(),
            RegistryError::not_found("left-pad", Some("9.9.9"))
        );

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn test_scoped_query_without_cache_hits_registry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/left-pad/1.3.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "left-pad",
                "version": "1.3.0"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = RegistryClient::new(server.uri()).unwrap();
        // scoped responses are not cached
        for _ in 0..2 {
            let meta = client
                .get_metadata("left-pad", Some("1.3.0"))
                .await
                .unwrap();
            assert_eq!(meta.version.as_deref(), Some("1.3.0"));
        }
        assert!(client.cached("left-pad").await.is_none());
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nope/1.0.0"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let counter = Arc::new(AttemptCounter::default());
        let client = RegistryClient::new(server.uri())
            .unwrap()
            .with_observer(counter.clone());
        let err = client
            .get_metadata("nope", Some("1.0.0"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(counter.failed(), 0);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky/1.0.0"))
            .respond_with(ResponseTemplate::new(500))
            .expect(u64::from(MAX_TRIES))
            .mount(&server)
            .await;

        let counter = Arc::new(AttemptCounter::default());
        let client = RegistryClient::new(server.uri())
            .unwrap()
            .with_observer(counter.clone());
        let err = client
            .get_metadata("flaky", Some("1.0.0"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::TooManyFailures { attempts: MAX_TRIES, .. }
        ));
        assert_eq!(counter.failed(), MAX_TRIES);
        assert_eq!(counter.exhausted_count(), 1);
    }

    #[tokio::test]
    async fn test_unparsable_body_counts_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/garbled/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(3)
            .mount(&server)
            .await;

        let client = RegistryClient::new(server.uri()).unwrap().with_max_tries(3);
        let err = client.get_metadata("garbled", None).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::TooManyFailures { attempts: 3, .. }
        ));
        // failures are not cached
        assert!(client.cached("garbled").await.is_none());
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/left-pad/"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/left-pad/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(left_pad_doc()))
            .expect(1)
            .mount(&server)
            .await;

        let counter = Arc::new(AttemptCounter::default());
        let client = RegistryClient::new(server.uri())
            .unwrap()
            .with_observer(counter.clone());
        let meta = client.get_metadata("left-pad", None).await.unwrap();
        assert_eq!(meta.dist_tags.get("latest").map(String::as_str), Some("1.3.0"));
        assert_eq!(counter.failed(), 2);
        assert_eq!(counter.succeeded_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_unscoped_queries_share_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/left-pad/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(left_pad_doc())
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = RegistryClient::new(server.uri()).unwrap();
        let results = futures::future::join_all(
            (0..16).map(|_| client.get_metadata("left-pad", None)),
        )
        .await;

        let first = results[0].as_ref().unwrap().clone();
        for res in &results {
            assert!(Arc::ptr_eq(&first, res.as_ref().unwrap()));
        }
    }

    #[tokio::test]
    async fn test_fetch_archive_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/left-pad/-/left-pad-1.3.0.tgz"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/left-pad/-/left-pad-1.3.0.tgz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"tarball".to_vec()))
            .mount(&server)
            .await;

        let client = RegistryClient::new(server.uri()).unwrap();
        let url = format!("{}/left-pad/-/left-pad-1.3.0.tgz", server.uri());
        let bytes = client.fetch_archive(&url).await.unwrap();
        assert_eq!(bytes, b"tarball");
    }
}

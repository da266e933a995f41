//! Mock registry helpers for tests.

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::node::PackageNode;

/// Serve `GET /<name>/<version>` with the given dependencies, in order, and
/// a tarball URL pointing back at the mock server.
pub(crate) async fn mount_version(
    server: &MockServer,
    name: &str,
    version: &str,
    dependencies: &[(&str, &str)],
) {
    let deps = dependencies
        .iter()
        .map(|(n, r)| format!(r#""{}":"{}""#, n, r))
        .collect::<Vec<_>>()
        .join(",");
    let body = format!(
        r#"{{"name":"{name}","version":"{version}","dependencies":{{{deps}}},"dist":{{"tarball":"{uri}/{name}/-/{name}-{version}.tgz"}}}}"#,
        name = name,
        version = version,
        deps = deps,
        uri = server.uri(),
    );

    Mock::given(method("GET"))
        .and(path(format!("/{}/{}", name, version)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

pub(crate) fn keys(nodes: &[Arc<PackageNode>]) -> Vec<String> {
    nodes.iter().map(|n| n.full_name().to_string()).collect()
}

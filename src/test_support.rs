/// Shared helpers for tests that talk to a wiremock server
use crate::config::EndpointConfig;
use wiremock::MockServer;

/// Endpoint configuration pointing at `/solr/core1/` on a mock server
pub(crate) fn mock_config(server: &MockServer) -> EndpointConfig {
    let addr = server.address();
    EndpointConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        path: "/solr".to_string(),
        core: "core1".to_string(),
        ..Default::default()
    }
}

/// Core system info as returned by `admin/system`
pub(crate) fn core_info(solr_version: &str, schema: &str) -> serde_json::Value {
    serde_json::json!({
        "responseHeader": {"status": 0, "QTime": 3},
        "core": {"schema": schema, "name": "core1"},
        "lucene": {
            "solr-spec-version": solr_version,
            "lucene-spec-version": solr_version,
        }
    })
}

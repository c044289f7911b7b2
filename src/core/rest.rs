/// Generic REST dispatch for schema and config management handlers
///
/// Administrative POSTs are the only way this crate mutates server-side
/// state. A failure leaves that state unknown; nothing is rolled back.
use super::connection::{status_error, ConnectionManager, SolrRequest};
use super::EndpointKey;
use crate::error::{SolrError, SolrResult};
use serde_json::Value;
use tracing::{debug, warn};

/// HTTP method of a REST call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestMethod {
    Get,
    Post,
}

impl ConnectionManager {
    /// Run a REST call against `path` below the given endpoint.
    ///
    /// The endpoint timeout is raised to the optimize timeout for the
    /// duration of the call and restored afterwards, whatever the outcome.
    pub async fn rest_request(
        &self,
        key: EndpointKey,
        path: &str,
        method: RestMethod,
        json_body: Option<&str>,
    ) -> SolrResult<Value> {
        self.ensure_connected().await?;
        if key == EndpointKey::Server {
            self.attach_server_endpoint().await?;
        }

        let base_uri = self.endpoint_base_uri(key);
        let path = path.trim_start_matches('/');
        let request = match method {
            RestMethod::Get => SolrRequest::get(path),
            RestMethod::Post => SolrRequest::post_json(path, json_body.unwrap_or_default()),
        };

        let _timeout = self.override_timeout(key, self.config().optimize_timeout());

        debug!("REST {:?} {}{}", method, base_uri, path);
        let response = self.execute(key, request).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SolrError::transport(&base_uri, e))?;

        let payload = serde_json::from_str::<Value>(&body).ok();

        if let Some(errors) = payload.as_ref().and_then(reported_errors) {
            warn!("Solr rejected REST {:?} {}{}: {}", method, base_uri, path, errors);
            return Err(SolrError::remote(base_uri, errors, Some(status.as_u16())));
        }

        if !status.is_success() {
            return Err(status_error(&base_uri, status.as_u16(), &body));
        }

        payload.ok_or_else(|| {
            SolrError::protocol(format!("Invalid JSON response from {}{}", base_uri, path))
        })
    }
}

/// Serialized "errors" field of a response, if it is present and non-empty
pub(crate) fn reported_errors(payload: &Value) -> Option<String> {
    let errors = payload.get("errors")?;
    let empty = match errors {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    };

    if empty {
        None
    } else {
        Some(serde_json::to_string(errors).unwrap_or_else(|_| errors.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mock_config;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_reported_errors() {
        assert_eq!(
            reported_errors(&json!({"errors": ["bad field"]})),
            Some("[\"bad field\"]".to_string())
        );
        assert_eq!(reported_errors(&json!({"errors": []})), None);
        assert_eq!(reported_errors(&json!({"errors": null})), None);
        assert_eq!(reported_errors(&json!({"result": "ok"})), None);
    }

    #[tokio::test]
    async fn test_rest_get_returns_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/core1/schema/fields"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(mock_config(&server));
        let payload = manager
            .rest_request(EndpointKey::Core, "schema/fields", RestMethod::Get, None)
            .await
            .unwrap();

        assert_eq!(payload, json!({"result": "ok"}));
    }

    #[tokio::test]
    async fn test_rest_post_with_errors_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/solr/core1/schema"))
            .and(header("content-type", "application/json"))
            .and(body_string("{\"add-field\":{\"name\":\"x\"}}"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errors": ["bad field"]})))
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(mock_config(&server));
        let err = manager
            .rest_request(
                EndpointKey::Core,
                "/schema",
                RestMethod::Post,
                Some("{\"add-field\":{\"name\":\"x\"}}"),
            )
            .await
            .unwrap_err();

        assert!(err.is_remote());
        assert!(err.to_string().contains("bad field"));
    }

    #[tokio::test]
    async fn test_rest_restores_timeout_after_success_and_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/core1/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"config": {}})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/solr/core1/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(mock_config(&server));
        manager.ensure_connected().await.unwrap();
        let before = manager.endpoint_timeout(EndpointKey::Core);
        assert_eq!(before, Some(Duration::from_secs(5)));

        manager
            .rest_request(EndpointKey::Core, "config", RestMethod::Get, None)
            .await
            .unwrap();
        assert_eq!(manager.endpoint_timeout(EndpointKey::Core), before);

        let err = manager
            .rest_request(EndpointKey::Core, "broken", RestMethod::Get, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert!(!err.is_remote());
        assert_eq!(manager.endpoint_timeout(EndpointKey::Core), before);
    }

    #[tokio::test]
    async fn test_concurrent_rest_calls_restore_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/solr/core1/schema/fields"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})).set_delay(Duration::from_millis(200)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/solr/core1/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})).set_delay(Duration::from_millis(400)))
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(mock_config(&server));
        manager.ensure_connected().await.unwrap();
        let before = manager.endpoint_timeout(EndpointKey::Core);

        let (fields, config) = tokio::join!(
            manager.rest_request(EndpointKey::Core, "schema/fields", RestMethod::Get, None),
            manager.rest_request(EndpointKey::Core, "config", RestMethod::Get, None),
        );
        fields.unwrap();
        config.unwrap();

        assert_eq!(manager.endpoint_timeout(EndpointKey::Core), before);
    }

    #[tokio::test]
    async fn test_rest_restores_timeout_after_transport_failure() {
        let mut config = crate::config::EndpointConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            core: "core1".to_string(),
            ..Default::default()
        };
        config.timeout = 2;

        let manager = ConnectionManager::new(config);
        manager.attach_server_endpoint().await.unwrap();

        let err = manager
            .rest_request(EndpointKey::Server, "admin/configs", RestMethod::Get, None)
            .await
            .unwrap_err();

        assert!(matches!(err, SolrError::Unreachable { .. }));
        assert_eq!(err.endpoint(), Some("http://127.0.0.1:1/solr/"));
        assert_eq!(manager.endpoint_timeout(EndpointKey::Server), Some(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_rest_error_status_with_errors_body_is_remote() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/solr/admin/collections"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"errors": [{"errorMessages": ["no such collection"]}]})),
            )
            .mount(&server)
            .await;

        let manager = ConnectionManager::new(mock_config(&server));
        let err = manager
            .rest_request(EndpointKey::Server, "admin/collections", RestMethod::Post, Some("{}"))
            .await
            .unwrap_err();

        assert!(err.is_remote());
        assert_eq!(err.status_code(), Some(400));
        assert!(err.to_string().contains("no such collection"));
    }
}

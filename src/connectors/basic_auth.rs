use super::{Connector, ConnectorBase, Setting};
use crate::cache::MetadataStore;
use crate::config::{ConnectorKind, EndpointConfig};
use std::sync::Arc;

/// Connector sending HTTP basic auth credentials with every request
pub struct BasicAuthConnector {
    base: ConnectorBase,
}

impl BasicAuthConnector {
    /// Credentials are taken from the endpoint's username and password
    pub fn new(config: EndpointConfig, store: Arc<dyn MetadataStore>) -> Self {
        let credentials = Some((config.username.clone(), config.password.clone()));
        Self {
            base: ConnectorBase::new(config, credentials, store),
        }
    }

    pub fn with_public_host(mut self, host: Option<String>) -> Self {
        self.base = self.base.with_public_host(host);
        self
    }
}

impl Connector for BasicAuthConnector {
    fn base(&self) -> &ConnectorBase {
        &self.base
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::BasicAuth
    }

    fn label(&self) -> &'static str {
        "Basic Auth"
    }

    fn description(&self) -> &'static str {
        "A connector usable for Solr installations protected by Basic Authentication."
    }

    fn view_settings(&self) -> Vec<Setting> {
        let mut settings = self.base.view_settings(self.label());
        settings.push(Setting::new("Username", self.base.config().username.as_str()));
        settings
    }
}

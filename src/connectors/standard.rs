use super::{Connector, ConnectorBase};
use crate::cache::MetadataStore;
use crate::config::{ConnectorKind, EndpointConfig};
use std::sync::Arc;

/// Connector for servers reachable without authentication
pub struct StandardConnector {
    base: ConnectorBase,
}

impl StandardConnector {
    pub fn new(config: EndpointConfig, store: Arc<dyn MetadataStore>) -> Self {
        Self {
            base: ConnectorBase::new(config, None, store),
        }
    }

    pub fn with_public_host(mut self, host: Option<String>) -> Self {
        self.base = self.base.with_public_host(host);
        self
    }
}

impl Connector for StandardConnector {
    fn base(&self) -> &ConnectorBase {
        &self.base
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Standard
    }

    fn label(&self) -> &'static str {
        "Standard"
    }

    fn description(&self) -> &'static str {
        "A standard connector usable for local installations of the standard Solr distribution."
    }
}

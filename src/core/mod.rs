/// Core abstractions shared by every connector variant
pub mod connection;
pub mod rest;

pub use connection::{ConnectionManager, RequestBody, SolrRequest, TimeoutOverride};
pub use rest::RestMethod;

use std::fmt;
use std::time::Duration;

/// System information of the hosting server
pub const SERVER_INFO_HANDLER: &str = "admin/info/system";
/// System information of the core, including schema and Lucene versions
pub const CORE_INFO_HANDLER: &str = "admin/system";
/// Index and field statistics of the core
pub const LUKE_HANDLER: &str = "admin/luke";
/// Default health handler of a core
pub const PING_HANDLER: &str = "admin/ping";
/// Metrics handler used by the stats summary
pub const STATS_HANDLER: &str = "admin/mbeans?stats=true";
/// Core administration handler of the server
pub const CORES_HANDLER: &str = "admin/cores";
pub const SELECT_HANDLER: &str = "select";
pub const UPDATE_HANDLER: &str = "update";

/// Logical endpoints a connector talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKey {
    /// The indexed collection
    Core,
    /// The hosting server, without a collection segment
    Server,
}

impl EndpointKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKey::Core => "core",
            EndpointKey::Server => "server",
        }
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub key: EndpointKey,
    /// Base URI ending in "/"
    pub base_uri: String,
    /// Timeout applied to requests that don't carry their own
    pub timeout: Duration,
}

impl Endpoint {
    pub fn new(key: EndpointKey, base_uri: String, timeout: Duration) -> Self {
        Self {
            key,
            base_uri,
            timeout,
        }
    }

    /// Absolute URI of a handler below this endpoint
    pub fn handler_uri(&self, handler: &str) -> String {
        format!("{}{}", self.base_uri, handler.trim_start_matches('/'))
    }
}

/// Solr version negotiation
///
/// Versions are derived on demand, from the configured override or from
/// live core/server metadata, and never stored on their own.
use crate::connectors::ConnectorBase;
use crate::error::{SolrError, SolrResult};
use serde_json::Value;
use tracing::{debug, warn};

/// Reported when no version can be determined
pub const UNKNOWN_VERSION: &str = "0.0.0";

/// Pad a version to three dot-separated components
pub fn normalize_version(version: &str) -> String {
    let mut parts: Vec<&str> = version
        .trim()
        .split('.')
        .take(3)
        .map(|p| if p.is_empty() { "0" } else { p })
        .collect();

    while parts.len() < 3 {
        parts.push("0");
    }

    parts.join(".")
}

/// First component of a version
pub fn major_version(version: &str) -> String {
    version.split('.').next().unwrap_or_default().to_string()
}

/// Release branch of a version, e.g. "7.x"
pub fn branch(version: &str) -> String {
    format!("{}.x", major_version(version))
}

/// "major.minor" of a version, as used by luceneMatchVersion
pub fn lucene_match_version(version: &str) -> String {
    let mut parts = version.split('.');
    let major = parts.next().unwrap_or_default();
    let minor = parts.next().filter(|m| !m.is_empty()).unwrap_or("0");
    format!("{}.{}", major, minor)
}

/// Solr version reported in `lucene.solr-spec-version` of an info payload
pub fn solr_spec_version(info: &Value) -> Option<String> {
    info.pointer("/lucene/solr-spec-version")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Version part of a schema name: everything after the first "-".
///
/// "search-4" yields "4". A name without any "-" has no version part and
/// is rejected.
pub fn schema_version_from_name(schema: &str) -> SolrResult<String> {
    schema
        .split_once('-')
        .map(|(_, version)| version.to_string())
        .ok_or_else(|| SolrError::protocol(format!("Schema name '{}' carries no version", schema)))
}

impl ConnectorBase {
    /// Solr version of the server.
    ///
    /// A configured override wins unless `force_auto_detect` is set. Auto
    /// detection tries the core info, then the server info, and reports
    /// [`UNKNOWN_VERSION`] when neither is available.
    pub async fn get_solr_version(&self, force_auto_detect: bool) -> String {
        let configured = self.config().solr_version.trim();
        if !force_auto_detect && !configured.is_empty() {
            return normalize_version(configured);
        }

        let info = match self.get_core_info(false).await {
            Ok(info) => info,
            Err(e) => {
                debug!("Core info unavailable, trying server info: {}", e);
                match self.get_server_info(false).await {
                    Ok(info) => info,
                    Err(e) => {
                        warn!("Unable to detect the Solr version: {}", e);
                        return UNKNOWN_VERSION.to_string();
                    }
                }
            }
        };

        solr_spec_version(&info).unwrap_or_else(|| UNKNOWN_VERSION.to_string())
    }

    async fn version_or_negotiated(&self, version: &str) -> String {
        if version.is_empty() {
            self.get_solr_version(false).await
        } else {
            version.to_string()
        }
    }

    /// Major version of `version`, or of the negotiated version when empty
    pub async fn get_solr_major_version(&self, version: &str) -> String {
        major_version(&self.version_or_negotiated(version).await)
    }

    pub async fn get_solr_branch(&self, version: &str) -> String {
        branch(&self.version_or_negotiated(version).await)
    }

    pub async fn get_lucene_match_version(&self, version: &str) -> String {
        lucene_match_version(&self.version_or_negotiated(version).await)
    }

    /// Full schema name reported by the core, e.g. "drupal-4.2-solr-8.x"
    pub async fn get_schema_version_string(&self, reset: bool) -> SolrResult<String> {
        let info = self.get_core_info(reset).await?;
        info.pointer("/core/schema")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SolrError::protocol("Core info does not report a schema name"))
    }

    pub async fn get_schema_version(&self, reset: bool) -> SolrResult<String> {
        let schema = self.get_schema_version_string(reset).await?;
        schema_version_from_name(&schema)
    }
}

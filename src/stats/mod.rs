/// Core statistics from the mbeans handler
pub mod phps;

use crate::connectors::ConnectorBase;
use crate::core::{EndpointKey, SolrRequest, STATS_HANDLER};
use crate::error::{SolrError, SolrResult};
use crate::utils::{coerce_int, coerce_string, format_bytes, format_duration};
use serde_json::{Map, Value};
use std::time::Duration;

/// Summary of the update handler and index state of a core
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSummary {
    pub pending_docs: i64,
    pub autocommit_time_seconds: i64,
    /// Autocommit interval in human-readable form
    pub autocommit_time: String,
    pub deletes_by_id: i64,
    pub deletes_by_query: i64,
    pub deletes_total: i64,
    pub schema_version: String,
    pub core_name: String,
    pub index_size: String,
}

impl StatsSummary {
    /// Extract the summary from a decoded mbeans payload.
    ///
    /// `solr-mbeans` is either a flat `[category, beans, category, beans]`
    /// list or an object keyed by category. Missing values count as zero or
    /// empty.
    pub fn from_mbeans(payload: &Value, schema_version: String) -> Self {
        let categories = categories(payload.get("solr-mbeans"));

        let update = stats_of(&categories, "UPDATE", "updateHandler");
        let core = stats_of(&categories, "CORE", "core");
        let replication = stats_of(&categories, "QUERYHANDLER", "/replication")
            .or_else(|| stats_of(&categories, "REPLICATION", "/replication"));

        let update_stat = |names: &[&str]| lookup(update, names);

        let autocommit_ms = coerce_int(update_stat(&[
            "autocommit maxTime",
            "UPDATE.updateHandler.autoCommitMaxTime",
        ]));
        let autocommit_time_seconds = autocommit_ms / 1000;
        let deletes_by_id = coerce_int(update_stat(&["deletesById", "UPDATE.updateHandler.deletesById"]));
        let deletes_by_query =
            coerce_int(update_stat(&["deletesByQuery", "UPDATE.updateHandler.deletesByQuery"]));

        let index_size = match lookup(replication, &["indexSize", "REPLICATION./replication.indexSize"]) {
            Some(Value::Number(n)) => n.as_u64().map(format_bytes).unwrap_or_default(),
            other => coerce_string(other),
        };

        Self {
            pending_docs: coerce_int(update_stat(&["docsPending", "UPDATE.updateHandler.docsPending"])),
            autocommit_time_seconds,
            autocommit_time: format_duration(Duration::from_secs(autocommit_time_seconds.max(0) as u64)),
            deletes_by_id,
            deletes_by_query,
            deletes_total: deletes_by_id + deletes_by_query,
            schema_version,
            core_name: coerce_string(lookup(core, &["coreName", "CORE.coreName"])),
            index_size,
        }
    }
}

/// Normalize the mbeans listing to category -> beans
fn categories(mbeans: Option<&Value>) -> Map<String, Value> {
    match mbeans {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::Array(list)) => list
            .chunks(2)
            .filter_map(|pair| match pair {
                [Value::String(name), beans] => Some((name.clone(), beans.clone())),
                _ => None,
            })
            .collect(),
        _ => Map::new(),
    }
}

fn stats_of<'a>(categories: &'a Map<String, Value>, category: &str, bean: &str) -> Option<&'a Value> {
    categories.get(category)?.get(bean)?.get("stats")
}

fn lookup<'a>(stats: Option<&'a Value>, names: &[&str]) -> Option<&'a Value> {
    let stats = stats?;
    names.iter().find_map(|name| stats.get(*name))
}

impl ConnectorBase {
    /// Update handler and index summary of the configured core
    pub async fn get_stats_summary(&self) -> SolrResult<StatsSummary> {
        self.connect().await?;

        let request = SolrRequest::get(STATS_HANDLER).param("wt", "phps");
        let body = self.connection().execute_bytes(EndpointKey::Core, request).await?;
        let payload = phps::decode(&body).map_err(|e| {
            SolrError::protocol(format!(
                "Invalid stats response from {}: {}",
                self.connection().endpoint_base_uri(EndpointKey::Core),
                e
            ))
        })?;

        let schema_version = self.get_schema_version_string(true).await?;
        Ok(StatsSummary::from_mbeans(&payload, schema_version))
    }
}

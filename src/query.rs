/// Request builders for the select and update handlers
///
/// These only assemble parameters and bodies. Mapping documents to fields
/// is left to the caller; documents are passed in as JSON values.
use crate::error::{SolrError, SolrResult};
use serde_json::Value;

/// Longest encoded query string sent with GET when the method is AUTO
pub const MAX_GET_QUERY_LENGTH: usize = 1024;

/// Characters with a meaning in the standard query parser
const SPECIAL_CHARS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/',
];

/// Escaping and expression helpers for query strings
#[derive(Debug, Clone, Default)]
pub struct QueryHelper;

impl QueryHelper {
    pub fn new() -> Self {
        Self
    }

    /// Escape a single term so it is matched literally
    pub fn escape_term(&self, term: &str) -> String {
        let mut escaped = String::with_capacity(term.len());
        for c in term.chars() {
            if SPECIAL_CHARS.contains(&c) {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }

    /// Quote a phrase, escaping quotes and backslashes inside it
    pub fn escape_phrase(&self, phrase: &str) -> String {
        let inner = phrase.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\"", inner)
    }

    /// Range expression on `field`; open ends become "*"
    pub fn range_query(&self, field: &str, from: Option<&str>, to: Option<&str>, inclusive: bool) -> String {
        let (open, close) = if inclusive { ('[', ']') } else { ('{', '}') };
        format!(
            "{}:{}{} TO {}{}",
            field,
            open,
            from.map(|f| self.escape_term(f)).unwrap_or_else(|| "*".to_string()),
            to.map(|t| self.escape_term(t)).unwrap_or_else(|| "*".to_string()),
            close
        )
    }
}

/// Parameters of a select request
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub query: String,
    pub filter_queries: Vec<String>,
    pub fields: Vec<String>,
    pub sort: Option<String>,
    pub start: usize,
    pub rows: usize,
    pub params: Vec<(String, String)>,
}

impl Default for SelectQuery {
    fn default() -> Self {
        Self {
            query: "*:*".to_string(),
            filter_queries: Vec::new(),
            fields: Vec::new(),
            sort: None,
            start: 0,
            rows: 10,
            params: Vec::new(),
        }
    }
}

impl SelectQuery {
    pub fn new<S: Into<String>>(query: S) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn filter<S: Into<String>>(mut self, fq: S) -> Self {
        self.filter_queries.push(fq.into());
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn sort<S: Into<String>>(mut self, sort: S) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn page(mut self, start: usize, rows: usize) -> Self {
        self.start = start;
        self.rows = rows;
        self
    }

    pub fn param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Request parameters in the order they are sent
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("q".to_string(), self.query.clone()),
            ("start".to_string(), self.start.to_string()),
            ("rows".to_string(), self.rows.to_string()),
        ];

        for fq in &self.filter_queries {
            params.push(("fq".to_string(), fq.clone()));
        }
        if !self.fields.is_empty() {
            params.push(("fl".to_string(), self.fields.join(",")));
        }
        if let Some(sort) = &self.sort {
            params.push(("sort".to_string(), sort.clone()));
        }

        params.extend(self.params.iter().cloned());
        params.push(("wt".to_string(), "json".to_string()));
        params
    }
}

/// Length of the form-encoded query string for `params`
pub fn encoded_len(params: &[(String, String)]) -> usize {
    fn component(s: &str) -> usize {
        s.bytes()
            .map(|b| match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'*' | b' ' => 1,
                _ => 3,
            })
            .sum()
    }

    let pairs: usize = params.iter().map(|(k, v)| component(k) + 1 + component(v)).sum();
    pairs + params.len().saturating_sub(1)
}

/// One command of a JSON update request
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateCommand {
    Add { doc: Value, overwrite: bool },
    DeleteById(String),
    DeleteByQuery(String),
    Commit { soft: bool, wait_searcher: bool },
    Optimize { wait_searcher: bool, max_segments: Option<u32> },
}

/// Builder for a JSON update request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateQuery {
    commands: Vec<UpdateCommand>,
}

impl UpdateQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(mut self, doc: Value) -> Self {
        self.commands.push(UpdateCommand::Add { doc, overwrite: true });
        self
    }

    pub fn add_documents<I: IntoIterator<Item = Value>>(mut self, docs: I) -> Self {
        self.commands
            .extend(docs.into_iter().map(|doc| UpdateCommand::Add { doc, overwrite: true }));
        self
    }

    pub fn delete_by_id<S: Into<String>>(mut self, id: S) -> Self {
        self.commands.push(UpdateCommand::DeleteById(id.into()));
        self
    }

    pub fn delete_by_query<S: Into<String>>(mut self, query: S) -> Self {
        self.commands.push(UpdateCommand::DeleteByQuery(query.into()));
        self
    }

    pub fn commit(mut self, soft: bool) -> Self {
        self.commands.push(UpdateCommand::Commit { soft, wait_searcher: true });
        self
    }

    pub fn optimize(mut self, max_segments: Option<u32>) -> Self {
        self.commands.push(UpdateCommand::Optimize { wait_searcher: true, max_segments });
        self
    }

    pub fn commands(&self) -> &[UpdateCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Serialize to Solr's JSON update syntax.
    ///
    /// Commands keep their order; repeated keys such as "add" are valid in
    /// this syntax, so the object is written by hand.
    pub fn to_json(&self) -> SolrResult<String> {
        let mut parts = Vec::with_capacity(self.commands.len());

        for command in &self.commands {
            let (key, value) = match command {
                UpdateCommand::Add { doc, overwrite } => {
                    if !doc.is_object() {
                        return Err(SolrError::internal("Documents must be JSON objects"));
                    }
                    ("add", serde_json::json!({ "doc": doc, "overwrite": overwrite }))
                }
                UpdateCommand::DeleteById(id) => ("delete", serde_json::json!({ "id": id })),
                UpdateCommand::DeleteByQuery(query) => ("delete", serde_json::json!({ "query": query })),
                UpdateCommand::Commit { soft, wait_searcher } => (
                    "commit",
                    serde_json::json!({ "softCommit": soft, "waitSearcher": wait_searcher }),
                ),
                UpdateCommand::Optimize { wait_searcher, max_segments } => {
                    let value = match max_segments {
                        Some(max) => serde_json::json!({ "maxSegments": max, "waitSearcher": wait_searcher }),
                        None => serde_json::json!({ "waitSearcher": wait_searcher }),
                    };
                    ("optimize", value)
                }
            };

            let value = serde_json::to_string(&value)
                .map_err(|e| SolrError::internal(format!("Failed to serialize update: {}", e)))?;
            parts.push(format!("\"{}\":{}", key, value));
        }

        Ok(format!("{{{}}}", parts.join(",")))
    }
}

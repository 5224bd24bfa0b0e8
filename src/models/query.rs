//! Defines data structures for a probe query.
//!
//! Includes:
//! - `Row`: one record of the remote table, kept as an open column → value mapping.
//! - `QueryResult`: the single outcome produced per run.
//! - `PostgrestError`: the JSON error body returned by the Supabase REST layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record from the remote table. The schema is owned by the remote project,
/// so columns are never mapped onto a fixed struct.
pub type Row = Map<String, Value>;

/// Outcome of the single read query issued by the probe.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// The query succeeded; rows are in the order the server returned them (possibly empty).
    Success(Vec<Row>),
    /// The query failed; the message is what gets printed after `Error: `.
    Failure(String),
}

impl QueryResult {
    pub fn is_success(&self) -> bool {
        matches!(self, QueryResult::Success(_))
    }

    /// Number of rows returned, `None` on failure.
    pub fn row_count(&self) -> Option<usize> {
        match self {
            QueryResult::Success(rows) => Some(rows.len()),
            QueryResult::Failure(_) => None,
        }
    }
}

/// Error body returned by PostgREST for failed requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostgrestError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

/// Looser error body used by the API gateway and auth layer in front of PostgREST.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GatewayError {
    /// First non-empty message field, in order of specificity.
    pub fn into_message(self) -> Option<String> {
        [self.message, self.msg, self.error_description, self.error]
            .into_iter()
            .flatten()
            .find(|m| !m.trim().is_empty())
    }
}

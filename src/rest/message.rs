//! Wire envelopes of the REST Cypher API.
//!
//! ```text
//! GET  {base}        -> ServiceRoot   { "data": ... }
//! GET  {data}        -> DataEndpoint  { "cypher": ..., "transaction": ..., "neo4j_version": ... }
//! POST {cypher}      <- CypherRequest      -> CypherResponse
//! POST {transaction} <- TransactionRequest -> TransactionResponse
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::error::{RestError, RestResult};

/// Result format requested from the transactional endpoint.
///
/// `REST` keeps the `self`/`data` entity envelopes that the value decoder
/// recognises nodes and relationships by.
pub const REST_RESULT_FORMAT: &str = "REST";

// ============================================================================
// Discovery
// ============================================================================

/// Service root document, result of the first discovery GET.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRoot {
    /// Location of the data endpoint document
    #[serde(rename = "data")]
    pub data_endpoint: String,
}

/// Data endpoint document, result of the second discovery GET.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEndpoint {
    /// Single-statement endpoint
    pub cypher: String,
    /// Multi-statement endpoint, absent on servers without transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    /// Server version string
    #[serde(rename = "neo4j_version", default)]
    pub server_version: String,
}

// ============================================================================
// Single-statement endpoint
// ============================================================================

/// Body of a POST to the cypher endpoint.
#[derive(Debug, Serialize)]
pub struct CypherRequest<'a> {
    /// Query text
    pub query: &'a str,
    /// Parameters object
    pub params: &'a JsonValue,
}

/// Response of the cypher endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CypherResponse {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of raw cells
    #[serde(default)]
    pub data: Vec<Vec<JsonValue>>,
    /// Update statistics (present when requested)
    #[serde(default)]
    pub stats: Option<QueryStats>,
}

/// Error body returned with a non-2xx status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerErrorBody {
    /// Human readable message
    #[serde(default)]
    pub message: Option<String>,
    /// Server exception name
    #[serde(default)]
    pub exception: Option<String>,
}

impl ServerErrorBody {
    /// Best-effort parse of an error body; returns `None` for non-JSON bodies.
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }

    /// One-line summary.
    pub fn summary(&self) -> Option<String> {
        match (&self.exception, &self.message) {
            (Some(exc), Some(msg)) => Some(format!("{}: {}", exc, msg)),
            (None, Some(msg)) => Some(msg.clone()),
            (Some(exc), None) => Some(exc.clone()),
            (None, None) => None,
        }
    }
}

// ============================================================================
// Transactional endpoint
// ============================================================================

/// Body of a POST to the transactional endpoint.
#[derive(Debug, Serialize)]
pub struct TransactionRequest<'a> {
    /// Statements, executed in order
    pub statements: Vec<TransactionStatement<'a>>,
}

impl<'a> TransactionRequest<'a> {
    /// Request carrying a single statement.
    pub fn single(statement: &'a str, parameters: &'a JsonValue) -> Self {
        Self {
            statements: vec![TransactionStatement {
                statement,
                parameters,
                result_data_contents: vec![REST_RESULT_FORMAT],
                include_stats: true,
            }],
        }
    }

    /// Request without statements (used for commit).
    pub fn empty() -> Self {
        Self { statements: Vec::new() }
    }
}

/// One statement of a transactional request.
#[derive(Debug, Serialize)]
pub struct TransactionStatement<'a> {
    /// Query text
    pub statement: &'a str,
    /// Parameters object
    pub parameters: &'a JsonValue,
    /// Requested result formats
    #[serde(rename = "resultDataContents")]
    pub result_data_contents: Vec<&'static str>,
    /// Ask for update statistics
    #[serde(rename = "includeStats")]
    pub include_stats: bool,
}

/// Response of the transactional endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionResponse {
    /// Where the transaction must be committed next
    #[serde(default)]
    pub commit: Option<String>,
    /// One result per statement
    #[serde(default)]
    pub results: Vec<TransactionResult>,
    /// Transaction metadata
    #[serde(default)]
    pub transaction: Option<TransactionInfo>,
    /// Statement errors; non-empty means the server rolled back
    #[serde(default)]
    pub errors: Vec<TransactionErrorEntry>,
}

/// Result of a single transactional statement.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows
    #[serde(default)]
    pub data: Vec<TransactionRow>,
    /// Update statistics
    #[serde(default)]
    pub stats: Option<QueryStats>,
}

/// One row of a transactional result, in whichever formats were requested.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRow {
    /// REST format cells
    #[serde(default)]
    pub rest: Option<Vec<JsonValue>>,
    /// Plain row format cells
    #[serde(default)]
    pub row: Option<Vec<JsonValue>>,
}

impl TransactionRow {
    /// Cells of the row, preferring the REST format.
    pub fn into_cells(self) -> RestResult<Vec<JsonValue>> {
        self.rest
            .or(self.row)
            .ok_or_else(|| RestError::decode("transactional row carries neither 'rest' nor 'row'"))
    }
}

/// Transaction metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionInfo {
    /// Expiry timestamp (RFC 2822)
    #[serde(default)]
    pub expires: Option<String>,
}

/// Error entry of a transactional response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransactionErrorEntry {
    /// Status code, e.g. `Neo.ClientError.Statement.SyntaxError`
    pub code: String,
    /// Message
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Statistics
// ============================================================================

/// Update statistics as sent by the server.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryStats {
    pub contains_updates: bool,
    pub nodes_created: i64,
    pub nodes_deleted: i64,
    pub properties_set: i64,
    pub relationships_created: i64,
    #[serde(alias = "relationship_deleted")]
    pub relationships_deleted: i64,
    pub labels_added: i64,
    pub labels_removed: i64,
    pub indexes_added: i64,
    pub indexes_removed: i64,
    pub constraints_added: i64,
    pub constraints_removed: i64,
}

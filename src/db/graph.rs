use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::adapter::StoreAdapter;
use super::value::{Row, Value};
use crate::error::{EngineError, EngineResult};
use crate::pipeline::{StoreKind, StoreQuery};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Base URL of the Neo4j HTTP API, e.g. `http://localhost:7474`.
    pub uri: String,
    pub database: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub timeout_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: String::from("http://localhost:7474"),
            database: String::from("neo4j"),
            username: String::from("neo4j"),
            password: String::new(),
            timeout_secs: 30,
        }
    }
}

impl GraphConfig {
    /// Endpoint that runs statements in a single auto-committed transaction.
    pub fn commit_url(&self) -> String {
        format!(
            "{}/db/{}/tx/commit",
            self.uri.trim_end_matches('/'),
            self.database
        )
    }
}

/// Runs Cypher against Neo4j through its HTTP transaction endpoint.
pub struct GraphAdapter {
    config: GraphConfig,
    client: reqwest::Client,
}

impl GraphAdapter {
    pub fn new(config: GraphConfig) -> anyhow::Result<Self> {
        // No idle pool: each call opens its own connection and drops it when done.
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl StoreAdapter for GraphAdapter {
    fn kind(&self) -> StoreKind {
        StoreKind::Graph
    }

    async fn execute(&self, query: &StoreQuery) -> EngineResult<Vec<Row>> {
        let cypher = match query {
            StoreQuery::Text(cypher) => cypher,
            other => {
                return Err(EngineError::adapter(
                    StoreKind::Graph,
                    format!("expected Cypher text, got {}", other),
                ))
            }
        };

        let request = serde_json::json!({
            "statements": [{ "statement": cypher, "resultDataContents": ["row"] }]
        });
        let response = self
            .client
            .post(self.config.commit_url())
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::adapter(StoreKind::Graph, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EngineError::adapter(
                StoreKind::Graph,
                format!("HTTP {}: {}", status, body),
            ));
        }

        let body: TxResponse = response.json().await.map_err(|e| {
            EngineError::adapter(StoreKind::Graph, format!("Failed to parse response: {}", e))
        })?;
        body.into_rows()
            .map_err(|message| EngineError::adapter(StoreKind::Graph, message))
    }
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl TxResponse {
    /// One row per result record, fields named after the RETURN columns.
    fn into_rows(self) -> Result<Vec<Row>, String> {
        if !self.errors.is_empty() {
            let messages: Vec<String> = self
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect();
            return Err(messages.join("; "));
        }

        let Some(result) = self.results.into_iter().next() else {
            return Ok(vec![]);
        };
        let columns = result.columns;
        Ok(result
            .data
            .into_iter()
            .map(|record| {
                columns
                    .iter()
                    .cloned()
                    .zip(record.row.into_iter().map(Value::from_json))
                    .collect::<Row>()
            })
            .collect())
    }
}

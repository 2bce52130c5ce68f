use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document};
use mongodb::Client;
use serde::{Deserialize, Serialize};

use super::adapter::StoreAdapter;
use super::value::{Row, Value};
use crate::error::{EngineError, EngineResult};
use crate::pipeline::{StoreKind, StoreQuery};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Connection string; may embed credentials, so it is never written back.
    #[serde(skip_serializing)]
    pub uri: String,
    pub database: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            uri: String::from("mongodb://localhost:27017"),
            database: String::from("test"),
        }
    }
}

/// Runs structured filters against MongoDB collections.
pub struct DocumentAdapter {
    config: DocumentConfig,
}

impl DocumentAdapter {
    pub fn new(config: DocumentConfig) -> Self {
        Self { config }
    }

    async fn find(
        &self,
        client: &Client,
        collection: &str,
        filter: Document,
    ) -> EngineResult<Vec<Row>> {
        let cursor = client
            .database(&self.config.database)
            .collection::<Document>(collection)
            .find(filter)
            .await
            .map_err(|e| EngineError::adapter(StoreKind::Document, e.to_string()))?;
        let documents: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| EngineError::adapter(StoreKind::Document, e.to_string()))?;
        Ok(documents.into_iter().map(document_to_row).collect())
    }
}

#[async_trait]
impl StoreAdapter for DocumentAdapter {
    fn kind(&self) -> StoreKind {
        StoreKind::Document
    }

    async fn execute(&self, query: &StoreQuery) -> EngineResult<Vec<Row>> {
        let (collection, predicate) = match query {
            StoreQuery::Filter {
                collection,
                predicate,
            } => (collection, predicate),
            other => {
                return Err(EngineError::adapter(
                    StoreKind::Document,
                    format!("expected a collection filter, got {}", other),
                ))
            }
        };

        let filter = filter_document(predicate)
            .map_err(|message| EngineError::adapter(StoreKind::Document, message))?;

        let client = Client::with_uri_str(&self.config.uri)
            .await
            .map_err(|e| EngineError::adapter(StoreKind::Document, e.to_string()))?;
        let result = self.find(&client, collection, filter).await;
        client.shutdown().await;
        result
    }
}

/// Convert a JSON predicate into a BSON filter, honoring extended JSON such
/// as `{"$oid": ...}`.
pub fn filter_document(predicate: &serde_json::Value) -> Result<Document, String> {
    match Bson::try_from(predicate.clone()) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(other) => Err(format!("filter must be an object, got {}", other)),
        Err(e) => Err(format!("invalid filter: {}", e)),
    }
}

pub fn document_to_row(document: Document) -> Row {
    document
        .into_iter()
        .map(|(field, value)| (field, bson_to_value(value)))
        .collect()
}

fn bson_to_value(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::Text(oid.to_hex()),
        Bson::Decimal128(_) => {
            // Relaxed extended JSON renders decimals as {"$numberDecimal": "<digits>"}.
            let json = value.into_relaxed_extjson();
            json.get("$numberDecimal")
                .and_then(|d| d.as_str())
                .and_then(|d| d.parse::<f64>().ok())
                .map(Value::Float)
                .unwrap_or(Value::Null)
        }
        other => Value::from_json(other.into_relaxed_extjson()),
    }
}

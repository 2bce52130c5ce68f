use std::collections::BTreeMap;

use crate::db::{Row, Value};
use crate::error::{EngineError, EngineResult};
use crate::pipeline::format::format_sequence;
use crate::pipeline::plan::{replace_placeholders, whole_placeholder, Stage, StoreKind, StoreQuery};

/// Column-wise outputs of every stage recorded so far in one pipeline run.
///
/// Each declared output key maps to the values of that field across the
/// stage's rows, in row order. Rows lacking the field are skipped, so two keys
/// of the same stage may hold sequences of different lengths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageResultTable {
    stages: BTreeMap<u32, BTreeMap<String, Vec<Value>>>,
}

impl StageResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project `rows` onto `output_keys` and store them under `stage`.
    ///
    /// Every declared key gets an entry, empty when no row carries it, so an
    /// empty upstream result still resolves to an empty literal.
    pub fn record(&mut self, stage: u32, rows: &[Row], output_keys: &[String]) {
        let columns = output_keys
            .iter()
            .map(|key| {
                let values = rows.iter().filter_map(|row| row.get(key).cloned()).collect();
                (key.clone(), values)
            })
            .collect();
        self.stages.insert(stage, columns);
    }

    pub fn get(&self, stage: u32, key: &str) -> Option<&[Value]> {
        self.stages
            .get(&stage)
            .and_then(|columns| columns.get(key))
            .map(Vec::as_slice)
    }

    pub fn contains_stage(&self, stage: u32) -> bool {
        self.stages.contains_key(&stage)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Iterate `(stage, key, values)` over every recorded column.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, &[Value])> {
        self.stages.iter().flat_map(|(stage, columns)| {
            columns
                .iter()
                .map(move |(key, values)| (*stage, key.as_str(), values.as_slice()))
        })
    }
}

/// Replace every resolvable placeholder in `stage`'s query.
///
/// Placeholders naming a stage or key missing from `table` are left as they
/// are; the store rejects the query when it runs.
pub fn substitute(stage: &Stage, table: &StageResultTable) -> EngineResult<StoreQuery> {
    match &stage.query {
        StoreQuery::Text(text) => Ok(StoreQuery::Text(substitute_text(
            text,
            table,
            stage.store_kind,
        ))),
        StoreQuery::Filter {
            collection,
            predicate,
        } => {
            let predicate = substitute_filter(predicate, table).map_err(|e| {
                EngineError::Substitution {
                    stage: stage.number,
                    message: e,
                }
            })?;
            Ok(StoreQuery::Filter {
                collection: collection.clone(),
                predicate,
            })
        }
    }
}

/// Replace every resolvable placeholder in `text` in a single pass, so text
/// taken from stored values is never itself treated as a placeholder.
pub fn substitute_text(text: &str, table: &StageResultTable, store: StoreKind) -> String {
    replace_placeholders(text, |reference| {
        table
            .get(reference.stage, &reference.key)
            .map(|values| format_sequence(values, store))
    })
}

/// Rewrite a structured filter value by value.
///
/// A string that is exactly one placeholder becomes the JSON array of the
/// values; placeholders embedded in longer strings or in field names are
/// replaced by the literal text of that array.
fn substitute_filter(
    predicate: &serde_json::Value,
    table: &StageResultTable,
) -> Result<serde_json::Value, String> {
    use serde_json::Value as Json;

    Ok(match predicate {
        Json::String(text) => substitute_string(text, table)?,
        Json::Array(items) => Json::Array(
            items
                .iter()
                .map(|item| substitute_filter(item, table))
                .collect::<Result<_, _>>()?,
        ),
        Json::Object(fields) => {
            let mut rewritten = serde_json::Map::with_capacity(fields.len());
            for (field, value) in fields {
                rewritten.insert(
                    substitute_text(field, table, StoreKind::Document),
                    substitute_filter(value, table)?,
                );
            }
            Json::Object(rewritten)
        }
        other => other.clone(),
    })
}

fn substitute_string(text: &str, table: &StageResultTable) -> Result<serde_json::Value, String> {
    if let Some(reference) = whole_placeholder(text) {
        if let Some(values) = table.get(reference.stage, &reference.key) {
            let literal = format_sequence(values, StoreKind::Document);
            return serde_json::from_str(&literal).map_err(|e| {
                format!("{} did not render as a JSON value: {}", reference.token(), e)
            });
        }
    }
    Ok(serde_json::Value::String(substitute_text(
        text,
        table,
        StoreKind::Document,
    )))
}

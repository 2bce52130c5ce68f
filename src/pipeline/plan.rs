use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// The kinds of backing store a stage can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StoreKind {
    #[serde(rename = "postgresql", alias = "relational", alias = "postgres")]
    Relational,
    #[serde(rename = "neo4j", alias = "graph")]
    Graph,
    #[serde(rename = "mongodb", alias = "document", alias = "mongo")]
    Document,
}

impl StoreKind {
    /// Name used for this store in the plan wire format.
    pub fn wire_name(&self) -> &'static str {
        match self {
            StoreKind::Relational => "postgresql",
            StoreKind::Graph => "neo4j",
            StoreKind::Document => "mongodb",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// A store-specific query: source text for SQL and Cypher, a structured
/// filter for the document store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreQuery {
    Text(String),
    Filter {
        collection: String,
        predicate: serde_json::Value,
    },
}

impl StoreQuery {
    pub fn text(query: impl Into<String>) -> Self {
        StoreQuery::Text(query.into())
    }

    pub fn filter(collection: impl Into<String>, predicate: serde_json::Value) -> Self {
        StoreQuery::Filter {
            collection: collection.into(),
            predicate,
        }
    }

    fn matches_kind(&self, kind: StoreKind) -> bool {
        matches!(
            (self, kind),
            (StoreQuery::Text(_), StoreKind::Relational | StoreKind::Graph)
                | (StoreQuery::Filter { .. }, StoreKind::Document)
        )
    }

    /// Every placeholder occurring anywhere in the query.
    pub fn placeholders(&self) -> Vec<PlaceholderRef> {
        match self {
            StoreQuery::Text(text) => find_placeholders(text),
            StoreQuery::Filter { predicate, .. } => find_placeholders(&predicate.to_string()),
        }
    }

    fn to_wire(&self) -> serde_json::Value {
        match self {
            StoreQuery::Text(text) => serde_json::Value::String(text.clone()),
            StoreQuery::Filter {
                collection,
                predicate,
            } => serde_json::json!({ "collection": collection, "filter": predicate }),
        }
    }
}

impl fmt::Display for StoreQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreQuery::Text(text) => write!(f, "{}", text),
            StoreQuery::Filter {
                collection,
                predicate,
            } => write!(f, "{}.find({})", collection, predicate),
        }
    }
}

/// A reference to an earlier stage's output column, written in queries as
/// `{previous_stage<N>.<key>}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderRef {
    pub stage: u32,
    pub key: String,
}

impl PlaceholderRef {
    pub fn token(&self) -> String {
        placeholder(self.stage, &self.key)
    }
}

pub fn placeholder(stage: u32, key: &str) -> String {
    format!("{{previous_stage{}.{}}}", stage, key)
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{previous_stage(\d+)\.([^{}\s]+)\}").expect("placeholder pattern is valid")
    })
}

fn placeholder_ref(caps: &regex::Captures<'_>) -> Option<PlaceholderRef> {
    Some(PlaceholderRef {
        stage: caps[1].parse().ok()?,
        key: caps[2].to_string(),
    })
}

/// Replace every placeholder in `text` in one left-to-right pass. Tokens for
/// which `resolve` returns `None` stay as written, and replacement text is
/// never scanned again.
pub fn replace_placeholders(
    text: &str,
    mut resolve: impl FnMut(&PlaceholderRef) -> Option<String>,
) -> String {
    placeholder_regex()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            placeholder_ref(caps)
                .and_then(|reference| resolve(&reference))
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// The placeholder `text` consists of, if it is exactly one token.
pub fn whole_placeholder(text: &str) -> Option<PlaceholderRef> {
    let caps = placeholder_regex().captures(text)?;
    let token = caps.get(0)?;
    if token.start() != 0 || token.end() != text.len() {
        return None;
    }
    placeholder_ref(&caps)
}

pub fn find_placeholders(text: &str) -> Vec<PlaceholderRef> {
    placeholder_regex()
        .captures_iter(text)
        .filter_map(|caps| placeholder_ref(&caps))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub number: u32,
    pub store_kind: StoreKind,
    pub query: StoreQuery,
    pub output_keys: Vec<String>,
    pub description: String,
}

/// An ordered, structurally valid list of stages.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    stages: Vec<Stage>,
}

impl QueryPlan {
    /// Build a plan, checking that stage numbers start at 1 and strictly
    /// increase, that each query matches its store kind, and that
    /// placeholders only point at earlier stages.
    pub fn new(stages: Vec<Stage>) -> EngineResult<Self> {
        if stages.is_empty() {
            return Err(invalid("plan contains no stages"));
        }

        let mut previous = 0u32;
        for stage in &stages {
            if previous == 0 && stage.number != 1 {
                return Err(invalid(format!(
                    "first stage must be numbered 1, found {}",
                    stage.number
                )));
            }
            if stage.number <= previous {
                return Err(invalid(format!(
                    "stage numbers must strictly increase, found {} after {}",
                    stage.number, previous
                )));
            }
            if !stage.query.matches_kind(stage.store_kind) {
                return Err(invalid(format!(
                    "stage {} query shape does not match database '{}'",
                    stage.number, stage.store_kind
                )));
            }
            if let Some(bad) = stage
                .query
                .placeholders()
                .into_iter()
                .find(|p| p.stage >= stage.number)
            {
                return Err(invalid(format!(
                    "stage {} references {} which is not an earlier stage",
                    stage.number,
                    bad.token()
                )));
            }
            previous = stage.number;
        }

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Parse a plan from raw planner output.
    ///
    /// Tolerates Markdown code fences, prose around the JSON object and raw
    /// newlines or tabs inside string literals.
    pub fn from_planner_output(output: &str) -> EngineResult<Self> {
        let json = extract_json_object(output)
            .ok_or_else(|| invalid("generated plan was not valid JSON"))?;
        let wire: WirePlan = serde_json::from_str(&json)
            .map_err(|e| invalid(format!("generated plan was not valid JSON: {}", e)))?;

        let stages = wire
            .pipeline
            .into_iter()
            .map(WireStage::into_stage)
            .collect::<EngineResult<Vec<_>>>()?;
        Self::new(stages)
    }

    /// Render the plan in the wire format planners produce.
    pub fn to_wire_json(&self) -> serde_json::Value {
        let pipeline: Vec<serde_json::Value> = self
            .stages
            .iter()
            .map(|stage| {
                let mut query = serde_json::Map::new();
                query.insert(stage.store_kind.wire_name().to_string(), stage.query.to_wire());
                serde_json::json!({
                    "stage": stage.number,
                    "database": stage.store_kind,
                    "query": query,
                    "output_keys": stage.output_keys,
                    "description": stage.description,
                })
            })
            .collect();
        serde_json::json!({ "pipeline": pipeline })
    }
}

fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::PlanAcquisition(message.into())
}

fn extract_json_object(output: &str) -> Option<String> {
    let mut text = output.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the fence line, which may carry a language tag.
        text = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
        text = text.trim_end().trim_end_matches("```");
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let cleaned: String = text[start..=end]
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect();
    Some(cleaned)
}

#[derive(Debug, Deserialize)]
struct WirePlan {
    pipeline: Vec<WireStage>,
}

#[derive(Debug, Deserialize)]
struct WireStage {
    stage: u32,
    database: StoreKind,
    query: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    output_keys: Vec<String>,
    #[serde(default)]
    description: String,
}

impl WireStage {
    fn into_stage(mut self) -> EngineResult<Stage> {
        let raw = self.query.remove(self.database.wire_name()).ok_or_else(|| {
            invalid(format!(
                "stage {} has no '{}' entry in its query object",
                self.stage, self.database
            ))
        })?;

        let query = match (self.database, raw) {
            (StoreKind::Relational | StoreKind::Graph, serde_json::Value::String(text)) => {
                StoreQuery::Text(text.trim().to_string())
            }
            (StoreKind::Document, serde_json::Value::Object(mut object)) => {
                let collection = match object.remove("collection") {
                    Some(serde_json::Value::String(name)) if !name.is_empty() => name,
                    _ => {
                        return Err(invalid(format!(
                            "stage {} document query needs a 'collection' name",
                            self.stage
                        )))
                    }
                };
                let predicate = object
                    .remove("filter")
                    .unwrap_or_else(|| serde_json::json!({}));
                if !predicate.is_object() {
                    return Err(invalid(format!(
                        "stage {} document filter must be an object",
                        self.stage
                    )));
                }
                StoreQuery::Filter {
                    collection,
                    predicate,
                }
            }
            (kind, _) => {
                return Err(invalid(format!(
                    "stage {} query has the wrong shape for database '{}'",
                    self.stage, kind
                )))
            }
        };

        Ok(Stage {
            number: self.stage,
            store_kind: self.database,
            query,
            output_keys: self.output_keys,
            description: self.description,
        })
    }
}

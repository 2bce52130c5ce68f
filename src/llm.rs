//! Planner and summarizer backed by an OpenAI-compatible chat endpoint, plus
//! a planner that reads a plan from disk.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::controller::{Planner, Summarizer};
use crate::db::Row;
use crate::error::{EngineError, EngineResult};
use crate::pipeline::QueryPlan;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    /// File whose contents describe the store schemas to the planner.
    pub schema_path: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://api.openai.com/v1"),
            model: String::from("gpt-4"),
            api_key: String::new(),
            schema_path: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Minimal chat-completions client.
pub struct ChatClient {
    client: reqwest::Client,
    config: LlmConfig,
    schema: String,
}

impl ChatClient {
    pub fn new(config: LlmConfig) -> anyhow::Result<Self> {
        let schema = match &config.schema_path {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read schema file: {}", path.display()))?,
            None => String::new(),
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            schema,
        })
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage<'_>>,
        temperature: f64,
        max_tokens: u32,
    ) -> anyhow::Result<String> {
        let request = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .context("chat completion request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("chat API error ({}): {}", status, error_text);
        }

        let body: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat response")?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| anyhow::anyhow!("No choices in response"))
    }
}

#[async_trait]
impl Planner for ChatClient {
    async fn plan(&self, request: &str, feedback: Option<&str>) -> EngineResult<QueryPlan> {
        let prompt = planning_prompt(request, feedback, &self.schema);
        let content = self
            .complete(vec![ChatMessage { role: "user", content: prompt }], 0.3, 2000)
            .await
            .map_err(|e| {
                EngineError::PlanAcquisition(format!(
                    "Failed to parse natural language query: {:#}",
                    e
                ))
            })?;
        QueryPlan::from_planner_output(&content).inspect_err(|_| {
            tracing::error!(%content, "failed to parse planner response");
        })
    }
}

#[async_trait]
impl Summarizer for ChatClient {
    async fn summarize(&self, request: &str, rows: &[Row]) -> anyhow::Result<String> {
        let results = serde_json::to_string(rows)?;
        let messages = vec![
            ChatMessage {
                role: "system",
                content: "You are a helpful assistant that explains database query results \
                          in natural language."
                    .to_string(),
            },
            ChatMessage {
                role: "user",
                content: format!(
                    "Original question: {}\n\nQuery results: {}\n\n\
                     Please provide a clear, concise summary of these results in natural \
                     language. Format the response in a reader-friendly way.",
                    request, results
                ),
            },
        ];
        self.complete(messages, 0.7, 500).await
    }
}

const PLANNING_RULES: &str = r#"Convert the natural language query into a pipeline of database queries.
Results from one stage can feed later stages through placeholders of the form
{previous_stageN.key}, where N is an earlier stage number and key one of its output_keys.

GENERAL RULES:
1. Only use multiple stages to query across databases, to filter one database with
   results from another, or to join data that lives in different databases.
2. Never add a stage just to order or aggregate previous results.
3. When passing IDs between stages, always include them in output_keys.

POSTGRESQL RULES:
1. Prefer JOINs and CTEs; use GROUP BY, HAVING and window functions for statistics.
2. Qualify column names with meaningful table aliases (m.id, g.name).
3. Placeholders expand to a bare list, so write: WHERE m.id IN ({previous_stage1.id})

NEO4J RULES:
1. Use distinct variable names for every node and relationship.
2. Keep ORDER BY in the same MATCH query.
3. Placeholders expand to a bracketed list, so write: WHERE x.id IN {previous_stage1.ids}
   and never bind them with WITH.

MONGODB RULES:
1. The query is an object {"collection": "...", "filter": {...}}.
2. A placeholder used as a whole string value expands to a JSON array:
   {"movie_id": {"$in": "{previous_stage1.id}"}}

EXAMPLE:
"Find high-grossing movies directed by Christopher Nolan"
{"pipeline": [
  {"stage": 1, "database": "neo4j",
   "query": {"neo4j": "MATCH (p:Person {name: 'Christopher Nolan'})-[r:DIRECTED]->(m:Movie) RETURN m.id as id"},
   "output_keys": ["id"], "description": "Movies directed by Christopher Nolan"},
  {"stage": 2, "database": "postgresql",
   "query": {"postgresql": "SELECT m.id, m.title, m.gross FROM movies m WHERE m.id IN ({previous_stage1.id}) AND m.gross > 100000000 ORDER BY m.gross DESC"},
   "output_keys": ["id", "title", "gross"], "description": "High-grossing movies from the director"}
]}

Return ONLY a JSON object with a "pipeline" array. Each stage must have:
stage (number), database ("postgresql", "neo4j" or "mongodb"), query (object keyed by
the database name), output_keys (array of column names) and description (string)."#;

fn planning_prompt(request: &str, feedback: Option<&str>, schema: &str) -> String {
    let mut prompt = String::new();
    if let Some(feedback) = feedback {
        prompt.push_str("PREVIOUS ERROR FEEDBACK:\n");
        prompt.push_str(feedback);
        prompt.push_str("\n\nPlease fix any issues mentioned above in the generated query.\n\n");
    }
    prompt.push_str(PLANNING_RULES);
    if !schema.trim().is_empty() {
        prompt.push_str("\n\nDATABASE SCHEMA:\n");
        prompt.push_str(schema.trim());
    }
    prompt.push_str("\n\nNatural Language Query: ");
    prompt.push_str(request);
    prompt
}

/// Reads a prepared plan from a JSON file, ignoring the request text.
pub struct FilePlanner {
    path: PathBuf,
}

impl FilePlanner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Planner for FilePlanner {
    async fn plan(&self, _request: &str, _feedback: Option<&str>) -> EngineResult<QueryPlan> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            EngineError::PlanAcquisition(format!(
                "Failed to read plan file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        QueryPlan::from_planner_output(&content)
    }
}

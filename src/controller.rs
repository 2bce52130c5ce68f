//! Request-level orchestration: cache, planning, execution, retries.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::QueryCache;
use crate::db::Row;
use crate::error::{EngineError, EngineResult};
use crate::merge::merge_results;
use crate::pipeline::{PipelineExecutor, QueryPlan};

pub const MAX_RETRIES: usize = 3;

pub const SUMMARY_FALLBACK: &str =
    "Sorry, I couldn't generate a human-readable response for these results.";

/// Produces a query plan for a natural-language request.
#[async_trait]
pub trait Planner: Send + Sync {
    /// `feedback` describes why earlier plans for the same request failed.
    async fn plan(&self, request: &str, feedback: Option<&str>) -> EngineResult<QueryPlan>;
}

/// Describes result rows in natural language.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, request: &str, rows: &[Row]) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Join every stage's rows on these keys instead of returning the last
    /// stage's rows.
    pub merge_keys: Option<Vec<String>>,
    /// Hand the rows to the summarizer and return its description.
    pub human_readable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    Rows(Vec<Row>),
    Summary(String),
}

/// Answers requests by planning and running query pipelines, retrying with
/// feedback when a plan fails.
pub struct QueryAgent {
    planner: Arc<dyn Planner>,
    executor: PipelineExecutor,
    cache: Arc<QueryCache>,
    summarizer: Option<Arc<dyn Summarizer>>,
    max_retries: usize,
}

impl QueryAgent {
    pub fn new(
        planner: Arc<dyn Planner>,
        executor: PipelineExecutor,
        cache: Arc<QueryCache>,
    ) -> Self {
        Self {
            planner,
            executor,
            cache,
            summarizer: None,
            max_retries: MAX_RETRIES,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub async fn process(
        &self,
        request: &str,
        options: &RequestOptions,
    ) -> EngineResult<QueryResponse> {
        let rows = match self.cache.lookup(request) {
            Some(rows) => {
                tracing::info!("returning cached result");
                rows
            }
            None => {
                let rows = self.run_with_retries(request, options).await?;
                self.cache.store(request, rows.clone());
                rows
            }
        };

        if options.human_readable {
            return Ok(QueryResponse::Summary(self.summarize(request, &rows).await));
        }
        Ok(QueryResponse::Rows(rows))
    }

    /// Plan and execute until one attempt succeeds or `max_retries + 1`
    /// attempts have failed.
    async fn run_with_retries(
        &self,
        request: &str,
        options: &RequestOptions,
    ) -> EngineResult<Vec<Row>> {
        let attempts = self.max_retries + 1;
        let mut feedback = Feedback::default();
        let mut attempt = 1;

        loop {
            let result = self.attempt(request, feedback.text().as_deref(), options).await;
            let err = match result {
                Ok(rows) => return Ok(rows),
                Err(err) => err,
            };

            tracing::error!(attempt, error = %err, "error processing query");
            if attempt >= attempts {
                return Err(EngineError::RetriesExhausted {
                    attempts,
                    last: Box::new(err),
                });
            }

            feedback.push(attempt, &err);
            attempt += 1;
            tracing::info!(attempt, "retrying query");
        }
    }

    async fn attempt(
        &self,
        request: &str,
        feedback: Option<&str>,
        options: &RequestOptions,
    ) -> EngineResult<Vec<Row>> {
        let plan = self.planner.plan(request, feedback).await?;
        tracing::debug!(plan = %plan.to_wire_json(), "generated pipeline");

        let output = self.executor.run(&plan).await?;
        match &options.merge_keys {
            Some(keys) => Ok(merge_results(&output.named_results(), keys)),
            None => Ok(output.into_final_rows()),
        }
    }

    async fn summarize(&self, request: &str, rows: &[Row]) -> String {
        let Some(summarizer) = &self.summarizer else {
            return SUMMARY_FALLBACK.to_string();
        };
        match summarizer.summarize(request, rows).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!("error generating human response: {:#}", e);
                SUMMARY_FALLBACK.to_string()
            }
        }
    }
}

/// Accumulated description of failed attempts, handed to the planner.
#[derive(Debug, Default)]
struct Feedback {
    failures: Vec<String>,
}

impl Feedback {
    fn push(&mut self, attempt: usize, err: &EngineError) {
        self.failures
            .push(format!("Attempt {} failed with {}: {}", attempt, err.kind(), err));
    }

    fn text(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let mut text = self.failures.join("\n");
        text.push_str(
            "\nPlease fix the query and try again. Common issues to check:\n\
             - Ensure JSON formatting is correct\n\
             - Verify database names are correct ('postgresql', 'neo4j', 'mongodb')\n\
             - Check that all referenced columns exist\n\
             - Verify syntax for the specific database being queried",
        );
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AdapterRegistry, StoreAdapter, Value};
    use crate::pipeline::{Stage, StoreKind, StoreQuery};
    use crate::row;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Planner handing out scripted results and recording the feedback it saw.
    struct ScriptedPlanner {
        script: Mutex<VecDeque<EngineResult<QueryPlan>>>,
        fallback: fn() -> EngineResult<QueryPlan>,
        feedback_seen: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedPlanner {
        fn new(
            script: Vec<EngineResult<QueryPlan>>,
            fallback: fn() -> EngineResult<QueryPlan>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                feedback_seen: Mutex::new(vec![]),
            }
        }

        fn calls(&self) -> usize {
            self.feedback_seen.lock().len()
        }
    }

    #[async_trait]
    impl Planner for ScriptedPlanner {
        async fn plan(&self, _request: &str, feedback: Option<&str>) -> EngineResult<QueryPlan> {
            self.feedback_seen.lock().push(feedback.map(str::to_string));
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| (self.fallback)())
        }
    }

    struct TableAdapter;

    #[async_trait]
    impl StoreAdapter for TableAdapter {
        fn kind(&self) -> StoreKind {
            StoreKind::Relational
        }

        async fn execute(&self, query: &StoreQuery) -> EngineResult<Vec<Row>> {
            match query.to_string().as_str() {
                "SELECT id, x FROM a" => Ok(vec![
                    row! { "id" => 1i64, "x" => "a" },
                    row! { "id" => 2i64, "x" => "b" },
                ]),
                "SELECT id, y FROM b WHERE id IN (1, 2)" => Ok(vec![
                    row! { "id" => 2i64, "y" => "c" },
                    row! { "id" => 3i64, "y" => "d" },
                ]),
                other => Err(EngineError::adapter(
                    StoreKind::Relational,
                    format!("relation in {} does not exist", other),
                )),
            }
        }
    }

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        async fn summarize(&self, _request: &str, _rows: &[Row]) -> anyhow::Result<String> {
            anyhow::bail!("model unavailable")
        }
    }

    struct CountingSummarizer;

    #[async_trait]
    impl Summarizer for CountingSummarizer {
        async fn summarize(&self, _request: &str, rows: &[Row]) -> anyhow::Result<String> {
            Ok(format!("{} rows", rows.len()))
        }
    }

    fn sql_stage(number: u32, sql: &str, keys: &[&str]) -> Stage {
        Stage {
            number,
            store_kind: StoreKind::Relational,
            query: StoreQuery::text(sql),
            output_keys: keys.iter().map(|k| k.to_string()).collect(),
            description: String::new(),
        }
    }

    fn good_plan() -> EngineResult<QueryPlan> {
        QueryPlan::new(vec![
            sql_stage(1, "SELECT id, x FROM a", &["id"]),
            sql_stage(2, "SELECT id, y FROM b WHERE id IN ({previous_stage1.id})", &["id"]),
        ])
    }

    fn bad_plan() -> EngineResult<QueryPlan> {
        QueryPlan::new(vec![sql_stage(1, "SELECT * FROM nowhere", &[])])
    }

    fn unparseable() -> EngineResult<QueryPlan> {
        Err(EngineError::PlanAcquisition("Generated query was not valid JSON".into()))
    }

    fn agent(planner: Arc<ScriptedPlanner>) -> QueryAgent {
        let executor = PipelineExecutor::new(AdapterRegistry::new().with(Arc::new(TableAdapter)));
        QueryAgent::new(planner, executor, Arc::new(QueryCache::default()))
    }

    #[tokio::test]
    async fn test_returns_last_stage_rows() {
        let planner = Arc::new(ScriptedPlanner::new(vec![], good_plan));
        let response = agent(planner.clone())
            .process("q", &RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(
            response,
            QueryResponse::Rows(vec![
                row! { "id" => 2i64, "y" => "c" },
                row! { "id" => 3i64, "y" => "d" },
            ])
        );
        assert_eq!(planner.feedback_seen.lock()[0], None);
    }

    #[tokio::test]
    async fn test_merge_keys_join_stage_results() {
        let planner = Arc::new(ScriptedPlanner::new(vec![], good_plan));
        let options = RequestOptions {
            merge_keys: Some(vec!["id".into()]),
            ..Default::default()
        };
        let response = agent(planner).process("q", &options).await.unwrap();
        assert_eq!(
            response,
            QueryResponse::Rows(vec![row! { "id" => 2i64, "x" => "b", "y" => "c" }])
        );
    }

    #[tokio::test]
    async fn test_retry_ceiling_on_planner_failure() {
        let planner = Arc::new(ScriptedPlanner::new(vec![], unparseable));
        let err = agent(planner.clone())
            .process("q", &RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(planner.calls(), MAX_RETRIES + 1);
        match err {
            EngineError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, MAX_RETRIES + 1);
                assert!(matches!(*last, EngineError::PlanAcquisition(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_retry_ceiling_on_adapter_failure() {
        let planner = Arc::new(ScriptedPlanner::new(vec![], bad_plan));
        let err = agent(planner.clone())
            .with_max_retries(1)
            .process("q", &RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(planner.calls(), 2);
        assert!(err.to_string().contains("after 2 attempts"));
        assert!(err.to_string().contains("nowhere"));
    }

    #[tokio::test]
    async fn test_feedback_accumulates_and_recovers() {
        let planner = Arc::new(ScriptedPlanner::new(
            vec![unparseable(), bad_plan()],
            good_plan,
        ));
        let response = agent(planner.clone())
            .process("q", &RequestOptions::default())
            .await
            .unwrap();
        assert!(matches!(response, QueryResponse::Rows(ref rows) if rows.len() == 2));

        let seen = planner.feedback_seen.lock();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].is_none());
        let second = seen[1].as_deref().unwrap();
        assert!(second.contains("Attempt 1 failed with PlanAcquisitionError"));
        let third = seen[2].as_deref().unwrap();
        assert!(third.contains("Attempt 1 failed with PlanAcquisitionError"));
        assert!(third.contains("Attempt 2 failed with AdapterExecutionError"));
        assert!(third.contains("Common issues to check"));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_planner() {
        let planner = Arc::new(ScriptedPlanner::new(vec![], good_plan));
        let agent = agent(planner.clone());
        let first = agent.process("q", &RequestOptions::default()).await.unwrap();
        let second = agent.process("q", &RequestOptions::default()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(planner.calls(), 1);
        assert_eq!(agent.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_request_is_not_cached() {
        let planner = Arc::new(ScriptedPlanner::new(vec![], unparseable));
        let agent = agent(planner).with_max_retries(0);
        assert!(agent.process("q", &RequestOptions::default()).await.is_err());
        assert!(agent.cache().is_empty());
    }

    #[tokio::test]
    async fn test_summary_failure_degrades_to_fallback() {
        let planner = Arc::new(ScriptedPlanner::new(vec![], good_plan));
        let agent = agent(planner).with_summarizer(Arc::new(FailingSummarizer));
        let options = RequestOptions {
            human_readable: true,
            ..Default::default()
        };
        let response = agent.process("q", &options).await.unwrap();
        assert_eq!(response, QueryResponse::Summary(SUMMARY_FALLBACK.to_string()));
    }

    #[tokio::test]
    async fn test_summary_uses_summarizer() {
        let planner = Arc::new(ScriptedPlanner::new(vec![], good_plan));
        let agent = agent(planner).with_summarizer(Arc::new(CountingSummarizer));
        let options = RequestOptions {
            human_readable: true,
            ..Default::default()
        };
        let response = agent.process("q", &options).await.unwrap();
        assert_eq!(response, QueryResponse::Summary("2 rows".to_string()));
        // The raw rows are what gets cached.
        assert_eq!(
            agent.cache().lookup("q").unwrap()[0].get("y"),
            Some(&Value::from("c"))
        );
    }
}

use std::time::Instant;

use crate::db::{AdapterRegistry, Row};
use crate::error::{EngineError, EngineResult};
use crate::pipeline::plan::QueryPlan;
use crate::pipeline::substitute::{substitute, StageResultTable};

/// Rows produced by one stage, kept for merging.
#[derive(Debug, Clone, PartialEq)]
pub struct StageRows {
    pub stage: u32,
    pub rows: Vec<Row>,
}

impl StageRows {
    /// Name under which this stage's rows take part in a merge.
    pub fn name(&self) -> String {
        format!("stage_{}", self.stage)
    }
}

/// Everything a completed pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub stage_results: StageResultTable,
    pub stages: Vec<StageRows>,
}

impl PipelineOutput {
    /// Rows of the last executed stage: the pipeline's raw result.
    pub fn final_rows(&self) -> &[Row] {
        self.stages
            .last()
            .map(|s| s.rows.as_slice())
            .unwrap_or_default()
    }

    pub fn into_final_rows(mut self) -> Vec<Row> {
        self.stages.pop().map(|s| s.rows).unwrap_or_default()
    }

    /// `(stage_<N>, rows)` pairs in stage order.
    pub fn named_results(&self) -> Vec<(String, Vec<Row>)> {
        self.stages
            .iter()
            .map(|s| (s.name(), s.rows.clone()))
            .collect()
    }
}

/// Runs the stages of a plan one after another, threading each stage's
/// declared outputs into the queries of the stages after it.
#[derive(Clone)]
pub struct PipelineExecutor {
    adapters: AdapterRegistry,
}

impl PipelineExecutor {
    pub fn new(adapters: AdapterRegistry) -> Self {
        Self { adapters }
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// Execute every stage in order. The first failure aborts the run and
    /// discards whatever earlier stages produced.
    pub async fn run(&self, plan: &QueryPlan) -> EngineResult<PipelineOutput> {
        let mut table = StageResultTable::new();
        let mut stages = Vec::with_capacity(plan.len());

        for stage in plan.stages() {
            tracing::debug!(stage = stage.number, description = %stage.description, "substituting");
            let query = substitute(stage, &table).inspect_err(|e| {
                tracing::warn!(stage = stage.number, error = %e, "stage failed");
            })?;

            let adapter = self.adapters.get(stage.store_kind).ok_or_else(|| {
                EngineError::adapter(stage.store_kind, "no adapter configured for this store")
            })?;

            tracing::info!(
                stage = stage.number,
                store = %stage.store_kind,
                query = %query,
                "executing"
            );
            let start = Instant::now();
            let rows = adapter.execute(&query).await.inspect_err(|e| {
                tracing::warn!(stage = stage.number, error = %e, "stage failed");
            })?;

            table.record(stage.number, &rows, &stage.output_keys);
            tracing::debug!(
                stage = stage.number,
                rows = rows.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "recorded"
            );
            stages.push(StageRows {
                stage: stage.number,
                rows,
            });
        }

        tracing::debug!(stages = stages.len(), "pipeline done");
        Ok(PipelineOutput {
            stage_results: table,
            stages,
        })
    }
}

use thiserror::Error;

use crate::pipeline::StoreKind;

/// Failures raised while acquiring or running a query plan.
///
/// Every variant except [`EngineError::RetriesExhausted`] is recoverable at the
/// request level: the controller turns it into feedback and asks the planner
/// for a new plan.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The planner failed or produced output that is not a valid plan.
    #[error("plan acquisition failed: {0}")]
    PlanAcquisition(String),

    /// A stage query could not be rewritten into something executable.
    #[error("substitution failed in stage {stage}: {message}")]
    Substitution { stage: u32, message: String },

    /// The backing store rejected or failed the query.
    #[error("{store} execution failed: {message}")]
    AdapterExecution { store: StoreKind, message: String },

    /// Terminal failure once every attempt has been used.
    #[error("failed to process query after {attempts} attempts. Last error: {last}")]
    RetriesExhausted {
        attempts: usize,
        last: Box<EngineError>,
    },
}

impl EngineError {
    pub fn adapter(store: StoreKind, message: impl Into<String>) -> Self {
        EngineError::AdapterExecution {
            store,
            message: message.into(),
        }
    }

    /// Short label used when describing the failure back to the planner.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::PlanAcquisition(_) => "PlanAcquisitionError",
            EngineError::Substitution { .. } => "SubstitutionError",
            EngineError::AdapterExecution { .. } => "AdapterExecutionError",
            EngineError::RetriesExhausted { .. } => "RetriesExhausted",
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

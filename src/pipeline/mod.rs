//! The multi-stage query pipeline.
//!
//! ```text
//! QueryPlan (plan.rs)
//!       ↓   per stage, in order
//! Placeholder substitution (substitute.rs, format.rs)
//!       ↓
//! Store adapter (db/)
//!       ↓
//! Stage result table → next stage
//! ```

pub mod executor;
pub mod format;
pub mod plan;
pub mod substitute;

pub use executor::{PipelineExecutor, PipelineOutput, StageRows};
pub use format::{format_scalar, format_sequence};
pub use plan::{
    find_placeholders, placeholder, PlaceholderRef, QueryPlan, Stage, StoreKind, StoreQuery,
};
pub use substitute::{substitute, StageResultTable};

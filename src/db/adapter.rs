//! Store adapter traits for the pipeline executor.
//!
//! Each adapter runs a fully substituted query against one kind of backing
//! store and hands back row records. Adapters open their own connection for
//! every call and release it before returning.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::value::Row;
use crate::error::EngineResult;
use crate::pipeline::{StoreKind, StoreQuery};

#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// The store kind this adapter serves.
    fn kind(&self) -> StoreKind;

    /// Run one query. Store-level failures come back as
    /// [`EngineError::AdapterExecution`](crate::error::EngineError::AdapterExecution).
    async fn execute(&self, query: &StoreQuery) -> EngineResult<Vec<Row>>;
}

/// Adapters keyed by the store kind they serve.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<StoreKind, Arc<dyn StoreAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one for the same kind.
    pub fn register(&mut self, adapter: Arc<dyn StoreAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn with(mut self, adapter: Arc<dyn StoreAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, kind: StoreKind) -> Option<&Arc<dyn StoreAdapter>> {
        self.adapters.get(&kind)
    }

    pub fn kinds(&self) -> Vec<StoreKind> {
        let mut kinds: Vec<StoreKind> = self.adapters.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

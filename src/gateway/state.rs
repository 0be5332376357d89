use std::sync::Arc;

use crate::orchestrator::Orchestrator;
use crate::provider::{CompletionProvider, EmbeddingProvider};
use crate::store::ResultStore;

pub struct HandlerState<C, E, S>
where
    C: CompletionProvider,
    E: EmbeddingProvider,
    S: ResultStore,
{
    pub orchestrator: Arc<Orchestrator<C, E, S>>,

    pub results: Arc<S>,
}

impl<C, E, S> HandlerState<C, E, S>
where
    C: CompletionProvider,
    E: EmbeddingProvider,
    S: ResultStore,
{
    pub fn new(orchestrator: Arc<Orchestrator<C, E, S>>, results: Arc<S>) -> Self {
        Self {
            orchestrator,
            results,
        }
    }
}

// Derived Clone would bound C, E, S on Clone; only the Arcs are cloned.
impl<C, E, S> Clone for HandlerState<C, E, S>
where
    C: CompletionProvider,
    E: EmbeddingProvider,
    S: ResultStore,
{
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            results: Arc::clone(&self.results),
        }
    }
}

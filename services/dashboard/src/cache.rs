//! Materialized result set of the latest successful pull.

use aq_model::EnhancedResponse;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct Materialized {
    inner: RwLock<Vec<EnhancedResponse>>,
}

impl Materialized {
    pub fn new() -> Self {
        Materialized::default()
    }

    /// Replace the set with the latest pull result.
    pub async fn replace(&self, envelopes: Vec<EnhancedResponse>) {
        *self.inner.write().await = envelopes;
    }

    /// Snapshot of the current set.
    pub async fn snapshot(&self) -> Vec<EnhancedResponse> {
        self.inner.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

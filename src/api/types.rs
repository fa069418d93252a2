//! Shared types for the API layer.

use std::sync::Arc;

use crate::core_state::CoreState;

use super::error::ApiError;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }

    /// Run a blocking `CoreState` operation on the blocking pool.
    pub async fn blocking<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&CoreState) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let core = Arc::clone(&self.core);
        tokio::task::spawn_blocking(move || op(&core)).await?
    }
}

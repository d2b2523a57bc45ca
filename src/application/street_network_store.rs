// Shared handle to the street network of the current dataset load
use crate::domain::error::LoadError;
use crate::domain::street::StreetNetwork;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Empty until the geometry source has been applied.
#[derive(Clone, Default)]
pub struct StreetNetworkStore {
    inner: Arc<RwLock<Option<Arc<StreetNetwork>>>>,
}

impl StreetNetworkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, network: StreetNetwork) {
        tracing::info!("Street network ready with {} segments", network.len());
        *self.inner.write().await = Some(Arc::new(network));
    }

    /// The loaded network, or `EmptyNetwork` when nothing usable is loaded.
    pub async fn current(&self) -> Result<Arc<StreetNetwork>, LoadError> {
        match self.inner.read().await.as_ref() {
            Some(network) if !network.is_empty() => Ok(network.clone()),
            _ => Err(LoadError::EmptyNetwork),
        }
    }
}

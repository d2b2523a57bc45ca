// Load errors surfaced to the caller of a render pass
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// A page request for one datastream failed; the whole load is aborted.
    #[error("fetch failed for datastream {datastream}: {reason}")]
    Fetch { datastream: String, reason: String },

    /// Rejected before any network call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Street geometry is missing or has no segments yet.
    #[error("street network is not loaded")]
    EmptyNetwork,
}

impl LoadError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

use redesign_core::StoreError;
use thiserror::Error;

use crate::jobs::JobStoreError;

#[derive(Debug, Error)]
pub enum RedesignError {
    #[error("resource '{resource_id}' not found")]
    NotFound { resource_id: String },

    /// The generated recommendation could not be decoded. `raw` is the payload as received.
    #[error("generated recommendation has a bad format: {source}")]
    BadFormat {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode prompt: {0}")]
    Prompt(serde_json::Error),

    #[error("analytics error: {0}")]
    Analytics(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Job(#[from] JobStoreError),
}

pub type Result<T> = std::result::Result<T, RedesignError>;

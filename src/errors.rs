//! Typed error hierarchy for the board stores.
//!
//! `BoardError` covers every failure a store operation can surface. The HTTP
//! layer maps each variant onto a status code in `board::api::ApiError`.

use thiserror::Error;

/// Errors from the task store, upgrade store and suggestion flows.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Task {id} not found")]
    TaskNotFound { id: String },

    #[error("Upgrade {id} not found")]
    UpgradeNotFound { id: String },

    /// The text-generation credential is missing or still the placeholder.
    #[error("{0}")]
    Configuration(String),

    #[error(
        "Maximum active upgrades ({max}) reached. Complete or cancel existing upgrades first."
    )]
    Capacity { max: usize },

    /// The text-generation service failed or returned unusable content.
    #[error("{0}")]
    ExternalService(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Failed to write {path}: {source}")]
    Storage {
        path: std::path::PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BoardError {
    pub fn task_not_found(id: &str) -> Self {
        Self::TaskNotFound { id: id.to_string() }
    }

    pub fn upgrade_not_found(id: &str) -> Self {
        Self::UpgradeNotFound { id: id.to_string() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TaskNotFound { .. } | Self::UpgradeNotFound { .. })
    }
}

pub type BoardResult<T> = Result<T, BoardError>;

//! Error types for the case workflow engine.

use crate::models::{CaseId, Department};
use crate::state_machine::Stage;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaseTrackError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Case not found: {0}")]
    CaseNotFound(CaseId),

    #[error("Audit log error for case {case_id}: {reason}")]
    Audit { case_id: CaseId, reason: String },

    #[error("Operation '{operation}' is not supported for {department} cases")]
    InvalidDepartment {
        operation: &'static str,
        department: Department,
    },

    #[error("Stage {0} has no tag form and cannot be assigned")]
    UntaggableStage(Stage),

    #[error("Gave up on case {case_id} after {attempts} conflicting writes")]
    ConflictRetriesExhausted { case_id: CaseId, attempts: u32 },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Event error: {0}")]
    Event(String),

    #[error("Statistics engine error: {0}")]
    Stats(String),
}

impl From<config::ConfigError> for CaseTrackError {
    fn from(err: config::ConfigError) -> Self {
        CaseTrackError::Configuration(err.to_string())
    }
}

impl From<crate::events::PublishError> for CaseTrackError {
    fn from(err: crate::events::PublishError) -> Self {
        CaseTrackError::Event(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CaseTrackError>;

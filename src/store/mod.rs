//! # Case Store Seam
//!
//! The document store holding case records is an external collaborator. This module
//! defines the async traits the engine consumes, the change-feed event shape, and an
//! in-memory implementation used by tests and embedders.
//!
//! Writers replace a case's tag list wholesale. Whether concurrent writers may
//! silently overwrite each other is decided by [`WriteMode`]; see [`TagWriter`].

pub mod memory;
pub mod writer;

use crate::models::{AuditEntry, Case, CaseId, Department};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

pub use memory::{InMemoryAuditLog, InMemoryCaseStore};
pub use writer::{TagWriter, WriteMode, WriteOutcome};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Case {0} does not exist")]
    NotFound(CaseId),

    #[error("Concurrent modification of case {case_id}: expected version {expected}, found {actual}")]
    VersionConflict {
        case_id: CaseId,
        expected: u64,
        actual: u64,
    },

    #[error("Store backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Query filter for [`CaseStore::query`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseFilter {
    pub include_archived: bool,
    pub department: Option<Department>,
    /// Only cases carrying at least one tag with this prefix
    pub tag_prefix: Option<String>,
}

impl CaseFilter {
    /// Every non-archived case
    pub fn live() -> Self {
        Self::default()
    }

    pub fn with_department(mut self, department: Department) -> Self {
        self.department = Some(department);
        self
    }

    pub fn with_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tag_prefix = Some(prefix.into());
        self
    }

    pub fn matches(&self, case: &Case) -> bool {
        if case.archived && !self.include_archived {
            return false;
        }
        if let Some(department) = self.department {
            if case.department != department {
                return false;
            }
        }
        match &self.tag_prefix {
            Some(prefix) => case.tags.iter().any(|t| t.starts_with(prefix.as_str())),
            None => true,
        }
    }
}

/// Wholesale tag replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagUpdate {
    pub tags: Vec<String>,
    /// When set, the store rejects the write unless the stored version matches
    pub expected_version: Option<u64>,
}

impl TagUpdate {
    pub fn unconditional(tags: Vec<String>) -> Self {
        Self {
            tags,
            expected_version: None,
        }
    }

    pub fn if_version(tags: Vec<String>, version: u64) -> Self {
        Self {
            tags,
            expected_version: Some(version),
        }
    }
}

/// Change-feed event
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Upserted(Case),
    Deleted(CaseId),
}

/// Authoritative case record holder
#[async_trait]
pub trait CaseStore: Send + Sync {
    async fn query(&self, filter: &CaseFilter) -> StoreResult<Vec<Case>>;

    async fn get(&self, id: &CaseId) -> StoreResult<Option<Case>>;

    /// Replace the tag list of a case, returning the stored record
    async fn update(&self, id: &CaseId, update: TagUpdate) -> StoreResult<Case>;

    async fn delete(&self, id: &CaseId) -> StoreResult<()>;

    /// Subscribe to the change feed. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Append-only audit sink
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, case_id: &CaseId, text: &str) -> StoreResult<AuditEntry>;

    async fn entries_for(&self, case_id: &CaseId) -> StoreResult<Vec<AuditEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn case(department: Department, tags: &[&str]) -> Case {
        let mut case = Case::new("c", "1", department, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        case.tags = tags.iter().map(|t| t.to_string()).collect();
        case
    }

    #[test]
    fn test_live_filter_skips_archived() {
        let mut archived = case(Department::Digital, &[]);
        archived.archived = true;
        assert!(!CaseFilter::live().matches(&archived));
        assert!(CaseFilter { include_archived: true, ..Default::default() }.matches(&archived));
    }

    #[test]
    fn test_filter_by_department_and_tag_prefix() {
        let filter = CaseFilter::live()
            .with_department(Department::Metal)
            .with_tag_prefix("stats-exclude");

        assert!(filter.matches(&case(Department::Metal, &["stats-exclude:all"])));
        assert!(!filter.matches(&case(Department::Metal, &["rush"])));
        assert!(!filter.matches(&case(Department::Digital, &["stats-exclude"])));
    }
}

//! # Case Model
//!
//! A case is a manufactured work order moving through a department-specific
//! fabrication workflow. Workflow state lives in the denormalized `tags` list; see
//! [`CaseTags`](super::CaseTags) for the typed view.
//!
//! Cases are created by an external intake process with a department and due date and
//! no tags. Archival and deletion are handled by external collaborators; both remove a
//! case from the live view this crate operates over.

use super::tags::CaseTags;
use crate::constants::sentinel::UPDATE_CASE_NUMBER;
use crate::state_machine::Stage;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned case identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(String);

impl CaseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CaseId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CaseId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Department owning a case; determines workflow rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Department {
    Digital,
    Metal,
    #[serde(rename = "C&B")]
    CrownAndBridge,
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Digital => write!(f, "Digital"),
            Self::Metal => write!(f, "Metal"),
            Self::CrownAndBridge => write!(f, "C&B"),
        }
    }
}

impl std::str::FromStr for Department {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Digital" => Ok(Self::Digital),
            "Metal" => Ok(Self::Metal),
            "C&B" => Ok(Self::CrownAndBridge),
            _ => Err(format!("Invalid department: {s}")),
        }
    }
}

/// A work order record as held by the case store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: CaseId,
    pub case_number: String,
    pub department: Department,
    pub due: NaiveDate,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: bool,
    #[serde(default)]
    pub archived: bool,
    /// Explicit stage hint for departments without tag-based stage rules
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Store-managed write counter, bumped on every update
    #[serde(default)]
    pub version: u64,
}

impl Case {
    /// Create a fresh case the way intake does: no tags, not completed
    pub fn new(
        id: impl Into<CaseId>,
        case_number: impl Into<String>,
        department: Department,
        due: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            case_number: case_number.into(),
            department,
            due,
            created_at: Utc::now(),
            completed: false,
            priority: false,
            archived: false,
            stage: None,
            tags: Vec::new(),
            version: 0,
        }
    }

    /// Typed view over the tag list
    pub fn flags(&self) -> CaseTags {
        CaseTags::parse(&self.tags)
    }

    /// Whether this record is the application-update sentinel rather than real work
    pub fn is_update_sentinel(&self) -> bool {
        is_update_sentinel_number(&self.case_number)
    }

    pub fn is_rush(&self) -> bool {
        self.flags().rush
    }

    pub fn is_on_hold(&self) -> bool {
        self.flags().hold
    }

    /// Metal-only second stage flag
    pub fn is_stage2(&self) -> bool {
        self.department == Department::Metal && self.flags().stage2
    }
}

/// `caseNumber` normalization used to detect sentinel records
pub fn is_update_sentinel_number(case_number: &str) -> bool {
    case_number.trim().eq_ignore_ascii_case(UPDATE_CASE_NUMBER)
}

use super::case::CaseId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only record of a tag mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: Uuid,
    pub case_id: CaseId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(case_id: CaseId, text: impl Into<String>) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            case_id,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

//! Application-update notices carried by sentinel case records.
//!
//! A record whose `caseNumber` normalizes to `update` is not real work. Its tags are
//! `[priority-level, free-form-notes...]`.

use super::case::Case;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticePriority {
    Low,
    Normal,
    High,
    Critical,
}

impl NoticePriority {
    /// Lenient parse; unknown levels read as `Normal`
    pub fn parse(level: &str) -> Self {
        match level.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" | "important" => Self::High,
            "critical" | "urgent" => Self::Critical,
            _ => Self::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateNotice {
    pub priority: NoticePriority,
    pub notes: String,
    pub received_at: DateTime<Utc>,
}

impl UpdateNotice {
    /// Extract a notice from a sentinel record, or `None` if the record is real work
    pub fn from_sentinel(case: &Case) -> Option<Self> {
        if !case.is_update_sentinel() {
            return None;
        }

        let mut tags = case.tags.iter();
        let priority = tags
            .next()
            .map(|level| NoticePriority::parse(level))
            .unwrap_or(NoticePriority::Normal);
        let notes = tags.map(String::as_str).collect::<Vec<_>>().join("\n");

        Some(Self {
            priority,
            notes,
            received_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Department;
    use chrono::NaiveDate;

    fn sentinel(tags: &[&str]) -> Case {
        let mut case = Case::new(
            "s1",
            " Update ",
            Department::Digital,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        case.tags = tags.iter().map(|t| t.to_string()).collect();
        case
    }

    #[test]
    fn test_parses_priority_and_notes() {
        let notice = UpdateNotice::from_sentinel(&sentinel(&["high", "Reload to get v2.3"])).unwrap();
        assert_eq!(notice.priority, NoticePriority::High);
        assert_eq!(notice.notes, "Reload to get v2.3");
    }

    #[test]
    fn test_missing_tags_default_to_normal_and_empty_notes() {
        let notice = UpdateNotice::from_sentinel(&sentinel(&[])).unwrap();
        assert_eq!(notice.priority, NoticePriority::Normal);
        assert!(notice.notes.is_empty());
    }

    #[test]
    fn test_real_case_is_not_a_notice() {
        let mut case = sentinel(&["high"]);
        case.case_number = "4411".into();
        assert!(UpdateNotice::from_sentinel(&case).is_none());
    }
}

//! # Data Models
//!
//! Case records, their typed tag view, audit entries, externally computed stage
//! statistics and sentinel update notices.

pub mod audit;
pub mod case;
pub mod stage_stats;
pub mod tags;
pub mod update_notice;

pub use audit::AuditEntry;
pub use case::{is_update_sentinel_number, Case, CaseId, Department};
pub use stage_stats::{
    format_time_in_stage, CaseDetail, EfficiencyScore, ExcludedCase, StageStatistics,
    StatsOutcome,
};
pub use tags::{CaseTags, ExclusionTags, Modifier};
pub use update_notice::{NoticePriority, UpdateNotice};

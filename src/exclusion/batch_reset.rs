//! # Batch Exclusion Reset
//!
//! Scoped bulk removal of manual exclusion tags.
//!
//! - Stage scope removes `stats-exclude:<stage>`, legacy `stats-exclude-<stage>` and
//!   the bare `stats-exclude` tag. `stats-exclude:all` is never removed by a stage
//!   reset, and the bare tag survives on cases that also carry it. Reason tags are
//!   shared between exclusions and are dropped only once no exclusion tag remains.
//! - All scope removes the whole `stats-exclude*` family, reasons included.
//!
//! Automatic (outlier) exclusions are not tag-based and are untouched either way. A
//! stage reset keeps the manual-inclusion override annotation for the same reason.
//!
//! Cases are written one at a time. A failing case is recorded in the report and the
//! batch moves on; earlier writes are not rolled back.

use crate::constants::{audit, events, tags::STATS_EXCLUDE};
use crate::error::Result;
use crate::events::EventPublisher;
use crate::models::{Case, CaseId, CaseTags};
use crate::state_machine::Stage;
use crate::store::writer::Planned;
use crate::store::{AuditLog, CaseFilter, TagWriter};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetScope {
    Stage(Stage),
    All,
}

impl fmt::Display for ResetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stage(stage) => write!(f, "stage:{stage}"),
            Self::All => write!(f, "all"),
        }
    }
}

impl ResetScope {
    fn audit_text(&self) -> String {
        match self {
            Self::Stage(stage) => {
                format!("Statistics exclusions reset for {} stage", stage.display_name())
            }
            Self::All => "All statistics exclusions reset".to_string(),
        }
    }
}

/// New tag list after a reset, or `None` when the reset does not touch the case
pub fn plan_reset(tags: &[String], scope: ResetScope) -> Option<Vec<String>> {
    let mut parsed = CaseTags::parse(tags);
    let before = parsed.exclusion.clone();
    let exclusion = &mut parsed.exclusion;

    match scope {
        ResetScope::Stage(stage) => {
            exclusion.scoped.retain(|s| s != stage.as_str());
            exclusion.legacy.retain(|s| s != stage.as_str());
            if !exclusion.all {
                exclusion.bare = false;
            }
            if !exclusion.has_any_exclusion() {
                exclusion
                    .reasons
                    .retain(|r| r == audit::OVERRIDE_AUTOMATIC_EXCLUSION);
            }
        }
        ResetScope::All => exclusion.clear(),
    }

    if parsed.exclusion == before {
        None
    } else {
        Some(parsed.to_tags())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetFailure {
    pub case_id: CaseId,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResetReport {
    pub scope: ResetScope,
    pub examined: usize,
    pub modified: Vec<CaseId>,
    pub failures: Vec<ResetFailure>,
}

impl BatchResetReport {
    fn new(scope: ResetScope) -> Self {
        Self {
            scope,
            examined: 0,
            modified: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Whether every targeted case was written
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct BatchResetService {
    writer: TagWriter,
    audit_log: Arc<dyn AuditLog>,
    event_publisher: EventPublisher,
    record_audit: bool,
}

impl BatchResetService {
    pub fn new(
        writer: TagWriter,
        audit_log: Arc<dyn AuditLog>,
        event_publisher: EventPublisher,
        record_audit: bool,
    ) -> Self {
        Self {
            writer,
            audit_log,
            event_publisher,
            record_audit,
        }
    }

    pub async fn reset_exclusions(&self, scope: ResetScope) -> Result<BatchResetReport> {
        let filter = CaseFilter::live().with_tag_prefix(STATS_EXCLUDE);
        let cases = self.writer.store().query(&filter).await?;

        let mut report = BatchResetReport::new(scope);
        report.examined = cases.len();
        info!(scope = %scope, candidates = cases.len(), "Starting exclusion reset");

        for case in cases {
            let case_id = case.id.clone();
            match self.reset_one(case, scope).await {
                Ok(true) => report.modified.push(case_id),
                Ok(false) => {}
                Err(e) => {
                    warn!(case_id = %case_id, scope = %scope, error = %e, "Exclusion reset failed for case, continuing");
                    report.failures.push(ResetFailure {
                        case_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            scope = %scope,
            modified = report.modified.len(),
            failed = report.failures.len(),
            "Exclusion reset finished"
        );
        self.event_publisher
            .publish(
                events::EXCLUSIONS_RESET,
                None,
                json!({
                    "scope": scope,
                    "modified": report.modified.len(),
                    "failed": report.failures.len(),
                }),
            )
            .await?;

        Ok(report)
    }

    async fn reset_one(&self, case: Case, scope: ResetScope) -> Result<bool> {
        let outcome = self
            .writer
            .mutate_from(case, |current: &Case| {
                Ok(match plan_reset(&current.tags, scope) {
                    Some(tags) => Planned::Write(tags, ()),
                    None => Planned::Unchanged(()),
                })
            })
            .await?;

        if outcome.written && self.record_audit {
            // The write already happened; a lost audit line is logged, not fatal
            if let Err(e) = self.audit_log.record(&outcome.case.id, &scope.audit_text()).await {
                error!(case_id = %outcome.case.id, error = %e, "Reset written but audit entry failed");
            }
        }

        Ok(outcome.written)
    }
}

//! # Exclusion Policy
//!
//! Decides whether a case is excluded from stage-duration statistics and applies manual
//! exclusion changes.
//!
//! Manual exclusions are tag-based (`stats-exclude`, `stats-exclude:all`,
//! `stats-exclude:<stage>`, legacy `stats-exclude-<stage>`). Automatic exclusions are
//! computed by the external statistics engine from outlier detection and never appear
//! in tags; the only way to override one is an explicit inclusion annotation written as
//! a reason tag.
//!
//! The bare `stats-exclude` tag stores no stage identity, so it excludes the case from
//! every stage.

use crate::constants::{audit, events, tags::STATS_EXCLUDE};
use crate::error::{CaseTrackError, Result};
use crate::events::EventPublisher;
use crate::logging::log_case_operation;
use crate::models::{AuditEntry, Case, CaseId, CaseTags, ExclusionTags};
use crate::state_machine::Stage;
use crate::store::writer::Planned;
use crate::store::{AuditLog, CaseFilter, TagWriter};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{error, warn};

use super::reconciler::{ExclusionCategory, ManualExclusion};

/// Exclusion predicates in evaluation order; a case is excluded when any rule matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionRule {
    /// Bare `stats-exclude`, regardless of stage
    BareTag,
    /// `stats-exclude:all`
    AllStages,
    /// `stats-exclude:<stage>` for the requested stage
    StageScoped,
    /// Legacy `stats-exclude-<stage>` for the requested stage
    LegacyStage,
    /// Bare tag with no `stats-exclude:*` companion; fires for any stage
    BareWithoutScope,
}

pub const EXCLUSION_RULES: [ExclusionRule; 5] = [
    ExclusionRule::BareTag,
    ExclusionRule::AllStages,
    ExclusionRule::StageScoped,
    ExclusionRule::LegacyStage,
    ExclusionRule::BareWithoutScope,
];

impl ExclusionRule {
    pub fn matches(&self, tags: &ExclusionTags, stage: Option<Stage>) -> bool {
        match self {
            Self::BareTag => tags.bare,
            Self::AllStages => tags.all,
            Self::StageScoped => stage.is_some_and(|s| tags.excludes_stage(s)),
            Self::LegacyStage => stage.is_some_and(|s| tags.legacy_excludes_stage(s)),
            Self::BareWithoutScope => tags.bare && !tags.has_any_scoped(),
        }
    }
}

/// First rule excluding the tag set for `stage`, if any
pub fn matching_rule(tags: &ExclusionTags, stage: Option<Stage>) -> Option<ExclusionRule> {
    EXCLUSION_RULES
        .into_iter()
        .find(|rule| rule.matches(tags, stage))
}

/// Whether a raw tag list excludes the case from statistics for `stage`
pub fn is_excluded<S: AsRef<str>>(tags: &[S], stage: Option<Stage>) -> bool {
    matching_rule(&CaseTags::parse(tags).exclusion, stage).is_some()
}

/// Text of the first `stats-exclude-reason:` tag
pub fn get_exclusion_reason<S: AsRef<str>>(tags: &[S]) -> Option<String> {
    CaseTags::parse(tags).exclusion.reason().map(str::to_string)
}

/// Manual exclusion category of a tag set for `stage`, if manually excluded
pub fn manual_category(tags: &ExclusionTags, stage: Option<Stage>) -> Option<ExclusionCategory> {
    matching_rule(tags, stage)?;
    if tags.all {
        Some(ExclusionCategory::ManualAll)
    } else {
        Some(ExclusionCategory::ManualStage)
    }
}

/// Scope of a manual exclusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionScope {
    All,
    Stage(Stage),
}

impl fmt::Display for ExclusionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Stage(stage) => write!(f, "{stage}"),
        }
    }
}

/// Requested exclusion change for one case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionChange {
    Exclude {
        scope: ExclusionScope,
        reason: Option<String>,
    },
    /// Remove manual exclusion. When the case is currently excluded automatically, an
    /// override annotation is written so the statistics engine honors the inclusion.
    Include { override_automatic: bool },
}

impl ExclusionChange {
    pub fn exclude(scope: ExclusionScope, reason: Option<&str>) -> Self {
        Self::Exclude {
            scope,
            reason: reason.map(str::to_string),
        }
    }

    pub fn include() -> Self {
        Self::Include {
            override_automatic: false,
        }
    }

    pub fn include_overriding_automatic() -> Self {
        Self::Include {
            override_automatic: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionPlan {
    pub tags: Vec<String>,
    pub audit_text: String,
}

/// Compute the new tag set and audit text for an exclusion change
pub fn plan_exclusion_change(tags: &[String], change: &ExclusionChange) -> ExclusionPlan {
    let mut parsed = CaseTags::parse(tags);
    let exclusion = &mut parsed.exclusion;

    let audit_text = match change {
        ExclusionChange::Exclude { scope, reason } => {
            match scope {
                ExclusionScope::All => exclusion.all = true,
                ExclusionScope::Stage(stage) => {
                    if !exclusion.excludes_stage(*stage) {
                        exclusion.scoped.push(stage.as_str().to_string());
                    }
                }
            }
            exclusion
                .reasons
                .retain(|r| r != audit::OVERRIDE_AUTOMATIC_EXCLUSION);

            let reason = reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
            if let Some(reason) = reason {
                exclusion.reasons = vec![reason.to_string()];
            }

            let target = match scope {
                ExclusionScope::All => "Excluded from statistics for all stages".to_string(),
                ExclusionScope::Stage(stage) => {
                    format!("Excluded from {} stage statistics", stage.display_name())
                }
            };
            match reason {
                Some(reason) => format!("{target} (reason: {reason})"),
                None => target,
            }
        }
        ExclusionChange::Include { override_automatic } => {
            exclusion.clear();
            if *override_automatic {
                exclusion.reasons.push(audit::OVERRIDE_AUTOMATIC_EXCLUSION.to_string());
                "Included in statistics (override automatic exclusion)".to_string()
            } else {
                "Included in statistics".to_string()
            }
        }
    };

    ExclusionPlan {
        tags: parsed.to_tags(),
        audit_text,
    }
}

/// Result of an applied exclusion change
#[derive(Debug, Clone)]
pub struct ExclusionToggle {
    pub case: Case,
    pub audit: AuditEntry,
}

/// Applies manual exclusion changes and lists manually excluded cases
pub struct ExclusionPolicy {
    writer: TagWriter,
    audit_log: Arc<dyn AuditLog>,
    event_publisher: EventPublisher,
}

impl ExclusionPolicy {
    pub fn new(writer: TagWriter, audit_log: Arc<dyn AuditLog>, event_publisher: EventPublisher) -> Self {
        Self {
            writer,
            audit_log,
            event_publisher,
        }
    }

    pub async fn toggle_exclusion(&self, case_id: &CaseId, change: ExclusionChange) -> Result<ExclusionToggle> {
        let outcome = self
            .writer
            .mutate(case_id, |case: &Case| {
                if case.flags().is_ambiguous() {
                    warn!(case_id = %case.id, tags = ?case.tags, "Ambiguous tag state before exclusion change");
                }
                let plan = plan_exclusion_change(&case.tags, &change);
                Ok(Planned::Write(plan.tags.clone(), plan))
            })
            .await
            .inspect_err(|e| {
                log_case_operation("toggle_exclusion", case_id, None, "failed", Some(&e.to_string()))
            })?;

        let plan = outcome.detail;
        let audit = self
            .audit_log
            .record(case_id, &plan.audit_text)
            .await
            .map_err(|e| {
                error!(case_id = %case_id, error = %e, "Tags written but audit entry failed");
                CaseTrackError::Audit {
                    case_id: case_id.clone(),
                    reason: e.to_string(),
                }
            })?;

        log_case_operation("toggle_exclusion", case_id, None, "ok", Some(&plan.audit_text));

        let (scope, reason, overriding) = match &change {
            ExclusionChange::Exclude { scope, reason } => (Some(scope.to_string()), reason.clone(), false),
            ExclusionChange::Include { override_automatic } => (None, None, *override_automatic),
        };
        self.event_publisher
            .publish(
                events::EXCLUSION_CHANGED,
                Some(case_id.clone()),
                json!({
                    "scope": scope,
                    "reason": reason,
                    "override_automatic": overriding,
                }),
            )
            .await?;

        Ok(ExclusionToggle {
            case: outcome.case,
            audit,
        })
    }

    /// Live cases manually excluded for `stage`, read straight from the store
    pub async fn manual_exclusions(&self, stage: Stage) -> Result<Vec<ManualExclusion>> {
        let filter = CaseFilter::live().with_tag_prefix(STATS_EXCLUDE);
        let cases = self.writer.store().query(&filter).await?;

        Ok(cases
            .into_iter()
            .filter_map(|case| {
                let tags = case.flags();
                let category = manual_category(&tags.exclusion, Some(stage))?;
                Some(ManualExclusion {
                    reason: tags.exclusion.reason().map(str::to_string),
                    id: case.id,
                    category,
                    time_in_stage: None,
                    tags: case.tags,
                })
            })
            .collect())
    }
}

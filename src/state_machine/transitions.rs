//! # Stage Transitions
//!
//! Applies stage moves to a case's tags and writes one audit entry per move.
//!
//! The conceptual graph is `design -> production -> finishing -> qc -> complete`, with
//! symmetric backward moves and a `design -> finishing` repair shortcut. The engine does
//! not forbid any move; legality is decided by the caller.
//!
//! A move removes every `stage-*` tag and, when a target is given, adds exactly one.
//! The write happens before the audit entry: a failed write leaves no audit trail.

use super::resolver::tagged_stage;
use super::states::Stage;
use crate::constants::{audit, events};
use crate::error::{CaseTrackError, Result};
use crate::events::EventPublisher;
use crate::logging::log_case_operation;
use crate::models::{AuditEntry, Case, CaseId, CaseTags, Department, Modifier};
use crate::store::writer::Planned;
use crate::store::{AuditLog, TagWriter};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Audit text rules for stage moves, evaluated in order; the first match wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAuditRule {
    /// Repair shortcut straight to finishing
    RepairShortcut,
    /// Any move into quality control
    EnterQc,
    /// Quality control sent back to finishing
    QcBackToFinishing,
    /// `Moved from {From} to {To} stage`
    Generic,
}

pub const STAGE_AUDIT_RULES: [StageAuditRule; 4] = [
    StageAuditRule::RepairShortcut,
    StageAuditRule::EnterQc,
    StageAuditRule::QcBackToFinishing,
    StageAuditRule::Generic,
];

impl StageAuditRule {
    pub fn applies(&self, from: Option<Stage>, to: Option<Stage>, is_repair: bool) -> bool {
        match self {
            Self::RepairShortcut => is_repair,
            Self::EnterQc => to == Some(Stage::Qc),
            Self::QcBackToFinishing => from == Some(Stage::Qc) && to == Some(Stage::Finishing),
            Self::Generic => true,
        }
    }

    pub fn text(&self, from: Option<Stage>, to: Option<Stage>) -> String {
        match self {
            Self::RepairShortcut => audit::REPAIR_SHORTCUT.to_string(),
            Self::EnterQc => audit::FINISHING_TO_QC.to_string(),
            Self::QcBackToFinishing => audit::QC_BACK_TO_FINISHING.to_string(),
            Self::Generic => format!(
                "Moved from {} to {} stage",
                from.map_or(audit::UNKNOWN_STAGE, |s| s.display_name()),
                to.map_or(audit::UNASSIGNED_STAGE, |s| s.display_name()),
            ),
        }
    }
}

/// Audit text for a stage move
pub fn stage_change_audit_text(from: Option<Stage>, to: Option<Stage>, is_repair: bool) -> String {
    STAGE_AUDIT_RULES
        .iter()
        .find(|rule| rule.applies(from, to, is_repair))
        .unwrap_or(&StageAuditRule::Generic)
        .text(from, to)
}

/// Tag and audit result of a stage move, computed without touching the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageChangePlan {
    pub tags: Vec<String>,
    pub from: Option<Stage>,
    pub to: Option<Stage>,
    pub audit_text: String,
}

/// Compute the new tag set and audit text for a stage move
pub fn plan_stage_change(
    tags: &[String],
    new_stage: Option<Stage>,
    is_repair: bool,
) -> Result<StageChangePlan> {
    if let Some(stage) = new_stage {
        if stage.tag().is_none() {
            return Err(CaseTrackError::UntaggableStage(stage));
        }
    }

    let mut parsed = CaseTags::parse(tags);
    let from = tagged_stage(&parsed);

    parsed.clear_stages();
    if let Some(stage) = new_stage {
        parsed.stages.push(stage);
    }

    Ok(StageChangePlan {
        tags: parsed.to_tags(),
        from,
        to: new_stage,
        audit_text: stage_change_audit_text(from, new_stage, is_repair),
    })
}

/// Result of an applied stage move
#[derive(Debug, Clone)]
pub struct StageTransition {
    pub case: Case,
    pub from: Option<Stage>,
    pub to: Option<Stage>,
    pub audit: AuditEntry,
}

/// Result of a modifier toggle
#[derive(Debug, Clone)]
pub struct ModifierToggle {
    pub case: Case,
    pub modifier: Modifier,
    pub enabled: bool,
    pub audit: AuditEntry,
}

/// Validates and applies stage moves and direct flag toggles
pub struct TransitionEngine {
    writer: TagWriter,
    audit_log: Arc<dyn AuditLog>,
    event_publisher: EventPublisher,
}

impl TransitionEngine {
    pub fn new(writer: TagWriter, audit_log: Arc<dyn AuditLog>, event_publisher: EventPublisher) -> Self {
        Self {
            writer,
            audit_log,
            event_publisher,
        }
    }

    /// Move a case to `new_stage` (or clear its stage with `None`)
    pub async fn change_stage(
        &self,
        case_id: &CaseId,
        new_stage: Option<Stage>,
        is_repair: bool,
    ) -> Result<StageTransition> {
        let outcome = self
            .writer
            .mutate(case_id, |case: &Case| {
                let plan = plan_stage_change(&case.tags, new_stage, is_repair)?;
                Ok(Planned::Write(plan.tags.clone(), plan))
            })
            .await
            .inspect_err(|e| {
                log_case_operation("change_stage", case_id, new_stage, "failed", Some(&e.to_string()))
            })?;

        let plan = outcome.detail;
        let audit = self.record_audit(case_id, &plan.audit_text).await?;

        log_case_operation("change_stage", case_id, new_stage, "ok", Some(&plan.audit_text));
        self.event_publisher
            .publish(
                events::STAGE_CHANGED,
                Some(case_id.clone()),
                json!({
                    "from": plan.from,
                    "to": plan.to,
                    "is_repair": is_repair,
                }),
            )
            .await?;

        Ok(StageTransition {
            case: outcome.case,
            from: plan.from,
            to: plan.to,
            audit,
        })
    }

    /// Repair shortcut: straight to finishing, bypassing production
    pub async fn send_for_repair(&self, case_id: &CaseId) -> Result<StageTransition> {
        self.change_stage(case_id, Some(Stage::Finishing), true).await
    }

    /// Flip the `stage2` tag of a Metal case. No audit entry is written.
    pub async fn toggle_stage2(&self, case_id: &CaseId) -> Result<Case> {
        let outcome = self
            .writer
            .mutate(case_id, |case: &Case| {
                if case.department != Department::Metal {
                    return Err(CaseTrackError::InvalidDepartment {
                        operation: "toggle_stage2",
                        department: case.department,
                    });
                }
                let mut tags = case.flags();
                tags.stage2 = !tags.stage2;
                let enabled = tags.stage2;
                Ok(Planned::Write(tags.to_tags(), enabled))
            })
            .await?;

        info!(case_id = %case_id, stage2 = outcome.detail, "Metal stage2 toggled");
        self.event_publisher
            .publish(
                events::STAGE2_TOGGLED,
                Some(case_id.clone()),
                json!({ "stage2": outcome.detail }),
            )
            .await?;

        Ok(outcome.case)
    }

    /// Flip a boolean modifier tag (`rush`, `hold`, `bbs`, `flex`)
    pub async fn toggle_modifier(&self, case_id: &CaseId, modifier: Modifier) -> Result<ModifierToggle> {
        let outcome = self
            .writer
            .mutate(case_id, |case: &Case| {
                let mut tags = case.flags();
                let enabled = !tags.modifier(modifier);
                tags.set_modifier(modifier, enabled);
                Ok(Planned::Write(tags.to_tags(), enabled))
            })
            .await?;

        let enabled = outcome.detail;
        let text = format!(
            "{} {}",
            modifier.display_name(),
            if enabled { "added" } else { "removed" }
        );
        let audit = self.record_audit(case_id, &text).await?;

        log_case_operation("toggle_modifier", case_id, None, "ok", Some(&text));
        self.event_publisher
            .publish(
                events::MODIFIER_TOGGLED,
                Some(case_id.clone()),
                json!({ "modifier": modifier, "enabled": enabled }),
            )
            .await?;

        Ok(ModifierToggle {
            case: outcome.case,
            modifier,
            enabled,
            audit,
        })
    }

    async fn record_audit(&self, case_id: &CaseId, text: &str) -> Result<AuditEntry> {
        self.audit_log.record(case_id, text).await.map_err(|e| {
            error!(case_id = %case_id, error = %e, "Tags written but audit entry failed");
            CaseTrackError::Audit {
                case_id: case_id.clone(),
                reason: e.to_string(),
            }
        })
    }
}

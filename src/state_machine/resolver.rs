//! Stage resolution from a case's tags and department.

use super::states::Stage;
use crate::models::{Case, CaseTags, Department};
use tracing::warn;

/// Digital `stage-*` precedence, highest first. When a case carries several stage
/// tags the first stage in this list wins.
pub const DIGITAL_STAGE_PRECEDENCE: [Stage; 4] =
    [Stage::Qc, Stage::Finishing, Stage::Production, Stage::Design];

/// Stage assumed for Digital cases without a recognized stage tag
pub const DIGITAL_DEFAULT_STAGE: Stage = Stage::Design;

/// Resolve the current stage of a case
pub fn get_stage(case: &Case) -> Stage {
    let tags = case.flags();
    if tags.is_ambiguous() {
        warn!(
            case_id = %case.id,
            tags = ?case.tags,
            "Ambiguous tag state, resolving by precedence"
        );
    }
    resolve_stage(case.department, &tags, case.stage)
}

/// Pure stage resolution over an already parsed tag set
pub fn resolve_stage(department: Department, tags: &CaseTags, stage_hint: Option<Stage>) -> Stage {
    match department {
        Department::Digital => digital_stage(tags),
        Department::Metal => {
            if tags.stage2 {
                Stage::Finishing
            } else {
                Stage::Development
            }
        }
        Department::CrownAndBridge => {
            let fallback = stage_hint.unwrap_or(Stage::Pending);
            warn!(
                department = %department,
                stage = %fallback,
                "No stage rules for department, using fallback"
            );
            fallback
        }
    }
}

/// Highest-precedence `stage-*` tag present, if any
pub fn tagged_stage(tags: &CaseTags) -> Option<Stage> {
    DIGITAL_STAGE_PRECEDENCE
        .into_iter()
        .find(|stage| tags.stages.contains(stage))
}

fn digital_stage(tags: &CaseTags) -> Stage {
    tagged_stage(tags).unwrap_or(DIGITAL_DEFAULT_STAGE)
}

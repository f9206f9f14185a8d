// Case workflow state machine
//
// Stage resolution from denormalized tags, and audited stage transitions including the
// repair shortcut and the quality-control sub-stage.

pub mod resolver;
pub mod states;
pub mod transitions;

pub use resolver::{get_stage, resolve_stage, tagged_stage, DIGITAL_STAGE_PRECEDENCE};
pub use states::Stage;
pub use transitions::{
    plan_stage_change, stage_change_audit_text, ModifierToggle, StageAuditRule, StageChangePlan,
    StageTransition, TransitionEngine, STAGE_AUDIT_RULES,
};

//! # Statistics Exclusion
//!
//! Policy for manual, legacy and automatic exclusion from stage-duration statistics,
//! reconciliation of the three exclusion data sources, and scoped bulk resets.

pub mod batch_reset;
pub mod policy;
pub mod reconciler;

pub use batch_reset::{plan_reset, BatchResetReport, BatchResetService, ResetFailure, ResetScope};
pub use policy::{
    get_exclusion_reason, is_excluded, manual_category, matching_rule, plan_exclusion_change,
    ExclusionChange, ExclusionPlan, ExclusionPolicy, ExclusionRule, ExclusionScope,
    ExclusionToggle, EXCLUSION_RULES,
};
pub use reconciler::{
    reconcile, ExcludedEntry, ExclusionCategory, ExclusionSource, ManualExclusion, ReconciledView,
};

//! # Tag Vocabulary and System Constants
//!
//! Wire-level strings shared with the document store and the external statistics
//! engine. These values are persisted in case tag sets and must stay bit-exact.

/// Tag wire format
pub mod tags {
    pub const STAGE_PREFIX: &str = "stage-";
    pub const STAGE2: &str = "stage2";
    pub const RUSH: &str = "rush";
    pub const HOLD: &str = "hold";
    pub const BBS: &str = "bbs";
    pub const FLEX: &str = "flex";

    /// Bare exclusion tag. Carries no stage identity.
    pub const STATS_EXCLUDE: &str = "stats-exclude";
    pub const STATS_EXCLUDE_ALL: &str = "stats-exclude:all";
    /// Prefix of `stats-exclude:<stage>`
    pub const STATS_EXCLUDE_SCOPED_PREFIX: &str = "stats-exclude:";
    /// Prefix of the legacy `stats-exclude-<stage>` form
    pub const STATS_EXCLUDE_LEGACY_PREFIX: &str = "stats-exclude-";
    pub const STATS_EXCLUDE_REASON_PREFIX: &str = "stats-exclude-reason:";

    /// Scope name used by `stats-exclude:all`
    pub const ALL_SCOPE: &str = "all";
}

/// Audit texts written on stage and exclusion changes
pub mod audit {
    pub const REPAIR_SHORTCUT: &str = "Sent for repair - moved directly to Finishing stage";
    pub const FINISHING_TO_QC: &str = "Moved from Finishing to Quality Control";
    pub const QC_BACK_TO_FINISHING: &str = "Moved from Quality Control back to Finishing stage";
    pub const UNKNOWN_STAGE: &str = "Unknown";
    pub const UNASSIGNED_STAGE: &str = "Unassigned";

    /// Reason written when a manual inclusion overrides an automatic (outlier) exclusion
    pub const OVERRIDE_AUTOMATIC_EXCLUSION: &str =
        "Manually included (override automatic exclusion)";
}

/// Reconciler reasons
pub mod reasons {
    pub const DATA_QUALITY_ISSUE: &str = "Data quality issue";
    pub const MANUALLY_EXCLUDED: &str = "Manually excluded";
}

/// Sentinel record convention
pub mod sentinel {
    /// `caseNumber` value (trimmed, case-insensitive) marking an application-update notice
    pub const UPDATE_CASE_NUMBER: &str = "update";
}

/// Workflow event names published on the event bus
pub mod events {
    pub const STAGE_CHANGED: &str = "case.stage_changed";
    pub const STAGE2_TOGGLED: &str = "case.stage2_toggled";
    pub const MODIFIER_TOGGLED: &str = "case.modifier_toggled";
    pub const EXCLUSION_CHANGED: &str = "case.exclusion_changed";
    pub const EXCLUSIONS_RESET: &str = "stats.exclusions_reset";
    pub const UPDATE_NOTICE_RECEIVED: &str = "system.update_notice_received";
}

/// Operational defaults
pub mod system {
    pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;
    pub const DEFAULT_CHANGE_FEED_CAPACITY: usize = 1024;
    pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;
    pub const DEFAULT_NOTICE_HISTORY: usize = 16;
}

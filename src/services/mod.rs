pub mod stage_analytics;
pub mod stats_engine;

pub use stage_analytics::{StageAnalytics, StageBreakdown};
pub use stats_engine::{ignore_progress, ProgressFn, StatsEngine};

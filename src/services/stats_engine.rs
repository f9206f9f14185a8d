use crate::error::Result;
use crate::models::{Department, EfficiencyScore, StageStatistics};
use crate::state_machine::Stage;
use async_trait::async_trait;

/// Progress callback, fraction complete in `0.0..=1.0`
pub type ProgressFn = dyn Fn(f32) + Send + Sync;

/// External statistics engine computing stage durations and efficiency scores.
///
/// Implementations own the outlier detection; this crate only consumes the flags.
/// A result with `no_data` set is a normal answer, not an error. Failures should be
/// reported as [`crate::CaseTrackError::Stats`].
#[async_trait]
pub trait StatsEngine: Send + Sync {
    async fn compute_stage_statistics(
        &self,
        stage: Stage,
        on_progress: &ProgressFn,
    ) -> Result<StageStatistics>;

    async fn compute_department_efficiency(
        &self,
        department: Department,
        stage: Stage,
        stats: &StageStatistics,
        case_count: usize,
        on_progress: &ProgressFn,
    ) -> Result<EfficiencyScore>;
}

/// Progress callback that discards updates
pub fn ignore_progress(_: f32) {}

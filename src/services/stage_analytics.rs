//! # Stage Analytics
//!
//! Joins the statistics engine with the store's manual exclusions and hands both to the
//! reconciler. Engine "no data" and engine failures come back as [`StatsOutcome`]
//! values so a caller can render an empty state instead of an error page.

use super::stats_engine::{ProgressFn, StatsEngine};
use crate::error::Result;
use crate::exclusion::{reconcile, ExclusionPolicy, ReconciledView};
use crate::models::{Department, EfficiencyScore, StageStatistics, StatsOutcome};
use crate::state_machine::Stage;
use std::sync::Arc;
use tracing::{debug, warn};

/// Statistics for one stage together with the reconciled case lists
#[derive(Debug, Clone)]
pub struct StageBreakdown {
    pub stage: Stage,
    pub outcome: StatsOutcome<StageStatistics>,
    /// `None` only when the engine failed
    pub view: Option<ReconciledView>,
}

pub struct StageAnalytics {
    engine: Arc<dyn StatsEngine>,
    policy: Arc<ExclusionPolicy>,
}

impl StageAnalytics {
    pub fn new(engine: Arc<dyn StatsEngine>, policy: Arc<ExclusionPolicy>) -> Self {
        Self { engine, policy }
    }

    /// Fetch stage statistics and manual exclusions concurrently, then reconcile.
    ///
    /// Store errors while reading manual exclusions propagate; engine errors do not.
    pub async fn stage_breakdown(&self, stage: Stage, on_progress: &ProgressFn) -> Result<StageBreakdown> {
        let (stats, manual) = futures::join!(
            self.engine.compute_stage_statistics(stage, on_progress),
            self.policy.manual_exclusions(stage),
        );
        let manual = manual?;

        let outcome = match stats {
            Ok(stats) => StatsOutcome::from_statistics(stats),
            Err(e) => {
                warn!(stage = %stage, error = %e, "Stage statistics unavailable");
                StatsOutcome::Failed(e.to_string())
            }
        };

        let view = match &outcome {
            StatsOutcome::Computed(stats) => Some(reconcile(
                stage,
                &stats.case_details,
                &stats.excluded_cases,
                &manual,
            )),
            StatsOutcome::NoData => Some(reconcile(stage, &[], &[], &manual)),
            StatsOutcome::Failed(_) => None,
        };

        debug!(
            stage = %stage,
            manual = manual.len(),
            no_data = outcome.is_no_data(),
            "Stage breakdown assembled"
        );

        Ok(StageBreakdown { stage, outcome, view })
    }

    /// Efficiency score for a department; missing stage data passes through as `NoData`
    pub async fn department_efficiency(
        &self,
        department: Department,
        stage: Stage,
        stats: &StatsOutcome<StageStatistics>,
        case_count: usize,
        on_progress: &ProgressFn,
    ) -> StatsOutcome<EfficiencyScore> {
        let stats = match stats {
            StatsOutcome::Computed(stats) => stats,
            StatsOutcome::NoData => return StatsOutcome::NoData,
            StatsOutcome::Failed(reason) => return StatsOutcome::Failed(reason.clone()),
        };

        match self
            .engine
            .compute_department_efficiency(department, stage, stats, case_count, on_progress)
            .await
        {
            Ok(score) if score.no_data => StatsOutcome::NoData,
            Ok(score) => StatsOutcome::Computed(score),
            Err(e) => {
                warn!(department = %department, stage = %stage, error = %e, "Efficiency score unavailable");
                StatsOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CaseTrackError;
    use crate::events::EventPublisher;
    use crate::exclusion::ExclusionCategory;
    use crate::models::{Case, CaseDetail, ExcludedCase};
    use crate::services::stats_engine::ignore_progress;
    use crate::store::{InMemoryAuditLog, InMemoryCaseStore, TagWriter, WriteMode};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::Map;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockEngine {
        stats: Option<StageStatistics>,
        score: f64,
        efficiency_calls: AtomicUsize,
    }

    #[async_trait]
    impl StatsEngine for MockEngine {
        async fn compute_stage_statistics(&self, _: Stage, on_progress: &ProgressFn) -> Result<StageStatistics> {
            on_progress(1.0);
            self.stats
                .clone()
                .ok_or_else(|| CaseTrackError::Stats("engine offline".into()))
        }

        async fn compute_department_efficiency(
            &self,
            _: Department,
            _: Stage,
            _: &StageStatistics,
            _: usize,
            _: &ProgressFn,
        ) -> Result<EfficiencyScore> {
            self.efficiency_calls.fetch_add(1, Ordering::SeqCst);
            Ok(EfficiencyScore {
                score: self.score,
                no_data: false,
            })
        }
    }

    fn detail(id: &str, hours: f64, outlier: bool) -> CaseDetail {
        CaseDetail {
            id: id.into(),
            time_in_stage: hours,
            is_active: false,
            is_outlier: outlier,
            tags: vec![],
            extra: Map::new(),
        }
    }

    fn analytics(stats: Option<StageStatistics>) -> (StageAnalytics, Arc<InMemoryCaseStore>) {
        let store = Arc::new(InMemoryCaseStore::new());
        let policy = ExclusionPolicy::new(
            TagWriter::new(store.clone(), WriteMode::default()),
            Arc::new(InMemoryAuditLog::new()),
            EventPublisher::default(),
        );
        let engine = MockEngine {
            stats,
            score: 0.8,
            efficiency_calls: AtomicUsize::new(0),
        };
        (StageAnalytics::new(Arc::new(engine), Arc::new(policy)), store)
    }

    #[tokio::test]
    async fn test_breakdown_merges_engine_and_manual_sources() {
        let stats = StageStatistics {
            average_time: 10.0,
            median_time: 8.0,
            case_details: vec![detail("a", 4.0, false), detail("b", 90.0, true)],
            excluded_cases: vec![ExcludedCase {
                id: "c".into(),
                reason: None,
                time_in_stage: Some(2.0),
                tags: vec![],
            }],
            no_data: false,
        };
        let (analytics, store) = analytics(Some(stats));
        let mut manual = Case::new("m", "77", Department::Digital, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        manual.tags = vec!["stats-exclude:design".into()];
        store.insert(manual);

        let breakdown = analytics.stage_breakdown(Stage::Design, &ignore_progress).await.unwrap();
        let view = breakdown.view.unwrap();

        assert_eq!(view.completed.len(), 1);
        assert_eq!(view.excluded.len(), 3);
        assert_eq!(view.excluded.last().unwrap().category, ExclusionCategory::AutomaticOutlier);
        assert!(view.excluded.iter().any(|e| e.id.as_str() == "m" && e.category.is_manual()));
    }

    #[tokio::test]
    async fn test_engine_failure_is_a_value() {
        let (analytics, _) = analytics(None);
        let breakdown = analytics.stage_breakdown(Stage::Qc, &ignore_progress).await.unwrap();

        assert!(matches!(breakdown.outcome, StatsOutcome::Failed(_)));
        assert!(breakdown.view.is_none());
    }

    #[tokio::test]
    async fn test_no_data_passes_through_efficiency() {
        let (analytics, _) = analytics(Some(StageStatistics {
            no_data: true,
            ..Default::default()
        }));
        let breakdown = analytics.stage_breakdown(Stage::Production, &ignore_progress).await.unwrap();
        assert!(breakdown.outcome.is_no_data());

        let score = analytics
            .department_efficiency(Department::Digital, Stage::Production, &breakdown.outcome, 0, &ignore_progress)
            .await;
        assert_eq!(score, StatsOutcome::NoData);
    }

    #[tokio::test]
    async fn test_efficiency_computed_from_stats() {
        let (analytics, _) = analytics(None);
        let stats = StatsOutcome::Computed(StageStatistics::default());
        let score = analytics
            .department_efficiency(Department::Metal, Stage::Finishing, &stats, 12, &ignore_progress)
            .await;
        assert_eq!(score.computed().map(|s| s.score), Some(0.8));
    }
}

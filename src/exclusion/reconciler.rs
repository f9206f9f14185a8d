//! # Exclusion Reconciler
//!
//! Merges three independently produced views of a stage's cases into one categorized
//! result in which every input id appears exactly once:
//!
//! 1. `case_details` from the statistics engine (richest; outlier and activity flags)
//! 2. `excluded_cases` from the statistics engine
//! 3. manual exclusions queried straight from the store, which catch exclusions the
//!    possibly stale statistics have not picked up yet
//!
//! Sources are processed in that order and an id seen once is skipped afterwards.
//! Active and completed cases sort by time in stage, longest first. Excluded cases sort
//! the same way with automatic outliers sunk below everything else; ties break on the
//! case id so the output is deterministic.

use super::policy::manual_category;
use crate::constants::reasons::{DATA_QUALITY_ISSUE, MANUALLY_EXCLUDED};
use crate::models::{format_time_in_stage, CaseDetail, CaseId, CaseTags, ExcludedCase};
use crate::state_machine::Stage;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionCategory {
    /// `stats-exclude:all`
    ManualAll,
    /// Stage-scoped, legacy or bare manual exclusion
    ManualStage,
    /// Excluded by the engine for data quality
    Automatic,
    /// Flagged by the engine as a statistical outlier
    AutomaticOutlier,
}

impl ExclusionCategory {
    pub fn is_manual(&self) -> bool {
        matches!(self, Self::ManualAll | Self::ManualStage)
    }
}

/// Where an excluded entry was first seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionSource {
    CaseDetails,
    EngineExcluded,
    StoreQuery,
}

/// Manually excluded case as read from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualExclusion {
    pub id: CaseId,
    pub category: ExclusionCategory,
    pub reason: Option<String>,
    pub time_in_stage: Option<f64>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedEntry {
    pub id: CaseId,
    pub category: ExclusionCategory,
    pub reason: String,
    pub time_in_stage: Option<f64>,
    pub tags: Vec<String>,
    pub source: ExclusionSource,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciledView {
    pub active: Vec<CaseDetail>,
    pub completed: Vec<CaseDetail>,
    pub excluded: Vec<ExcludedEntry>,
}

impl ReconciledView {
    pub fn len(&self) -> usize {
        self.active.len() + self.completed.len() + self.excluded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every id in the view, in output order
    pub fn ids(&self) -> Vec<&CaseId> {
        self.active
            .iter()
            .map(|c| &c.id)
            .chain(self.completed.iter().map(|c| &c.id))
            .chain(self.excluded.iter().map(|e| &e.id))
            .collect()
    }
}

/// Merge the three sources for `stage`
pub fn reconcile(
    stage: Stage,
    case_details: &[CaseDetail],
    excluded_cases: &[ExcludedCase],
    manual_exclusions: &[ManualExclusion],
) -> ReconciledView {
    let mut processed: HashSet<&CaseId> = HashSet::new();
    let mut view = ReconciledView::default();

    for detail in case_details {
        if !processed.insert(&detail.id) {
            continue;
        }
        let exclusion = CaseTags::parse(&detail.tags).exclusion;
        let manual = manual_category(&exclusion, Some(stage));

        if detail.is_outlier && manual.is_none() && !exclusion.has_inclusion_override() {
            view.excluded.push(ExcludedEntry {
                id: detail.id.clone(),
                category: ExclusionCategory::AutomaticOutlier,
                reason: format_time_in_stage(detail.time_in_stage),
                time_in_stage: Some(detail.time_in_stage),
                tags: detail.tags.clone(),
                source: ExclusionSource::CaseDetails,
            });
        } else if let Some(category) = manual {
            view.excluded.push(ExcludedEntry {
                id: detail.id.clone(),
                category,
                reason: exclusion.reason().unwrap_or(MANUALLY_EXCLUDED).to_string(),
                time_in_stage: Some(detail.time_in_stage),
                tags: detail.tags.clone(),
                source: ExclusionSource::CaseDetails,
            });
        } else if detail.is_active {
            view.active.push(detail.clone());
        } else {
            view.completed.push(detail.clone());
        }
    }

    for excluded in excluded_cases {
        if !processed.insert(&excluded.id) {
            continue;
        }
        let exclusion = CaseTags::parse(&excluded.tags).exclusion;
        let engine_reason = excluded.reason.as_deref().filter(|r| !r.trim().is_empty());

        let (category, reason) = match manual_category(&exclusion, Some(stage)) {
            Some(category) => (
                category,
                exclusion
                    .reason()
                    .or(engine_reason)
                    .unwrap_or(MANUALLY_EXCLUDED),
            ),
            None => (
                ExclusionCategory::Automatic,
                engine_reason.unwrap_or(DATA_QUALITY_ISSUE),
            ),
        };

        view.excluded.push(ExcludedEntry {
            id: excluded.id.clone(),
            category,
            reason: reason.to_string(),
            time_in_stage: excluded.time_in_stage,
            tags: excluded.tags.clone(),
            source: ExclusionSource::EngineExcluded,
        });
    }

    for manual in manual_exclusions {
        if !processed.insert(&manual.id) {
            continue;
        }
        view.excluded.push(ExcludedEntry {
            id: manual.id.clone(),
            category: manual.category,
            reason: manual
                .reason
                .clone()
                .unwrap_or_else(|| MANUALLY_EXCLUDED.to_string()),
            time_in_stage: manual.time_in_stage,
            tags: manual.tags.clone(),
            source: ExclusionSource::StoreQuery,
        });
    }

    view.active.sort_by(compare_details);
    view.completed.sort_by(compare_details);
    view.excluded.sort_by(compare_excluded);

    view
}

fn compare_details(a: &CaseDetail, b: &CaseDetail) -> Ordering {
    longest_first(Some(a.time_in_stage), Some(b.time_in_stage)).then_with(|| a.id.cmp(&b.id))
}

fn compare_excluded(a: &ExcludedEntry, b: &ExcludedEntry) -> Ordering {
    let a_outlier = a.category == ExclusionCategory::AutomaticOutlier;
    let b_outlier = b.category == ExclusionCategory::AutomaticOutlier;

    a_outlier
        .cmp(&b_outlier)
        .then_with(|| longest_first(a.time_in_stage, b.time_in_stage))
        .then_with(|| a.id.cmp(&b.id))
}

// Missing durations sort last
fn longest_first(a: Option<f64>, b: Option<f64>) -> Ordering {
    let a = a.unwrap_or(f64::NEG_INFINITY);
    let b = b.unwrap_or(f64::NEG_INFINITY);
    b.total_cmp(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn detail(id: &str, hours: f64, active: bool, outlier: bool, tags: &[&str]) -> CaseDetail {
        CaseDetail {
            id: id.into(),
            time_in_stage: hours,
            is_active: active,
            is_outlier: outlier,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            extra: Map::new(),
        }
    }

    fn engine_excluded(id: &str, reason: Option<&str>, tags: &[&str]) -> ExcludedCase {
        ExcludedCase {
            id: id.into(),
            reason: reason.map(str::to_string),
            time_in_stage: Some(10.0),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn manual(id: &str) -> ManualExclusion {
        ManualExclusion {
            id: id.into(),
            category: ExclusionCategory::ManualStage,
            reason: None,
            time_in_stage: None,
            tags: vec!["stats-exclude:design".into()],
        }
    }

    #[test]
    fn test_classifies_case_details() {
        let view = reconcile(
            Stage::Design,
            &[
                detail("active", 5.0, true, false, &[]),
                detail("done", 8.0, false, false, &[]),
                detail("outlier", 400.0, false, true, &[]),
                detail("manual", 3.0, true, false, &["stats-exclude:design", "stats-exclude-reason:remake"]),
            ],
            &[],
            &[],
        );

        assert_eq!(view.active.len(), 1);
        assert_eq!(view.completed.len(), 1);
        assert_eq!(view.excluded.len(), 2);

        let manual = view.excluded.iter().find(|e| e.id == CaseId::from("manual")).unwrap();
        assert_eq!(manual.category, ExclusionCategory::ManualStage);
        assert_eq!(manual.reason, "remake");

        let outlier = view.excluded.iter().find(|e| e.id == CaseId::from("outlier")).unwrap();
        assert_eq!(outlier.category, ExclusionCategory::AutomaticOutlier);
        assert_eq!(outlier.reason, "16.7 days");
    }

    #[test]
    fn test_manual_exclusion_beats_outlier_flag() {
        let view = reconcile(
            Stage::Qc,
            &[detail("x", 99.0, false, true, &["stats-exclude:all"])],
            &[],
            &[],
        );
        assert_eq!(view.excluded[0].category, ExclusionCategory::ManualAll);
    }

    #[test]
    fn test_inclusion_override_keeps_outlier_in_view() {
        let view = reconcile(
            Stage::Qc,
            &[detail(
                "x",
                99.0,
                true,
                true,
                &["stats-exclude-reason:Manually included (override automatic exclusion)"],
            )],
            &[],
            &[],
        );
        assert!(view.excluded.is_empty());
        assert_eq!(view.active[0].id, CaseId::from("x"));
    }

    #[test]
    fn test_engine_excluded_defaults_to_data_quality() {
        let view = reconcile(
            Stage::Production,
            &[],
            &[
                engine_excluded("auto", None, &[]),
                engine_excluded("tagged", Some("engine says"), &["stats-exclude-production"]),
            ],
            &[],
        );

        let auto = view.excluded.iter().find(|e| e.id == CaseId::from("auto")).unwrap();
        assert_eq!(auto.category, ExclusionCategory::Automatic);
        assert_eq!(auto.reason, "Data quality issue");

        let tagged = view.excluded.iter().find(|e| e.id == CaseId::from("tagged")).unwrap();
        assert_eq!(tagged.category, ExclusionCategory::ManualStage);
        assert_eq!(tagged.reason, "engine says");
    }

    #[test]
    fn test_each_id_appears_once_with_source_precedence() {
        let view = reconcile(
            Stage::Design,
            &[detail("a", 1.0, true, false, &[])],
            &[engine_excluded("a", None, &[]), engine_excluded("b", None, &[])],
            &[manual("a"), manual("b"), manual("c")],
        );

        let mut ids: Vec<_> = view.ids().into_iter().map(|id| id.as_str().to_string()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let b = view.excluded.iter().find(|e| e.id == CaseId::from("b")).unwrap();
        assert_eq!(b.source, ExclusionSource::EngineExcluded);
        let c = view.excluded.iter().find(|e| e.id == CaseId::from("c")).unwrap();
        assert_eq!(c.source, ExclusionSource::StoreQuery);
        assert_eq!(c.reason, "Manually excluded");
    }

    #[test]
    fn test_sorting_is_deterministic() {
        let view = reconcile(
            Stage::Design,
            &[
                detail("b", 5.0, true, false, &[]),
                detail("a", 5.0, true, false, &[]),
                detail("c", 9.0, true, false, &[]),
                detail("big-outlier", 900.0, false, true, &[]),
                detail("small-outlier", 300.0, false, true, &[]),
            ],
            &[engine_excluded("auto", None, &[])],
            &[manual("m")],
        );

        let active: Vec<_> = view.active.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(active, vec!["c", "a", "b"]);

        let excluded: Vec<_> = view.excluded.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(excluded, vec!["auto", "m", "big-outlier", "small-outlier"]);
    }
}

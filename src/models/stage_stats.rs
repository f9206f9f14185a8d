//! # Stage Statistics
//!
//! Shapes produced by the external statistics engine and consumed by the exclusion
//! reconciler. Durations are expressed in hours.

use super::case::CaseId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-case row in a stage statistics result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetail {
    pub id: CaseId,
    pub time_in_stage: f64,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_outlier: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Engine-specific fields carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Case the engine itself left out of the stage averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedCase {
    pub id: CaseId,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub time_in_stage: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Stage statistics view as computed by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageStatistics {
    pub average_time: f64,
    pub median_time: f64,
    #[serde(default)]
    pub case_details: Vec<CaseDetail>,
    #[serde(default)]
    pub excluded_cases: Vec<ExcludedCase>,
    #[serde(default)]
    pub no_data: bool,
}

/// Result of a statistics computation; "no data" and failures are values, not errors
#[derive(Debug, Clone, PartialEq)]
pub enum StatsOutcome<T> {
    Computed(T),
    NoData,
    Failed(String),
}

impl<T> StatsOutcome<T> {
    pub fn computed(&self) -> Option<&T> {
        match self {
            Self::Computed(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

impl StatsOutcome<StageStatistics> {
    /// Normalize an engine result whose own `noData` flag is set
    pub fn from_statistics(stats: StageStatistics) -> Self {
        if stats.no_data {
            Self::NoData
        } else {
            Self::Computed(stats)
        }
    }
}

/// Department efficiency score from the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyScore {
    pub score: f64,
    #[serde(default)]
    pub no_data: bool,
}

/// Human-readable duration for hours spent in a stage
pub fn format_time_in_stage(hours: f64) -> String {
    if !hours.is_finite() || hours < 0.0 {
        return "unknown duration".to_string();
    }
    if hours < 24.0 {
        format!("{hours:.1} hours")
    } else {
        format!("{:.1} days", hours / 24.0)
    }
}

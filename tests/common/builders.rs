//! Seeding helpers for integration tests.

#![allow(dead_code)]

use casetrack_core::models::{CaseDetail, CaseId, Department, ExcludedCase};
use casetrack_core::test_utils::{CaseBuilder, TestContext};
use serde_json::Map;

pub fn tags(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|t| t.to_string()).collect()
}

pub fn sorted(mut v: Vec<String>) -> Vec<String> {
    v.sort();
    v
}

/// Seed a Digital case with the given tags
pub fn seed_digital(ctx: &TestContext, id: &str, raw: &[&str]) -> CaseId {
    ctx.seed(CaseBuilder::new(id).tags(raw).build())
}

pub fn seed_in(ctx: &TestContext, id: &str, department: Department, raw: &[&str]) -> CaseId {
    ctx.seed(CaseBuilder::new(id).department(department).tags(raw).build())
}

pub async fn current_tags(ctx: &TestContext, id: &CaseId) -> Vec<String> {
    use casetrack_core::store::CaseStore;
    ctx.store
        .get(id)
        .await
        .expect("store read")
        .expect("case exists")
        .tags
}

pub fn detail(id: &str, hours: f64, active: bool, outlier: bool, raw: &[&str]) -> CaseDetail {
    CaseDetail {
        id: id.into(),
        time_in_stage: hours,
        is_active: active,
        is_outlier: outlier,
        tags: tags(raw),
        extra: Map::new(),
    }
}

pub fn engine_excluded(id: &str, reason: Option<&str>, hours: Option<f64>) -> ExcludedCase {
    ExcludedCase {
        id: id.into(),
        reason: reason.map(str::to_string),
        time_in_stage: hours,
        tags: vec![],
    }
}

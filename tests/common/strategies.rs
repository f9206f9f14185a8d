#![allow(dead_code)]

use casetrack_core::exclusion::{ExclusionCategory, ManualExclusion};
use casetrack_core::models::{CaseDetail, ExcludedCase};
use casetrack_core::state_machine::Stage;
use proptest::prelude::*;
use proptest::strategy::Just;
use serde_json::Map;

/// Stages that have a tag form
pub fn taggable_stage_strategy() -> impl Strategy<Value = Stage> {
    prop_oneof![
        Just(Stage::Design),
        Just(Stage::Production),
        Just(Stage::Finishing),
        Just(Stage::Qc),
    ]
}

/// Single tag drawn from every family the engine understands, plus noise
pub fn tag_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        taggable_stage_strategy().prop_map(|s| format!("stage-{}", s.as_str())),
        prop::sample::select(vec!["stage2", "rush", "hold", "bbs", "flex"]).prop_map(String::from),
        Just("stats-exclude".to_string()),
        Just("stats-exclude:all".to_string()),
        taggable_stage_strategy().prop_map(|s| format!("stats-exclude:{}", s.as_str())),
        taggable_stage_strategy().prop_map(|s| format!("stats-exclude-{}", s.as_str())),
        "[a-z ]{1,12}".prop_map(|r| format!("stats-exclude-reason:{r}")),
        "[a-z]{3,8}",
    ]
}

pub fn tag_list_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(tag_strategy(), 0..8)
}

/// Case ids from a small pool so the three sources overlap
pub fn case_id_strategy() -> impl Strategy<Value = String> {
    (0u8..12).prop_map(|n| format!("case-{n}"))
}

pub fn case_detail_strategy() -> impl Strategy<Value = CaseDetail> {
    (
        case_id_strategy(),
        0.0f64..500.0,
        any::<bool>(),
        any::<bool>(),
        tag_list_strategy(),
    )
        .prop_map(|(id, hours, is_active, is_outlier, tags)| CaseDetail {
            id: id.into(),
            time_in_stage: hours,
            is_active,
            is_outlier,
            tags,
            extra: Map::new(),
        })
}

pub fn excluded_case_strategy() -> impl Strategy<Value = ExcludedCase> {
    (
        case_id_strategy(),
        prop::option::of("[a-z ]{0,10}"),
        prop::option::of(0.0f64..500.0),
    )
        .prop_map(|(id, reason, time_in_stage)| ExcludedCase {
            id: id.into(),
            reason,
            time_in_stage,
            tags: vec![],
        })
}

pub fn manual_exclusion_strategy() -> impl Strategy<Value = ManualExclusion> {
    (case_id_strategy(), any::<bool>()).prop_map(|(id, all)| ManualExclusion {
        tags: vec![if all {
            "stats-exclude:all".to_string()
        } else {
            "stats-exclude:design".to_string()
        }],
        id: id.into(),
        category: if all {
            ExclusionCategory::ManualAll
        } else {
            ExclusionCategory::ManualStage
        },
        reason: None,
        time_in_stage: None,
    })
}

//! # Typed Case Tags
//!
//! Cases persist their workflow state as a flat list of free-form strings. This module
//! is the parse/serialize boundary between that legacy wire format and a typed record:
//! services parse on read, mutate the record, and only reconstruct strings when
//! writing back to the store.
//!
//! Parsing is tolerant. Unknown tags are preserved verbatim, duplicates collapse, and
//! ambiguous combinations (several `stage-*` tags, bare `stats-exclude` next to
//! `stats-exclude:all`) are kept so precedence rules can resolve them downstream.

use crate::constants::tags::*;
use crate::state_machine::Stage;
use serde::{Deserialize, Serialize};

/// Boolean modifiers toggled directly on a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    Rush,
    Hold,
    Bbs,
    Flex,
}

impl Modifier {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Rush => RUSH,
            Self::Hold => HOLD,
            Self::Bbs => BBS,
            Self::Flex => FLEX,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Rush => "Rush",
            Self::Hold => "Hold",
            Self::Bbs => "BBS",
            Self::Flex => "Flex",
        }
    }
}

/// Manual exclusion signals carried in tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionTags {
    /// Bare `stats-exclude`
    pub bare: bool,
    /// `stats-exclude:all`
    pub all: bool,
    /// Scope names of `stats-exclude:<scope>` other than `all`
    pub scoped: Vec<String>,
    /// Stage names of legacy `stats-exclude-<stage>`
    pub legacy: Vec<String>,
    /// Texts of `stats-exclude-reason:<text>` in the order seen
    pub reasons: Vec<String>,
}

impl ExclusionTags {
    /// Whether any exclusion tag (reason tags aside) is present
    pub fn has_any_exclusion(&self) -> bool {
        self.bare || self.all || !self.scoped.is_empty() || !self.legacy.is_empty()
    }

    /// Whether any `stats-exclude:*` tag, including `:all`, is present
    pub fn has_any_scoped(&self) -> bool {
        self.all || !self.scoped.is_empty()
    }

    pub fn excludes_stage(&self, stage: Stage) -> bool {
        self.scoped.iter().any(|s| s == stage.as_str())
    }

    pub fn legacy_excludes_stage(&self, stage: Stage) -> bool {
        self.legacy.iter().any(|s| s == stage.as_str())
    }

    /// First recorded reason
    pub fn reason(&self) -> Option<&str> {
        self.reasons.first().map(String::as_str)
    }

    /// Whether the reason tags hold the manual-inclusion override annotation
    pub fn has_inclusion_override(&self) -> bool {
        self.reasons
            .iter()
            .any(|r| r == crate::constants::audit::OVERRIDE_AUTOMATIC_EXCLUSION)
    }

    /// Drop every exclusion signal and reason
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn is_ambiguous(&self) -> bool {
        self.bare && self.all
    }
}

/// Typed view of a case tag set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseTags {
    /// Recognized `stage-*` tags in the order seen
    pub stages: Vec<Stage>,
    /// `stage-*` tags with an unrecognized suffix, kept verbatim
    pub unrecognized_stages: Vec<String>,
    pub stage2: bool,
    pub rush: bool,
    pub hold: bool,
    pub bbs: bool,
    pub flex: bool,
    pub exclusion: ExclusionTags,
    /// Tags outside the recognized vocabulary, kept verbatim
    pub other: Vec<String>,
}

impl CaseTags {
    /// Parse a raw tag list
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Self {
        let mut tags = Self::default();

        for tag in raw.iter().map(AsRef::as_ref) {
            if let Some(text) = tag.strip_prefix(STATS_EXCLUDE_REASON_PREFIX) {
                push_unique(&mut tags.exclusion.reasons, text);
            } else if tag == STATS_EXCLUDE {
                tags.exclusion.bare = true;
            } else if tag == STATS_EXCLUDE_ALL {
                tags.exclusion.all = true;
            } else if let Some(scope) = tag.strip_prefix(STATS_EXCLUDE_SCOPED_PREFIX) {
                push_unique(&mut tags.exclusion.scoped, scope);
            } else if let Some(stage) = tag.strip_prefix(STATS_EXCLUDE_LEGACY_PREFIX) {
                push_unique(&mut tags.exclusion.legacy, stage);
            } else if let Some(suffix) = tag.strip_prefix(STAGE_PREFIX) {
                match Stage::from_tag_suffix(suffix) {
                    Some(stage) if !tags.stages.contains(&stage) => tags.stages.push(stage),
                    Some(_) => {}
                    None => push_unique(&mut tags.unrecognized_stages, tag),
                }
            } else {
                match tag {
                    STAGE2 => tags.stage2 = true,
                    RUSH => tags.rush = true,
                    HOLD => tags.hold = true,
                    BBS => tags.bbs = true,
                    FLEX => tags.flex = true,
                    _ => push_unique(&mut tags.other, tag),
                }
            }
        }

        tags
    }

    /// Serialize back to the wire format
    pub fn to_tags(&self) -> Vec<String> {
        let mut out = Vec::new();

        out.extend(self.stages.iter().filter_map(Stage::tag));
        out.extend(self.unrecognized_stages.iter().cloned());

        for (set, tag) in [
            (self.stage2, STAGE2),
            (self.rush, RUSH),
            (self.hold, HOLD),
            (self.bbs, BBS),
            (self.flex, FLEX),
            (self.exclusion.bare, STATS_EXCLUDE),
            (self.exclusion.all, STATS_EXCLUDE_ALL),
        ] {
            if set {
                out.push(tag.to_string());
            }
        }

        let ex = &self.exclusion;
        out.extend(ex.scoped.iter().map(|s| format!("{STATS_EXCLUDE_SCOPED_PREFIX}{s}")));
        out.extend(ex.legacy.iter().map(|s| format!("{STATS_EXCLUDE_LEGACY_PREFIX}{s}")));
        out.extend(ex.reasons.iter().map(|r| format!("{STATS_EXCLUDE_REASON_PREFIX}{r}")));
        out.extend(self.other.iter().cloned());

        out
    }

    /// Remove every `stage-*` tag
    pub fn clear_stages(&mut self) {
        self.stages.clear();
        self.unrecognized_stages.clear();
    }

    pub fn modifier(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Rush => self.rush,
            Modifier::Hold => self.hold,
            Modifier::Bbs => self.bbs,
            Modifier::Flex => self.flex,
        }
    }

    pub fn set_modifier(&mut self, modifier: Modifier, value: bool) {
        match modifier {
            Modifier::Rush => self.rush = value,
            Modifier::Hold => self.hold = value,
            Modifier::Bbs => self.bbs = value,
            Modifier::Flex => self.flex = value,
        }
    }

    /// Whether the tag set is in one of the tolerated-but-ambiguous states
    pub fn is_ambiguous(&self) -> bool {
        self.stages.len() + self.unrecognized_stages.len() > 1 || self.exclusion.is_ambiguous()
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

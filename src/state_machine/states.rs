use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow stage of a case.
///
/// Digital cases move through `Design -> Production -> Finishing -> Qc`, Metal cases
/// through `Development -> Finishing`. `Pending` is the fallback for departments
/// without defined stage rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Design,
    Production,
    Finishing,
    /// Quality control sub-stage after finishing
    Qc,
    /// Metal department first stage
    Development,
    /// No rules apply to the department
    Pending,
}

impl Stage {
    /// Stages that may be encoded as `stage-*` tags
    pub const TAGGABLE: [Stage; 4] = [Stage::Design, Stage::Production, Stage::Finishing, Stage::Qc];

    /// Wire name used in tags and exclusion scopes
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Design => "design",
            Self::Production => "production",
            Self::Finishing => "finishing",
            Self::Qc => "qc",
            Self::Development => "development",
            Self::Pending => "pending",
        }
    }

    /// Capitalized name used in audit texts
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Design => "Design",
            Self::Production => "Production",
            Self::Finishing => "Finishing",
            Self::Qc => "Quality Control",
            Self::Development => "Development",
            Self::Pending => "Pending",
        }
    }

    /// `stage-<name>` tag for this stage, if it has a tag form
    pub fn tag(&self) -> Option<String> {
        if Self::TAGGABLE.contains(self) {
            Some(format!("{}{}", crate::constants::tags::STAGE_PREFIX, self.as_str()))
        } else {
            None
        }
    }

    /// Parse the suffix of a `stage-*` tag
    pub fn from_tag_suffix(suffix: &str) -> Option<Self> {
        Self::TAGGABLE.into_iter().find(|s| s.as_str() == suffix)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "design" => Ok(Self::Design),
            "production" => Ok(Self::Production),
            "finishing" => Ok(Self::Finishing),
            "qc" => Ok(Self::Qc),
            "development" => Ok(Self::Development),
            "pending" => Ok(Self::Pending),
            _ => Err(format!("Invalid stage: {s}")),
        }
    }
}

/// Default stage for Digital cases without a stage tag
impl Default for Stage {
    fn default() -> Self {
        Self::Design
    }
}

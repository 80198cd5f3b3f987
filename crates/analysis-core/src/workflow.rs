//! Workflow variants and their processing-depth profiles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Expected phase count used when the variant is not recognised
pub const DEFAULT_EXPECTED_PHASES: usize = 10;

/// Completed contributor phases required before a recommendation is shown
/// for the lighter variants
pub const DEFAULT_MIN_CONTRIBUTORS: usize = 3;

/// Processing-depth profile requested for an analysis
///
/// Serialized as the backend's wire string (`"7-agent"`, `"13-agent"`).
/// Unrecognised strings are kept verbatim so a snapshot round-trips unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkflowVariant {
    /// Seven sequential AutoGen agents
    #[default]
    SevenAgent,
    /// Thirteen agents across AutoGen and CrewAI (heaviest profile)
    ThirteenAgent,
    /// Any other workflow string reported by the backend
    Custom(String),
}

impl WorkflowVariant {
    /// Wire representation of the variant
    pub fn as_str(&self) -> &str {
        match self {
            Self::SevenAgent => "7-agent",
            Self::ThirteenAgent => "13-agent",
            Self::Custom(name) => name,
        }
    }

    /// Number of phases a job of this variant is expected to report
    ///
    /// Fixed per variant so the progress denominator does not move while
    /// phases stream in.
    pub fn expected_phase_count(&self) -> usize {
        match self {
            Self::SevenAgent => 10,
            Self::ThirteenAgent => 16,
            Self::Custom(_) => DEFAULT_EXPECTED_PHASES,
        }
    }

    /// Minimum completed, non-system phases before the aggregate
    /// recommendation is considered displayable
    pub fn recommendation_threshold(&self) -> usize {
        match self {
            Self::ThirteenAgent => 5,
            Self::SevenAgent | Self::Custom(_) => DEFAULT_MIN_CONTRIBUTORS,
        }
    }

    /// Whether this is one of the variants the backend advertises
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl From<String> for WorkflowVariant {
    fn from(value: String) -> Self {
        match value.trim() {
            "7-agent" => Self::SevenAgent,
            "13-agent" => Self::ThirteenAgent,
            _ => Self::Custom(value),
        }
    }
}

impl From<&str> for WorkflowVariant {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<WorkflowVariant> for String {
    fn from(value: WorkflowVariant) -> Self {
        match value {
            WorkflowVariant::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for WorkflowVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

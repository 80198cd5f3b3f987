//! Phase records and incoming phase updates

use crate::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contributor name the backend uses for its own bookkeeping phases
pub const SYSTEM_CONTRIBUTOR: &str = "System";

/// Status of a single phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    #[default]
    Pending,
    Running,
    Completed,
    #[serde(alias = "failed")]
    Error,
}

impl PhaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stage or agent's progress entry within a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Stable identifier, when the backend provides one
    #[serde(default, rename = "phase_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display label; the matching key when no id is present
    #[serde(rename = "phase")]
    pub name: String,

    /// Contributor (agent or framework) reporting the phase
    #[serde(default)]
    pub agent: String,

    #[serde(default)]
    pub status: PhaseStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Phase {
    /// Create a pending phase with the given name and contributor
    pub fn new(name: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            agent: agent.into(),
            status: PhaseStatus::Pending,
            content: None,
            timestamp: None,
        }
    }

    pub fn with_status(mut self, status: PhaseStatus) -> Self {
        self.status = status;
        self
    }

    /// Build a phase from an update that matched nothing
    pub fn from_update(update: PhaseUpdate) -> Self {
        Self {
            id: update.id,
            name: update.name,
            agent: update.agent.unwrap_or_default(),
            status: update.status.unwrap_or_default(),
            content: update.content,
            timestamp: update.timestamp,
        }
    }

    /// Overwrite every field the update carries, keep the rest
    pub fn merge(&mut self, update: PhaseUpdate) {
        if update.id.is_some() {
            self.id = update.id;
        }
        self.name = update.name;
        if let Some(agent) = update.agent {
            self.agent = agent;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if update.content.is_some() {
            self.content = update.content;
        }
        if update.timestamp.is_some() {
            self.timestamp = update.timestamp;
        }
    }

    /// Whether the update refers to this phase
    ///
    /// A stable id wins when the update carries one; otherwise the name is
    /// the key.
    pub fn matches(&self, update: &PhaseUpdate) -> bool {
        match &update.id {
            Some(id) => self.id.as_deref() == Some(id.as_str()),
            None => self.name == update.name,
        }
    }

    /// Whether the backend reported this phase for its own bookkeeping
    pub fn is_system(&self) -> bool {
        self.agent.eq_ignore_ascii_case(SYSTEM_CONTRIBUTOR)
    }

    pub fn is_completed(&self) -> bool {
        self.status == PhaseStatus::Completed
    }
}

/// Phase-shaped payload of a `phase_update` frame
///
/// Only `phase` is mandatory; absent fields leave the stored phase untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseUpdate {
    #[serde(default, rename = "phase_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "phase")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PhaseStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl PhaseUpdate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            agent: None,
            status: None,
            content: None,
            timestamp: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn with_status(mut self, status: PhaseStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

impl From<Phase> for PhaseUpdate {
    fn from(phase: Phase) -> Self {
        Self {
            id: phase.id,
            name: phase.name,
            agent: Some(phase.agent),
            status: Some(phase.status),
            content: phase.content,
            timestamp: phase.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_preserves_missing_fields() {
        let mut phase = Phase::new("DataAnalyst", "AutoGen")
            .with_status(PhaseStatus::Running);
        phase.content = Some("fetching quotes".to_string());

        phase.merge(PhaseUpdate::new("DataAnalyst").with_status(PhaseStatus::Completed));

        assert_eq!(phase.status, PhaseStatus::Completed);
        assert_eq!(phase.agent, "AutoGen");
        assert_eq!(phase.content.as_deref(), Some("fetching quotes"));
    }

    #[test]
    fn test_matching_prefers_stable_id() {
        let mut phase = Phase::new("Review", "RiskManager");
        phase.id = Some("p-2".to_string());

        assert!(phase.matches(&PhaseUpdate::new("Review")));
        assert!(phase.matches(&PhaseUpdate::new("Renamed").with_id("p-2")));
        assert!(!phase.matches(&PhaseUpdate::new("Review").with_id("p-9")));
    }

    #[test]
    fn test_system_detection_ignores_case() {
        assert!(Phase::new("Initialization", "System").is_system());
        assert!(Phase::new("Initialization", "system").is_system());
        assert!(!Phase::new("Foundation Data Collection", "AutoGen Sequential").is_system());
    }

    #[test]
    fn test_decode_backend_phase_update() {
        let update: PhaseUpdate = serde_json::from_value(serde_json::json!({
            "phase": "Creating 7-Agent AI Team",
            "agent": "System",
            "status": "completed",
            "content": "team ready"
        }))
        .unwrap();

        assert_eq!(update.name, "Creating 7-Agent AI Team");
        assert_eq!(update.status, Some(PhaseStatus::Completed));
        assert!(update.id.is_none());
        assert!(update.timestamp.is_none());
    }

    #[test]
    fn test_from_update_defaults() {
        let phase = Phase::from_update(PhaseUpdate::new("C"));
        assert_eq!(phase.status, PhaseStatus::Pending);
        assert!(phase.agent.is_empty());
    }
}

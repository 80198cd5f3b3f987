//! Analysis jobs and submission requests

use crate::error::{Error, Result};
use crate::phase::Phase;
use crate::timestamp;
use crate::workflow::WorkflowVariant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of agent messages kept on a job
pub const MAX_TRANSCRIPT_LEN: usize = 20;

/// Opaque job identifier assigned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Job-level status
///
/// Transitions only move forward: pending → running → one of the three
/// terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    /// Completed, error and cancelled accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the agents' conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    #[serde(alias = "agent")]
    pub source: String,
    pub content: String,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Snapshot of one long-running analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,

    /// Subject key, e.g. the instrument symbol
    #[serde(rename = "stock_symbol")]
    pub subject: String,

    pub analysis_type: String,

    #[serde(rename = "workflow_type")]
    pub workflow: WorkflowVariant,

    pub status: JobStatus,

    #[serde(default)]
    pub phases: Vec<Phase>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<u32>,

    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,

    /// Failure detail reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Most recent agent messages, oldest first
    #[serde(default, rename = "ai_messages", skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<AgentMessage>,
}

impl Job {
    /// Initial snapshot published right after the backend accepted a request
    ///
    /// `created_at` is the local submission time; the backend's clock is only
    /// seen once a full snapshot arrives.
    pub fn pending(id: JobId, request: &AnalysisRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            subject: request.subject.clone(),
            analysis_type: request.analysis_type.clone(),
            workflow: request.workflow.clone(),
            status: JobStatus::Pending,
            phases: Vec::new(),
            summary: None,
            recommendation: None,
            confidence_score: None,
            created_at,
            completed_at: None,
            error: None,
            messages: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append a transcript line, dropping the oldest past the cap
    pub fn push_message(&mut self, message: AgentMessage) {
        self.messages.push(message);
        if self.messages.len() > MAX_TRANSCRIPT_LEN {
            let excess = self.messages.len() - MAX_TRANSCRIPT_LEN;
            self.messages.drain(..excess);
        }
    }

    pub fn completed_phase_count(&self) -> usize {
        self.phases.iter().filter(|p| p.is_completed()).count()
    }
}

/// Parameters of a start-analysis call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(rename = "stock_symbol")]
    pub subject: String,

    pub analysis_type: String,

    #[serde(rename = "workflow_type")]
    pub workflow: WorkflowVariant,
}

impl AnalysisRequest {
    /// Create a request; surrounding whitespace is stripped
    pub fn new(
        subject: impl Into<String>,
        analysis_type: impl Into<String>,
        workflow: impl Into<WorkflowVariant>,
    ) -> Self {
        Self {
            subject: subject.into().trim().to_string(),
            analysis_type: analysis_type.into().trim().to_string(),
            workflow: workflow.into(),
        }
    }

    /// Reject requests the backend could never accept
    pub fn validate(&self) -> Result<()> {
        if self.subject.trim().is_empty() {
            return Err(Error::Validation("subject key must not be empty".to_string()));
        }
        if self.analysis_type.trim().is_empty() {
            return Err(Error::Validation(
                "analysis variant must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

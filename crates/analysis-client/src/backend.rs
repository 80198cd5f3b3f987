//! Backend abstraction and its wire types

use crate::error::Result;
use analysis_core::{AnalysisRequest, Job, JobId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Operations the analysis backend exposes
///
/// The session only ever talks to the backend through this trait, so tests
/// and alternative transports can stand in for the HTTP implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Start a job and return the id the backend assigned
    async fn start_analysis(&self, request: &AnalysisRequest) -> Result<JobId>;

    /// Fetch the current snapshot of a job
    async fn fetch_job(&self, id: &JobId) -> Result<Job>;

    /// Ask the backend to cancel a job; `true` when it accepted
    async fn cancel(&self, id: &JobId) -> Result<bool>;

    async fn health(&self) -> Result<HealthStatus>;

    async fn analysis_types(&self) -> Result<Vec<AnalysisType>>;

    /// Every job the backend still remembers
    async fn history(&self) -> Result<Vec<Job>>;
}

/// Response of `POST /api/analysis/start`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartResponse {
    pub analysis_id: JobId,
}

/// Response of `POST /api/analysis/{id}/cancel`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
}

/// Response of `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub service: Option<String>,

    /// Whether the backend can run agent workflows at all
    #[serde(default)]
    pub ai_agents_available: bool,

    #[serde(default)]
    pub supported_workflows: Vec<String>,

    #[serde(default)]
    pub frameworks: Vec<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// One entry of `GET /api/analysis-types`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisType {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_health() {
        let health: HealthStatus = serde_json::from_value(serde_json::json!({
            "status": "healthy",
            "timestamp": "2025-03-14T09:26:53.589793",
            "version": "3.0.0-unified-ai",
            "service": "unified-trading-analysis",
            "ai_agents_available": true,
            "supported_workflows": ["7-agent", "13-agent"],
            "frameworks": ["AutoGen", "CrewAI"]
        }))
        .unwrap();

        assert!(health.is_healthy());
        assert!(health.ai_agents_available);
        assert_eq!(health.supported_workflows, vec!["7-agent", "13-agent"]);
    }

    #[test]
    fn test_decode_analysis_type() {
        let kind: AnalysisType = serde_json::from_value(serde_json::json!({
            "id": "5day",
            "name": "Next 5-Day Outlook",
            "description": "Short-term price movement and catalysts for next 5 days."
        }))
        .unwrap();

        assert_eq!(kind.id, "5day");
        assert!(kind.icon.is_none());
    }
}

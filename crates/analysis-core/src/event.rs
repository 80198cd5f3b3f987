//! Update events and the push-frame codec
//!
//! Push frames arrive as JSON text shaped `{type, analysis_id, data}`. They
//! are decoded here, at the channel boundary, into a closed set of variants;
//! an unrecognised `type` is an error rather than a silent default.

use crate::error::{Error, Result};
use crate::job::{AgentMessage, Job, JobId};
use crate::phase::PhaseUpdate;
use serde::Deserialize;
use std::fmt;

/// Which channel delivered an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Push,
    Poll,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => f.write_str("push"),
            Self::Poll => f.write_str("poll"),
        }
    }
}

/// A unit of information about one job
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    PhaseUpdate { job_id: JobId, phase: PhaseUpdate },
    AgentResponse { job_id: JobId, message: AgentMessage },
    JobComplete { job_id: JobId, snapshot: Box<Job> },
    JobCancelled { job_id: JobId },
    Error { job_id: JobId, detail: String },
}

impl UpdateEvent {
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::PhaseUpdate { job_id, .. }
            | Self::AgentResponse { job_id, .. }
            | Self::JobComplete { job_id, .. }
            | Self::JobCancelled { job_id }
            | Self::Error { job_id, .. } => job_id,
        }
    }

    /// Wire name of the event, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PhaseUpdate { .. } => "phase_update",
            Self::AgentResponse { .. } => "agent_response",
            Self::JobComplete { .. } => "analysis_complete",
            Self::JobCancelled { .. } => "analysis_cancelled",
            Self::Error { .. } => "error",
        }
    }
}

/// Connection bookkeeping frames sent by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFrame {
    Connected { client_id: Option<String> },
    Subscribed { job_id: JobId },
}

/// Any frame the push channel may deliver
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Update(UpdateEvent),
    Control(ControlFrame),
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, rename = "analysis_id", alias = "jobId", alias = "job_id")]
    job_id: Option<JobId>,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    client_id: Option<String>,
}

impl InboundFrame {
    /// Decode one text frame from the push channel
    pub fn decode(text: &str) -> Result<Self> {
        let raw: RawFrame = serde_json::from_str(text)?;

        if raw.kind == "connected" {
            return Ok(Self::Control(ControlFrame::Connected {
                client_id: raw.client_id,
            }));
        }

        let job_id = raw
            .job_id
            .ok_or_else(|| Error::Protocol(format!("'{}' frame without analysis_id", raw.kind)))?;

        let event = match raw.kind.as_str() {
            "subscribed" => return Ok(Self::Control(ControlFrame::Subscribed { job_id })),
            "phase_update" => UpdateEvent::PhaseUpdate {
                phase: serde_json::from_value(raw.data)?,
                job_id,
            },
            "agent_response" => UpdateEvent::AgentResponse {
                message: serde_json::from_value(raw.data)?,
                job_id,
            },
            "analysis_complete" => UpdateEvent::JobComplete {
                snapshot: Box::new(serde_json::from_value(raw.data)?),
                job_id,
            },
            "analysis_cancelled" => UpdateEvent::JobCancelled { job_id },
            "error" => UpdateEvent::Error {
                detail: error_detail(&raw.data),
                job_id,
            },
            other => {
                return Err(Error::Protocol(format!("unrecognised frame type '{other}'")));
            }
        };

        Ok(Self::Update(event))
    }
}

/// Frame asking the backend to push updates for `job_id` on this connection
pub fn subscribe_frame(job_id: &JobId) -> String {
    serde_json::json!({
        "type": "subscribe",
        "analysis_id": job_id,
    })
    .to_string()
}

fn error_detail(data: &serde_json::Value) -> String {
    match data {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("detail"))
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| "analysis failed".to_string(), str::to_string),
        _ => "analysis failed".to_string(),
    }
}

//! Core model and state machine for tracking long-running analysis jobs
//!
//! This crate holds everything that does not touch the network: the job and
//! phase model, the closed set of update events with their push-frame codec,
//! the lifecycle state machine, and the store that reconciles push and poll
//! updates into a single read-only [`SessionView`].

pub mod error;
pub mod event;
pub mod history;
pub mod job;
pub mod lifecycle;
pub mod phase;
pub mod reconciler;
pub mod store;
pub mod timestamp;
pub mod workflow;

pub use error::{Error, Result};
pub use event::{Channel, ControlFrame, InboundFrame, UpdateEvent, subscribe_frame};
pub use history::{DEFAULT_HISTORY_LIMIT, History};
pub use job::{AgentMessage, AnalysisRequest, Job, JobId, JobStatus};
pub use lifecycle::{CancelOrigin, Lifecycle, TerminalOutcome, Transition};
pub use phase::{Phase, PhaseStatus, PhaseUpdate};
pub use reconciler::{Disposition, PollVerdict};
pub use store::{AnalysisStore, SessionView, SubmissionTicket};
pub use workflow::WorkflowVariant;

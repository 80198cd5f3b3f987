//! Lifecycle state machine for a tracked job
//!
//! `Lifecycle` owns the job snapshot and is the only place its status
//! changes. Every operation is total: malformed or late input is absorbed as
//! a no-op rather than reported as an error.
//!
//! ```text
//! pending ──▶ running ──▶ completed
//!    │           ├──────▶ error
//!    └───────────┴──────▶ cancelled
//! ```

use crate::job::{AgentMessage, Job, JobStatus, MAX_TRANSCRIPT_LEN};
use crate::phase::{Phase, PhaseUpdate};
use chrono::Utc;
use tracing::debug;

/// Outcome of feeding one input into the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The job changed
    Applied,
    /// The input was absorbed without effect
    Ignored,
}

impl Transition {
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

/// Where a cancelled status came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOrigin {
    /// Set optimistically after the backend accepted a cancel request
    Local,
    /// Reported by the update channel itself
    Confirmed,
}

/// Terminal input for [`Lifecycle::apply_terminal`]
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalOutcome {
    /// Full snapshot of the finished job
    Completed(Box<Job>),
    /// Failure detail from the backend
    Error(String),
    Cancelled,
}

impl TerminalOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Completed(_) => JobStatus::Completed,
            Self::Error(_) => JobStatus::Error,
            Self::Cancelled => JobStatus::Cancelled,
        }
    }
}

/// State machine wrapping one job snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Lifecycle {
    job: Job,
    cancel_origin: Option<CancelOrigin>,
}

impl Lifecycle {
    pub fn new(job: Job) -> Self {
        let cancel_origin =
            (job.status == JobStatus::Cancelled).then_some(CancelOrigin::Confirmed);
        Self { job, cancel_origin }
    }

    /// Read-only view of the job
    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn status(&self) -> JobStatus {
        self.job.status
    }

    pub fn is_terminal(&self) -> bool {
        self.job.status.is_terminal()
    }

    pub fn cancel_origin(&self) -> Option<CancelOrigin> {
        self.cancel_origin
    }

    /// Terminal and not waiting on the backend to confirm a local cancel
    pub fn is_settled(&self) -> bool {
        self.is_terminal() && self.cancel_origin != Some(CancelOrigin::Local)
    }

    /// Promote pending → running; a no-op in every other state
    pub fn mark_running(&mut self) -> Transition {
        if self.job.status == JobStatus::Pending {
            self.job.status = JobStatus::Running;
            debug!(job_id = %self.job.id, "job promoted to running");
            Transition::Applied
        } else {
            Transition::Ignored
        }
    }

    /// Fold one phase update into the job
    ///
    /// A phase reporting `error` does not fail the job; only a job-level
    /// error outcome does.
    pub fn apply_phase(&mut self, update: PhaseUpdate) -> Transition {
        if self.is_terminal() {
            debug!(
                job_id = %self.job.id,
                phase = %update.name,
                "phase update after terminal state dropped"
            );
            return Transition::Ignored;
        }

        self.mark_running();

        match self.job.phases.iter_mut().find(|p| p.matches(&update)) {
            Some(existing) => existing.merge(update),
            None => self.job.phases.push(Phase::from_update(update)),
        }
        Transition::Applied
    }

    /// Record an agent's message in the bounded transcript
    pub fn apply_message(&mut self, message: AgentMessage) -> Transition {
        if self.is_terminal() {
            return Transition::Ignored;
        }
        self.mark_running();
        self.job.push_message(message);
        Transition::Applied
    }

    /// Replace the transcript with the backend's copy
    ///
    /// Poll snapshots carry the backend's own bounded transcript, which is
    /// authoritative over lines collected from push frames.
    pub fn sync_transcript(&mut self, messages: Vec<AgentMessage>) -> Transition {
        if self.is_terminal() || messages.is_empty() || self.job.messages == messages {
            return Transition::Ignored;
        }
        self.job.messages = messages;
        let excess = self.job.messages.len().saturating_sub(MAX_TRANSCRIPT_LEN);
        self.job.messages.drain(..excess);
        Transition::Applied
    }

    /// Move the job into a terminal state
    ///
    /// Idempotent: once terminal, further outcomes are ignored. The one
    /// exception is a completed snapshot arriving while the job is only
    /// locally cancelled; the completion wins.
    pub fn apply_terminal(&mut self, outcome: TerminalOutcome) -> Transition {
        if self.is_terminal() {
            return match (self.cancel_origin, outcome) {
                (Some(CancelOrigin::Local), TerminalOutcome::Completed(snapshot)) => {
                    debug!(job_id = %self.job.id, "completion overrides local cancel");
                    self.cancel_origin = None;
                    self.adopt_completed(*snapshot);
                    Transition::Applied
                }
                (Some(CancelOrigin::Local), TerminalOutcome::Cancelled) => {
                    self.cancel_origin = Some(CancelOrigin::Confirmed);
                    Transition::Ignored
                }
                _ => Transition::Ignored,
            };
        }

        match outcome {
            TerminalOutcome::Completed(snapshot) => self.adopt_completed(*snapshot),
            TerminalOutcome::Error(detail) => {
                self.job.status = JobStatus::Error;
                self.job.error = Some(detail);
                self.job.completed_at.get_or_insert_with(Utc::now);
            }
            TerminalOutcome::Cancelled => {
                self.job.status = JobStatus::Cancelled;
                self.cancel_origin = Some(CancelOrigin::Confirmed);
            }
        }
        Transition::Applied
    }

    /// Mark the job cancelled after the backend accepted a cancel request,
    /// without waiting for the update channel
    pub fn cancel_locally(&mut self) -> Transition {
        if self.is_terminal() {
            return Transition::Ignored;
        }
        self.job.status = JobStatus::Cancelled;
        self.cancel_origin = Some(CancelOrigin::Local);
        Transition::Applied
    }

    /// Fraction of expected work done, in `[0, 1]`
    ///
    /// The denominator is the variant's fixed expected phase count, raised to
    /// the number of phases actually received when the backend reports more.
    pub fn progress(&self) -> f64 {
        if self.job.status == JobStatus::Completed {
            return 1.0;
        }
        let expected = self.job.workflow.expected_phase_count();
        let denominator = expected.max(self.job.phases.len()).max(1);
        let completed = self.job.completed_phase_count();
        (completed as f64 / denominator as f64).clamp(0.0, 1.0)
    }

    /// Progress as a whole percentage
    pub fn progress_percent(&self) -> u8 {
        (self.progress() * 100.0).round() as u8
    }

    /// Whether enough contributors finished for the recommendation to be shown
    pub fn recommendation_ready(&self) -> bool {
        let contributors = self
            .job
            .phases
            .iter()
            .filter(|p| p.is_completed() && !p.is_system())
            .count();
        contributors >= self.job.workflow.recommendation_threshold()
    }

    fn adopt_completed(&mut self, snapshot: Job) {
        let Job {
            phases,
            summary,
            recommendation,
            confidence_score,
            created_at,
            completed_at,
            messages,
            ..
        } = snapshot;

        // The backend does not always echo phases in its final snapshot.
        if !phases.is_empty() {
            self.job.phases = phases;
        }
        if !messages.is_empty() {
            self.job.messages = messages;
        }
        self.job.summary = summary;
        self.job.recommendation = recommendation;
        self.job.confidence_score = confidence_score;
        self.job.created_at = created_at;
        self.job.completed_at = Some(completed_at.unwrap_or_else(Utc::now));
        self.job.error = None;
        self.job.status = JobStatus::Completed;
    }
}

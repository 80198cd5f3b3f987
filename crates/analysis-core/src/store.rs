//! Session state shared by the gateway, the reconciler and presentation code
//!
//! The store is a plain value. Callers serialise access to it (the client
//! crate wraps it in one async mutex) and hand presentation code immutable
//! [`SessionView`] snapshots.

use crate::history::History;
use crate::job::{Job, JobId};
use crate::lifecycle::Lifecycle;
use serde::Serialize;
use tracing::{debug, info};

/// Read-only projection of the store for presentation code
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SessionView {
    /// Tracked job, if any
    pub job: Option<Job>,
    /// Fraction of expected work done, in `[0, 1]`
    pub progress: f64,
    pub progress_percent: u8,
    /// A submission is in flight or the tracked job is not yet terminal
    pub running: bool,
    /// A cancel request is in flight
    pub cancelling: bool,
    pub recommendation_ready: bool,
    /// Most recent failure surfaced to the user
    pub last_error: Option<String>,
    pub push_connected: bool,
    /// Finished jobs, newest first
    pub history: Vec<Job>,
}

impl SessionView {
    pub fn job_id(&self) -> Option<&JobId> {
        self.job.as_ref().map(|job| &job.id)
    }

    /// Whether the cancel affordance should be offered
    pub fn can_cancel(&self) -> bool {
        !self.cancelling && self.job.as_ref().is_some_and(|job| !job.is_terminal())
    }
}

/// Identifies one submission attempt
///
/// Every reset invalidates outstanding tickets, so a start call that resolves
/// after the session moved on cannot claim the tracked-job slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTicket(u64);

/// Single owner of all mutable session state
#[derive(Debug, Clone, Default)]
pub struct AnalysisStore {
    pub(crate) tracked: Option<Lifecycle>,
    generation: u64,
    pub(crate) history: History,
    pub(crate) running: bool,
    pub(crate) cancelling: bool,
    pub(crate) last_error: Option<String>,
    pub(crate) push_connected: bool,
}

impl AnalysisStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            history: History::new(history_limit),
            ..Self::default()
        }
    }

    /// Drop the tracked job and its transient flags; history is kept
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(lifecycle) = self.tracked.take() {
            debug!(job_id = %lifecycle.job().id, "tracked job cleared");
        }
        self.running = false;
        self.cancelling = false;
        self.last_error = None;
    }

    /// Reset and raise the running flag ahead of a start call
    pub fn begin_submission(&mut self) -> SubmissionTicket {
        self.reset();
        self.running = true;
        SubmissionTicket(self.generation)
    }

    /// Whether no reset or newer submission happened since `ticket` was issued
    pub fn is_current(&self, ticket: SubmissionTicket) -> bool {
        ticket.0 == self.generation
    }

    pub fn submission_failed(&mut self, ticket: SubmissionTicket, detail: impl Into<String>) {
        if !self.is_current(ticket) {
            debug!("failure of superseded submission dropped");
            return;
        }
        self.running = false;
        self.last_error = Some(detail.into());
    }

    /// Start tracking a freshly accepted job
    ///
    /// Returns `false`, leaving the store untouched, when `ticket` was
    /// superseded while the start call was in flight.
    pub fn track(&mut self, ticket: SubmissionTicket, job: Job) -> bool {
        if !self.is_current(ticket) {
            debug!(job_id = %job.id, "superseded submission not tracked");
            return false;
        }
        info!(
            job_id = %job.id,
            subject = %job.subject,
            workflow = %job.workflow,
            "tracking job"
        );
        self.running = !job.is_terminal();
        self.tracked = Some(Lifecycle::new(job));
        true
    }

    pub fn tracked(&self) -> Option<&Lifecycle> {
        self.tracked.as_ref()
    }

    pub fn tracked_id(&self) -> Option<&JobId> {
        self.tracked.as_ref().map(|lifecycle| &lifecycle.job().id)
    }

    pub fn is_tracking(&self, id: &JobId) -> bool {
        self.tracked_id() == Some(id)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_cancelling(&self) -> bool {
        self.cancelling
    }

    /// Raise the cancelling flag
    ///
    /// Returns `false` when `id` is not the tracked, still-active job.
    pub fn begin_cancel(&mut self, id: &JobId) -> bool {
        let active = self
            .tracked
            .as_ref()
            .is_some_and(|lifecycle| &lifecycle.job().id == id && !lifecycle.is_terminal());
        if active {
            self.cancelling = true;
        }
        active
    }

    /// Apply the backend's answer to a cancel request
    ///
    /// An answer for a job that is no longer tracked changes nothing.
    pub fn cancel_acknowledged(&mut self, id: &JobId, success: bool) {
        if !self.is_tracking(id) {
            debug!(job_id = %id, "cancel answer for untracked job dropped");
            return;
        }
        self.cancelling = false;
        if !success {
            debug!(job_id = %id, "backend declined cancel");
            return;
        }
        let Some(lifecycle) = self.tracked.as_mut().filter(|lc| &lc.job().id == id) else {
            return;
        };
        if lifecycle.cancel_locally().is_applied() {
            info!(job_id = %id, "job cancelled locally, awaiting confirmation");
            self.running = false;
        }
    }

    pub fn cancel_failed(&mut self, detail: impl Into<String>) {
        self.cancelling = false;
        self.last_error = Some(detail.into());
    }

    pub fn set_push_connected(&mut self, connected: bool) {
        self.push_connected = connected;
    }

    pub fn record_error(&mut self, detail: impl Into<String>) {
        self.last_error = Some(detail.into());
    }

    pub fn view(&self) -> SessionView {
        let tracked = self.tracked.as_ref();
        SessionView {
            job: tracked.map(|lifecycle| lifecycle.job().clone()),
            progress: tracked.map_or(0.0, Lifecycle::progress),
            progress_percent: tracked.map_or(0, Lifecycle::progress_percent),
            running: self.running,
            cancelling: self.cancelling,
            recommendation_ready: tracked.is_some_and(Lifecycle::recommendation_ready),
            last_error: self.last_error.clone(),
            push_connected: self.push_connected,
            history: self.history.iter().cloned().collect(),
        }
    }
}

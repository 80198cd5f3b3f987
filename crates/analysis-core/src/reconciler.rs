//! Folding push events and poll snapshots into the tracked job
//!
//! Both channels may report the same facts in any order. The first terminal
//! write wins; later conflicting terminal writes are dropped, except that a
//! completion still overrides a cancel the backend has not yet confirmed.

use crate::event::{Channel, UpdateEvent};
use crate::job::{Job, JobStatus};
use crate::lifecycle::{TerminalOutcome, Transition};
use crate::store::AnalysisStore;
use tracing::{debug, info, warn};

/// What happened to an update event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Applied,
    /// Addressed the tracked job but changed nothing
    Ignored,
    /// Addressed a job that is no longer tracked
    Stale,
}

/// Whether the poll loop should keep going after a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollVerdict {
    Continue,
    Stop,
}

impl From<Transition> for Disposition {
    fn from(transition: Transition) -> Self {
        match transition {
            Transition::Applied => Self::Applied,
            Transition::Ignored => Self::Ignored,
        }
    }
}

impl AnalysisStore {
    /// Fold one update event into the store
    pub fn apply_event(&mut self, event: UpdateEvent, channel: Channel) -> Disposition {
        let kind = event.kind();
        let Some(lifecycle) = self
            .tracked
            .as_mut()
            .filter(|lc| &lc.job().id == event.job_id())
        else {
            debug!(job_id = %event.job_id(), kind, %channel, "stale event ignored");
            return Disposition::Stale;
        };

        let transition = match event {
            UpdateEvent::PhaseUpdate { phase, .. } => lifecycle.apply_phase(phase),
            UpdateEvent::AgentResponse { message, .. } => lifecycle.apply_message(message),
            UpdateEvent::JobComplete { snapshot, .. } => {
                lifecycle.apply_terminal(TerminalOutcome::Completed(snapshot))
            }
            UpdateEvent::JobCancelled { .. } => {
                lifecycle.apply_terminal(TerminalOutcome::Cancelled)
            }
            UpdateEvent::Error { detail, .. } => {
                let transition = lifecycle.apply_terminal(TerminalOutcome::Error(detail.clone()));
                if transition.is_applied() {
                    warn!(job_id = %lifecycle.job().id, %channel, error = %detail, "job failed");
                    self.last_error = Some(detail);
                }
                transition
            }
        };

        debug!(kind, %channel, ?transition, "event folded");
        self.settle(channel);
        transition.into()
    }

    /// Fold one polled snapshot into the store
    pub fn apply_snapshot(&mut self, snapshot: Job) -> PollVerdict {
        let Some(lifecycle) = self
            .tracked
            .as_mut()
            .filter(|lc| lc.job().id == snapshot.id)
        else {
            debug!(job_id = %snapshot.id, "snapshot for untracked job, stopping poll");
            return PollVerdict::Stop;
        };

        let remote_status = snapshot.status;
        match remote_status {
            JobStatus::Completed => {
                lifecycle.apply_terminal(TerminalOutcome::Completed(Box::new(snapshot)));
            }
            JobStatus::Error => {
                let detail = snapshot
                    .error
                    .unwrap_or_else(|| "analysis failed".to_string());
                if lifecycle
                    .apply_terminal(TerminalOutcome::Error(detail.clone()))
                    .is_applied()
                {
                    warn!(
                        job_id = %lifecycle.job().id,
                        channel = %Channel::Poll,
                        error = %detail,
                        "job failed"
                    );
                    self.last_error = Some(detail);
                }
            }
            JobStatus::Cancelled => {
                lifecycle.apply_terminal(TerminalOutcome::Cancelled);
            }
            JobStatus::Pending | JobStatus::Running => {
                if remote_status == JobStatus::Running {
                    lifecycle.mark_running();
                }
                for phase in snapshot.phases {
                    lifecycle.apply_phase(phase.into());
                }
                lifecycle.sync_transcript(snapshot.messages);
            }
        }

        let settled = lifecycle.is_settled();
        self.settle(Channel::Poll);

        if remote_status.is_terminal() || settled {
            PollVerdict::Stop
        } else {
            PollVerdict::Continue
        }
    }

    /// Update the flags that follow from the tracked job's state
    fn settle(&mut self, channel: Channel) {
        let Some(lifecycle) = self.tracked.as_ref() else {
            return;
        };
        if !lifecycle.is_terminal() {
            return;
        }

        self.running = false;
        self.cancelling = false;

        let job = lifecycle.job();
        if job.status == JobStatus::Completed && self.history.record(job.clone()) {
            info!(
                job_id = %job.id,
                %channel,
                recommendation = ?job.recommendation,
                "job completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{AgentMessage, AnalysisRequest, JobId};
    use crate::phase::{Phase, PhaseStatus, PhaseUpdate};
    use chrono::Utc;

    fn tracked_store(id: &str) -> AnalysisStore {
        let request = AnalysisRequest::new("AAPL", "buying", "7-agent");
        let mut store = AnalysisStore::new(10);
        let ticket = store.begin_submission();
        store.track(ticket, Job::pending(JobId::from(id), &request, Utc::now()));
        store
    }

    fn phase_event(id: &str, name: &str, status: PhaseStatus) -> UpdateEvent {
        UpdateEvent::PhaseUpdate {
            job_id: JobId::from(id),
            phase: PhaseUpdate::new(name).with_status(status),
        }
    }

    fn completed(store: &AnalysisStore) -> Job {
        let mut job = store.tracked().map(|lc| lc.job().clone()).unwrap();
        job.status = JobStatus::Completed;
        job.recommendation = Some("BUY".to_string());
        job.confidence_score = Some(82);
        job
    }

    fn complete_event(job: &Job) -> UpdateEvent {
        UpdateEvent::JobComplete {
            job_id: job.id.clone(),
            snapshot: Box::new(job.clone()),
        }
    }

    #[test]
    fn test_stale_event_ignored() {
        let mut store = tracked_store("Y");
        let before = store.view();

        let disposition = store.apply_event(
            phase_event("X", "DataAnalyst", PhaseStatus::Running),
            Channel::Push,
        );

        assert_eq!(disposition, Disposition::Stale);
        assert_eq!(store.view(), before);
    }

    #[test]
    fn test_agent_response_promotes_pending_job() {
        let mut store = tracked_store("J1");

        let disposition = store.apply_event(
            UpdateEvent::AgentResponse {
                job_id: JobId::from("J1"),
                message: AgentMessage {
                    source: "DataAnalyst".to_string(),
                    content: "Revenue up 12% year over year".to_string(),
                    timestamp: None,
                },
            },
            Channel::Push,
        );

        assert_eq!(disposition, Disposition::Applied);
        let job = store.view().job.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.messages.len(), 1);
        assert_eq!(job.messages[0].source, "DataAnalyst");
    }

    #[test]
    fn test_end_to_end_submission_to_completion() {
        let mut store = tracked_store("J1");
        let view = store.view();
        assert_eq!(view.job.as_ref().map(|j| j.status), Some(JobStatus::Pending));
        assert!(view.job.as_ref().is_some_and(|j| j.phases.is_empty()));

        store.apply_event(phase_event("J1", "DataAnalyst", PhaseStatus::Running), Channel::Push);
        let job = store.view().job.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.phases.len(), 1);
        assert_eq!(job.phases[0].name, "DataAnalyst");
        assert_eq!(job.phases[0].status, PhaseStatus::Running);

        let snapshot = completed(&store);
        assert_eq!(
            store.apply_event(complete_event(&snapshot), Channel::Push),
            Disposition::Applied
        );
        assert_eq!(
            store.apply_event(complete_event(&snapshot), Channel::Push),
            Disposition::Ignored
        );

        let view = store.view();
        let job = view.job.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.recommendation.as_deref(), Some("BUY"));
        assert_eq!(job.confidence_score, Some(82));
        assert!(!view.running);
        assert_eq!(view.history.len(), 1);
        assert_eq!(view.history[0].id.as_str(), "J1");
    }

    #[test]
    fn test_cancel_then_late_completion() {
        let mut store = tracked_store("J1");
        store.apply_event(phase_event("J1", "DataAnalyst", PhaseStatus::Running), Channel::Push);
        store.begin_cancel(&JobId::from("J1"));
        store.cancel_acknowledged(&JobId::from("J1"), true);
        assert_eq!(store.view().job.map(|j| j.status), Some(JobStatus::Cancelled));

        let snapshot = completed(&store);
        store.apply_event(complete_event(&snapshot), Channel::Push);

        let view = store.view();
        assert_eq!(view.job.map(|j| j.status), Some(JobStatus::Completed));
        assert_eq!(view.history.len(), 1);
    }

    #[test]
    fn test_push_then_poll_terminal() {
        let mut store = tracked_store("J1");
        let snapshot = completed(&store);

        store.apply_event(complete_event(&snapshot), Channel::Push);
        let verdict = store.apply_snapshot(snapshot);

        assert_eq!(verdict, PollVerdict::Stop);
        assert_eq!(store.view().job.map(|j| j.status), Some(JobStatus::Completed));
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn test_poll_then_push_terminal() {
        let mut store = tracked_store("J1");
        let snapshot = completed(&store);

        assert_eq!(store.apply_snapshot(snapshot.clone()), PollVerdict::Stop);
        let disposition = store.apply_event(complete_event(&snapshot), Channel::Push);

        assert_eq!(disposition, Disposition::Ignored);
        assert_eq!(store.view().job.map(|j| j.status), Some(JobStatus::Completed));
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn test_conflicting_terminals_first_wins() {
        let mut store = tracked_store("J1");
        store.apply_event(
            UpdateEvent::Error {
                job_id: JobId::from("J1"),
                detail: "agents crashed".to_string(),
            },
            Channel::Push,
        );

        let snapshot = completed(&store);
        assert_eq!(store.apply_snapshot(snapshot), PollVerdict::Stop);

        let view = store.view();
        assert_eq!(view.job.map(|j| j.status), Some(JobStatus::Error));
        assert_eq!(view.last_error.as_deref(), Some("agents crashed"));
        assert!(view.history.is_empty());
    }

    #[test]
    fn test_running_snapshot_merges_phases() {
        let mut store = tracked_store("J1");
        store.apply_event(phase_event("J1", "A", PhaseStatus::Running), Channel::Push);

        let mut snapshot = store.tracked().map(|lc| lc.job().clone()).unwrap();
        snapshot.status = JobStatus::Running;
        snapshot.phases = vec![
            Phase::new("A", "DataAnalyst").with_status(PhaseStatus::Completed),
            Phase::new("B", "RiskManager").with_status(PhaseStatus::Running),
        ];

        assert_eq!(store.apply_snapshot(snapshot), PollVerdict::Continue);

        let job = store.view().job.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.phases.len(), 2);
        assert_eq!(job.phases[0].status, PhaseStatus::Completed);
        assert_eq!(job.phases[0].agent, "DataAnalyst");
    }

    #[test]
    fn test_poll_continues_past_local_cancel() {
        let mut store = tracked_store("J1");
        store.begin_cancel(&JobId::from("J1"));
        store.cancel_acknowledged(&JobId::from("J1"), true);

        let mut snapshot = store.tracked().map(|lc| lc.job().clone()).unwrap();
        snapshot.status = JobStatus::Running;
        assert_eq!(store.apply_snapshot(snapshot.clone()), PollVerdict::Continue);

        snapshot.status = JobStatus::Cancelled;
        assert_eq!(store.apply_snapshot(snapshot), PollVerdict::Stop);
        assert_eq!(store.view().job.map(|j| j.status), Some(JobStatus::Cancelled));
    }

    #[test]
    fn test_snapshot_for_untracked_job_stops_poll() {
        let mut store = tracked_store("J2");
        let request = AnalysisRequest::new("MSFT", "risk", "13-agent");
        let snapshot = Job::pending(JobId::from("J1"), &request, Utc::now());

        assert_eq!(store.apply_snapshot(snapshot), PollVerdict::Stop);
        assert_eq!(store.view().job.map(|j| j.subject), Some("AAPL".to_string()));
    }

    #[test]
    fn test_error_snapshot_without_detail() {
        let mut store = tracked_store("J1");
        let mut snapshot = store.tracked().map(|lc| lc.job().clone()).unwrap();
        snapshot.status = JobStatus::Error;

        assert_eq!(store.apply_snapshot(snapshot), PollVerdict::Stop);
        assert_eq!(store.view().last_error.as_deref(), Some("analysis failed"));
    }
}

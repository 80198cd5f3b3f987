//! Analysis session: submission gateway and observable state
//!
//! `AnalysisSession` owns the store behind one async mutex. The session's own
//! calls, the poll task and the push pump all mutate it through
//! [`Shared::update`], which also publishes a fresh [`SessionView`] to every
//! subscriber.

use crate::backend::{AnalysisBackend, AnalysisType, HealthStatus};
use crate::poller::{self, PollTiming};
use crate::push::{self, PushMessage};
use analysis_core::{
    AnalysisRequest, AnalysisStore, Error, Job, JobId, Result, SessionView, SubmissionTicket,
    WorkflowVariant, subscribe_frame,
};
use analysis_utils::ClientConfig;
use chrono::Utc;
use futures::Stream;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// State shared between the session and its background tasks
pub(crate) struct Shared {
    pub(crate) backend: Arc<dyn AnalysisBackend>,
    store: Mutex<AnalysisStore>,
    views: watch::Sender<SessionView>,
}

impl Shared {
    /// Mutate the store and publish the resulting view when it changed
    pub(crate) async fn update<R>(&self, f: impl FnOnce(&mut AnalysisStore) -> R) -> R {
        let mut store = self.store.lock().await;
        let result = f(&mut store);
        let view = store.view();
        self.views.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
        result
    }

    pub(crate) async fn is_tracking(&self, id: &JobId) -> bool {
        self.store.lock().await.is_tracking(id)
    }

    async fn is_current(&self, ticket: SubmissionTicket) -> bool {
        self.store.lock().await.is_current(ticket)
    }
}

/// Client-side session tracking at most one analysis job at a time
pub struct AnalysisSession {
    shared: Arc<Shared>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
    timing: PollTiming,
}

impl AnalysisSession {
    /// Create a session using the configured history limit and poll timing
    pub fn new(backend: Arc<dyn AnalysisBackend>, config: &ClientConfig) -> Self {
        Self::with_store(
            backend,
            AnalysisStore::new(config.history_limit),
            PollTiming::from(config),
        )
    }

    /// Create a session around an existing store
    pub fn with_store(
        backend: Arc<dyn AnalysisBackend>,
        store: AnalysisStore,
        timing: PollTiming,
    ) -> Self {
        let (views, _) = watch::channel(store.view());
        Self {
            shared: Arc::new(Shared {
                backend,
                store: Mutex::new(store),
                views,
            }),
            poll_task: Mutex::new(None),
            timing,
        }
    }

    /// Submit a new analysis job
    ///
    /// Any previously tracked job is dropped first. The returned id is
    /// already tracked and polled when this resolves, unless a `reset` or a
    /// newer `submit` ran while the start call was in flight; the backend's
    /// job is then left untracked.
    pub async fn submit(
        &self,
        subject: impl Into<String>,
        analysis_type: impl Into<String>,
        workflow: impl Into<WorkflowVariant>,
    ) -> Result<JobId> {
        let request = AnalysisRequest::new(subject, analysis_type, workflow);
        if let Err(err) = request.validate() {
            warn!(error = %err, "submission rejected");
            self.shared.update(|store| store.record_error(err.to_string())).await;
            return Err(err);
        }

        let ticket = self.shared.update(AnalysisStore::begin_submission).await;
        self.stop_polling().await;

        let job_id = match self.shared.backend.start_analysis(&request).await {
            Ok(job_id) => job_id,
            Err(err) => {
                let err = Error::from(err);
                warn!(subject = %request.subject, error = %err, "submission failed");
                self.shared
                    .update(|store| store.submission_failed(ticket, err.to_string()))
                    .await;
                return Err(err);
            }
        };

        info!(
            %job_id,
            subject = %request.subject,
            analysis_type = %request.analysis_type,
            workflow = %request.workflow,
            "analysis submitted"
        );
        let job = Job::pending(job_id.clone(), &request, Utc::now());
        if !self.shared.update(|store| store.track(ticket, job)).await {
            debug!(%job_id, "session moved on while starting, job left untracked");
            return Ok(job_id);
        }

        // Checked under the task lock so a concurrent reset either sees the
        // new task and aborts it or leaves this submission stale.
        let mut poll_task = self.poll_task.lock().await;
        if !self.shared.is_current(ticket).await {
            return Ok(job_id);
        }
        let task = tokio::spawn(poller::run(self.shared.clone(), job_id.clone(), self.timing));
        if let Some(previous) = poll_task.replace(task) {
            previous.abort();
        }

        Ok(job_id)
    }

    /// Ask the backend to cancel `job_id`
    ///
    /// Returns whether the backend accepted. Acceptance marks the job
    /// cancelled locally right away; polling carries on until the backend's
    /// own status confirms it. A request for a job that is not the tracked,
    /// active one is a no-op returning `false`.
    pub async fn cancel(&self, job_id: &JobId) -> Result<bool> {
        if !self.shared.update(|store| store.begin_cancel(job_id)).await {
            debug!(%job_id, "cancel ignored, job not active");
            return Ok(false);
        }

        match self.shared.backend.cancel(job_id).await {
            Ok(accepted) => {
                info!(%job_id, accepted, "cancel acknowledged");
                self.shared
                    .update(|store| store.cancel_acknowledged(job_id, accepted))
                    .await;
                Ok(accepted)
            }
            Err(err) => {
                let err = Error::from(err);
                warn!(%job_id, error = %err, "cancel failed");
                self.shared
                    .update(|store| store.cancel_failed(err.to_string()))
                    .await;
                Err(err)
            }
        }
    }

    /// Stop tracking the current job; history is kept
    pub async fn reset(&self) {
        self.shared.update(AnalysisStore::reset).await;
        self.stop_polling().await;
    }

    /// Register an observer; it sees the current view immediately and every
    /// change after it
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.shared.views.subscribe()
    }

    /// Current view
    pub fn snapshot(&self) -> SessionView {
        self.shared.views.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.views.borrow().running
    }

    pub fn is_cancelling(&self) -> bool {
        self.shared.views.borrow().cancelling
    }

    /// Frame the push transport should send to receive updates for the
    /// tracked job
    pub async fn subscription_frame(&self) -> Option<String> {
        self.shared
            .store
            .lock()
            .await
            .tracked_id()
            .map(subscribe_frame)
    }

    /// Feed a push transport into the session
    ///
    /// The returned task ends when the stream does.
    pub fn attach_push<S>(&self, messages: S) -> JoinHandle<()>
    where
        S: Stream<Item = PushMessage> + Send + 'static,
    {
        tokio::spawn(push::pump(self.shared.clone(), messages))
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        Ok(self.shared.backend.health().await?)
    }

    pub async fn analysis_types(&self) -> Result<Vec<AnalysisType>> {
        Ok(self.shared.backend.analysis_types().await?)
    }

    /// Jobs the backend still remembers, as opposed to the local history
    pub async fn remote_history(&self) -> Result<Vec<Job>> {
        Ok(self.shared.backend.history().await?)
    }

    /// One-off snapshot of any job, without touching session state
    pub async fn fetch_job(&self, job_id: &JobId) -> Result<Job> {
        Ok(self.shared.backend.fetch_job(job_id).await?)
    }

    async fn stop_polling(&self) {
        if let Some(task) = self.poll_task.lock().await.take() {
            task.abort();
        }
    }
}

impl Drop for AnalysisSession {
    fn drop(&mut self) {
        if let Some(task) = self.poll_task.get_mut().take() {
            task.abort();
        }
    }
}

//! Poll loop backing up the push channel
//!
//! After an initial delay the loop fetches the tracked job every interval and
//! folds each snapshot into the store. It ends on a terminal snapshot, when
//! the job is no longer tracked, or on the first failed fetch.

use crate::session::Shared;
use analysis_core::{JobId, PollVerdict};
use analysis_utils::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Delays driving the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    /// Wait before the first fetch
    pub initial_delay: Duration,
    /// Wait between subsequent fetches
    pub interval: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            interval: Duration::from_secs(2),
        }
    }
}

impl From<&ClientConfig> for PollTiming {
    fn from(config: &ClientConfig) -> Self {
        Self {
            initial_delay: config.poll_initial_delay,
            interval: config.poll_interval,
        }
    }
}

/// Poll `job_id` until the loop has nothing left to learn
pub(crate) async fn run(shared: Arc<Shared>, job_id: JobId, timing: PollTiming) {
    debug!(%job_id, ?timing, "poll loop started");
    let mut delay = timing.initial_delay;
    let mut fetches = 0_u32;

    loop {
        sleep(delay).await;
        delay = timing.interval;

        if !shared.is_tracking(&job_id).await {
            debug!(%job_id, "job no longer tracked, poll loop ending");
            return;
        }

        fetches += 1;
        let snapshot = match shared.backend.fetch_job(&job_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%job_id, fetches, error = %err, "status fetch failed, polling stopped");
                let detail = format!("status polling stopped: {err}");
                shared
                    .update(|store| {
                        if store.is_tracking(&job_id) {
                            store.record_error(detail);
                        }
                    })
                    .await;
                return;
            }
        };

        let status = snapshot.status;
        if shared.update(|store| store.apply_snapshot(snapshot)).await == PollVerdict::Stop {
            info!(%job_id, %status, fetches, "poll loop finished");
            return;
        }
    }
}

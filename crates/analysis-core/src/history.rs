//! Bounded history of finished jobs

use crate::job::{Job, JobId};
use std::collections::VecDeque;

/// Default number of finished jobs retained
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Most-recent-first list of finished jobs; the oldest entry is evicted
/// once the limit is reached
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    entries: VecDeque<Job>,
    limit: usize,
}

impl History {
    /// Create a history holding at most `limit` jobs (at least one)
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Record a finished job
    ///
    /// Returns `false` without touching the history when the job is already
    /// recorded.
    pub fn record(&mut self, job: Job) -> bool {
        if self.contains(&job.id) {
            return false;
        }
        self.entries.push_front(job);
        self.entries.truncate(self.limit);
        true
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.entries.iter().any(|job| &job.id == id)
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.entries.iter().find(|job| &job.id == id)
    }

    /// Iterate newest first
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::AnalysisRequest;
    use chrono::Utc;

    fn job(id: &str) -> Job {
        let request = AnalysisRequest::new("AAPL", "buying", "7-agent");
        Job::pending(JobId::from(id), &request, Utc::now())
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut history = History::default();
        assert!(history.record(job("J1")));
        assert!(!history.record(job("J1")));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_newest_first_and_eviction() {
        let mut history = History::new(2);
        history.record(job("J1"));
        history.record(job("J2"));
        history.record(job("J3"));

        let ids: Vec<_> = history.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["J3", "J2"]);
        assert!(!history.contains(&JobId::from("J1")));
    }

    #[test]
    fn test_zero_limit_keeps_one() {
        let mut history = History::new(0);
        history.record(job("J1"));
        history.record(job("J2"));
        assert_eq!(history.limit(), 1);
        assert_eq!(history.get(&JobId::from("J2")).map(|j| j.id.as_str()), Some("J2"));
    }
}

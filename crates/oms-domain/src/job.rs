//! Progress tracking for long-running batch jobs.
//!
//! A [`ProcessingStatus`] row is saved after every processed item so that
//! concurrent readers can observe the latest progress while the job is still
//! running.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    /// Stable string form, used for storage columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// Whether the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl std::str::FromStr for JobState {
    type Err = crate::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "running" => Ok(JobState::Running),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            other => Err(crate::DomainError::Validation {
                message: format!("unknown job state: {other}"),
            }),
        }
    }
}

/// Progress record for one batch job, keyed by `job_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    pub job_id: String,
    pub state: JobState,
    pub processed: u32,
    pub total: u32,
    pub percent: u8,
    #[serde(default)]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessingStatus {
    /// Creates a fresh pending record for `job_id`.
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            state: JobState::Pending,
            processed: 0,
            total: 0,
            percent: 0,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Marks the job running with `total` items ahead of it.
    pub fn mark_running(&mut self, total: u32) {
        self.state = JobState::Running;
        self.processed = 0;
        self.total = total;
        self.percent = 0;
        self.error = None;
        self.updated_at = Utc::now();
    }

    /// Records intermediate progress. A zero total yields zero percent.
    pub fn update_progress(&mut self, processed: u32, total: u32) {
        self.processed = processed;
        self.total = total;
        self.percent = if total == 0 {
            0
        } else {
            ((u64::from(processed) * 100) / u64::from(total)).min(100) as u8
        };
        self.updated_at = Utc::now();
    }

    /// Marks the job completed at 100 percent.
    pub fn mark_completed(&mut self) {
        self.state = JobState::Completed;
        self.processed = self.total;
        self.percent = 100;
        self.updated_at = Utc::now();
    }

    /// Marks the job failed, keeping whatever progress was reached.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.state = JobState::Failed;
        self.error = Some(reason.into());
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_pending() {
        let job = ProcessingStatus::new("job-1");
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.percent, 0);
        assert!(!job.state.is_terminal());
    }

    #[test]
    fn progress_updates_percent() {
        let mut job = ProcessingStatus::new("job-1");
        job.mark_running(4);
        assert_eq!(job.state, JobState::Running);

        job.update_progress(1, 4);
        assert_eq!(job.percent, 25);
        job.update_progress(3, 4);
        assert_eq!(job.percent, 75);
    }

    #[test]
    fn zero_total_yields_zero_percent() {
        let mut job = ProcessingStatus::new("job-1");
        job.mark_running(0);
        job.update_progress(0, 0);
        assert_eq!(job.percent, 0);

        // Completing an empty job still reports 100.
        job.mark_completed();
        assert_eq!(job.percent, 100);
        assert!(job.state.is_terminal());
    }

    #[test]
    fn failure_preserves_progress_and_records_reason() {
        let mut job = ProcessingStatus::new("job-1");
        job.mark_running(10);
        job.update_progress(6, 10);
        job.mark_failed("storage unavailable");

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.processed, 6);
        assert_eq!(job.percent, 60);
        assert_eq!(job.error.as_deref(), Some("storage unavailable"));
    }

    #[test]
    fn job_state_round_trips_through_storage_form() {
        for state in [
            JobState::Pending,
            JobState::Running,
            JobState::Completed,
            JobState::Failed,
        ] {
            assert_eq!(state.as_str().parse::<JobState>().unwrap(), state);
        }
    }
}

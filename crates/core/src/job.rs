//! Long-running blueprint jobs
//!
//! A [`Job`] is created from the submission response and only ever changes
//! by applying a later status snapshot from the server. Terminal states are
//! absorbing.

use crate::error::ScoutError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether an observed move from `self` to `next` is legal.
    ///
    /// Polling can miss the running phase, so pending may jump straight to a
    /// terminal state. Running never goes back to pending.
    pub fn can_transition(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        !matches!((self, next), (JobStatus::Running, JobStatus::Pending))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a completed job's result lives
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ResultRef {
    Inline(Value),
    /// Path (or absolute URL) to fetch the result from
    Remote(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub code: String,
    pub message: String,
}

/// Error payload as sent by the server: either an object or a bare string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireJobError {
    Detailed {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    Message(String),
}

impl From<WireJobError> for JobError {
    fn from(wire: WireJobError) -> Self {
        match wire {
            WireJobError::Detailed { code, message } => JobError {
                code: code.unwrap_or_else(|| "UNKNOWN".to_string()),
                message: message.unwrap_or_else(|| "Job failed without a message".to_string()),
            },
            WireJobError::Message(message) => JobError {
                code: "UNKNOWN".to_string(),
                message,
            },
        }
    }
}

/// Job state as reported by the submission and status endpoints.
/// Only the submission response is required to carry the id.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSnapshot {
    #[serde(default, alias = "job_id", alias = "jobId")]
    pub id: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default, alias = "resultUrl", alias = "result_ref")]
    pub result_url: Option<String>,
    #[serde(default)]
    error: Option<WireJobError>,
    #[serde(default, alias = "pollUrl", alias = "status_url")]
    pub poll_url: Option<String>,
}

impl JobSnapshot {
    pub fn from_value(value: Value) -> Result<Self, ScoutError> {
        serde_json::from_value(value).map_err(|e| ScoutError::Upstream {
            status: None,
            message: format!("Malformed job payload: {e}"),
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransitionError {
    #[error("status update for job {got} applied to job {expected}")]
    IdMismatch { expected: String, got: String },

    #[error("illegal job transition {from} -> {to}")]
    Illegal { from: JobStatus, to: JobStatus },
}

impl From<TransitionError> for ScoutError {
    fn from(err: TransitionError) -> Self {
        ScoutError::Upstream {
            status: None,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// 0-100
    pub progress: u8,
    pub result: Option<ResultRef>,
    pub error: Option<JobError>,
    /// Server-provided polling reference, if any
    pub poll_path: Option<String>,
}

impl Job {
    /// Start tracking the job a submission response describes
    pub fn from_snapshot(snapshot: JobSnapshot) -> Result<Self, ScoutError> {
        let id = snapshot.id.clone().ok_or_else(|| ScoutError::Upstream {
            status: None,
            message: "Job submission response has no job id".to_string(),
        })?;
        let mut job = Job {
            id,
            status: snapshot.status,
            progress: 0,
            result: None,
            error: None,
            poll_path: None,
        };
        job.absorb(snapshot);
        Ok(job)
    }

    /// Apply a status snapshot from the server. A snapshot without an id is
    /// taken to describe this job.
    pub fn apply(&mut self, snapshot: JobSnapshot) -> Result<(), TransitionError> {
        if let Some(got) = snapshot.id.as_ref().filter(|got| **got != self.id) {
            return Err(TransitionError::IdMismatch {
                expected: self.id.clone(),
                got: got.clone(),
            });
        }

        if !self.status.can_transition(snapshot.status) {
            return Err(TransitionError::Illegal {
                from: self.status,
                to: snapshot.status,
            });
        }

        self.status = snapshot.status;
        self.absorb(snapshot);
        Ok(())
    }

    fn absorb(&mut self, snapshot: JobSnapshot) {
        if let Some(progress) = snapshot.progress {
            self.progress = progress.clamp(0.0, 100.0).round() as u8;
        }
        if self.status == JobStatus::Completed {
            self.progress = 100;
        }
        if let Some(poll_url) = snapshot.poll_url {
            self.poll_path = Some(poll_url);
        }
        if let Some(result) = snapshot.result.filter(|v| !v.is_null()) {
            self.result = Some(ResultRef::Inline(result));
        } else if let Some(url) = snapshot.result_url {
            self.result = Some(ResultRef::Remote(url));
        }
        if let Some(error) = snapshot.error {
            self.error = Some(error.into());
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn status_path(&self) -> String {
        self.poll_path
            .clone()
            .unwrap_or_else(|| crate::request::job_status_path(&self.id))
    }

    /// Domain error for a job the server reported as failed
    pub fn failure(&self) -> ScoutError {
        let error = self.error.clone().unwrap_or(JobError {
            code: "UNKNOWN".to_string(),
            message: "Job failed without a message".to_string(),
        });
        ScoutError::JobFailed {
            job_id: self.id.clone(),
            code: error.code,
            message: error.message,
        }
    }
}

/// Poll interval schedule: `initial * factor^attempt`, capped at `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub factor: u32,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            factor: 2,
            max: Duration::from_secs(10),
        }
    }
}

impl Backoff {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial: interval,
            factor: 1,
            max: interval,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = self.factor.max(1).checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(multiplier)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: Value) -> JobSnapshot {
        JobSnapshot::from_value(value).unwrap()
    }

    // ============================================================================
    // status machine tests
    // ============================================================================

    #[test]
    fn test_terminal_states_are_absorbing() {
        use JobStatus::*;
        for terminal in [Completed, Failed, Cancelled] {
            for next in [Pending, Running, Completed, Failed, Cancelled] {
                assert_eq!(terminal.can_transition(next), terminal == next);
            }
        }
    }

    #[test]
    fn test_running_never_returns_to_pending() {
        assert!(!JobStatus::Running.can_transition(JobStatus::Pending));
        assert!(JobStatus::Running.can_transition(JobStatus::Running));
        assert!(JobStatus::Running.can_transition(JobStatus::Completed));
    }

    #[test]
    fn test_pending_may_skip_running() {
        assert!(JobStatus::Pending.can_transition(JobStatus::Running));
        assert!(JobStatus::Pending.can_transition(JobStatus::Completed));
        assert!(JobStatus::Pending.can_transition(JobStatus::Failed));
    }

    // ============================================================================
    // snapshot tests
    // ============================================================================

    #[test]
    fn test_snapshot_accepts_aliases() {
        let s = snapshot(json!({
            "jobId": "j1",
            "status": "running",
            "progress": 42.4,
            "pollUrl": "/v1/jobs/j1/status"
        }));
        let job = Job::from_snapshot(s).unwrap();
        assert_eq!(job.id, "j1");
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress, 42);
        assert_eq!(job.status_path(), "/v1/jobs/j1/status");
    }

    #[test]
    fn test_snapshot_rejects_unknown_status() {
        assert!(JobSnapshot::from_value(json!({"id": "j1", "status": "exploded"})).is_err());
    }

    #[test]
    fn test_default_status_path() {
        let job = Job::from_snapshot(snapshot(json!({"id": "j9", "status": "pending"}))).unwrap();
        assert_eq!(job.status_path(), "/v1/jobs/j9");
    }

    #[test]
    fn test_apply_completed_with_inline_result() {
        let mut job = Job::from_snapshot(snapshot(json!({"id": "j1", "status": "pending"}))).unwrap();
        job.apply(snapshot(json!({
            "id": "j1",
            "status": "completed",
            "result": {"summary": "ok"}
        })))
        .unwrap();
        assert!(job.is_terminal());
        assert_eq!(job.progress, 100);
        assert_eq!(job.result, Some(ResultRef::Inline(json!({"summary": "ok"}))));
    }

    #[test]
    fn test_apply_completed_with_result_url() {
        let mut job = Job::from_snapshot(snapshot(json!({"id": "j1", "status": "running"}))).unwrap();
        job.apply(snapshot(json!({
            "id": "j1",
            "status": "completed",
            "result_url": "/v1/blueprints/b7"
        })))
        .unwrap();
        assert_eq!(job.result, Some(ResultRef::Remote("/v1/blueprints/b7".to_string())));
    }

    #[test]
    fn test_apply_failed_carries_error() {
        let mut job = Job::from_snapshot(snapshot(json!({"id": "j1", "status": "running"}))).unwrap();
        job.apply(snapshot(json!({
            "id": "j1",
            "status": "failed",
            "error": {"code": "QUOTA_EXCEEDED", "message": "No credits left"}
        })))
        .unwrap();
        match job.failure() {
            ScoutError::JobFailed { code, message, .. } => {
                assert_eq!(code, "QUOTA_EXCEEDED");
                assert_eq!(message, "No credits left");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_string_error_payload() {
        let job = Job::from_snapshot(snapshot(json!({
            "id": "j1",
            "status": "failed",
            "error": "boom"
        }))).unwrap();
        assert_eq!(
            job.error,
            Some(JobError {
                code: "UNKNOWN".to_string(),
                message: "boom".to_string()
            })
        );
    }

    #[test]
    fn test_apply_rejects_leaving_terminal_state() {
        let mut job = Job::from_snapshot(snapshot(json!({"id": "j1", "status": "cancelled"}))).unwrap();
        let err = job
            .apply(snapshot(json!({"id": "j1", "status": "running"})))
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::Illegal {
                from: JobStatus::Cancelled,
                to: JobStatus::Running
            }
        );
        assert_eq!(job.status, JobStatus::Cancelled);
    }

    #[test]
    fn test_apply_rejects_other_job() {
        let mut job = Job::from_snapshot(snapshot(json!({"id": "j1", "status": "pending"}))).unwrap();
        assert!(matches!(
            job.apply(snapshot(json!({"id": "j2", "status": "running"}))),
            Err(TransitionError::IdMismatch { .. })
        ));
    }

    #[test]
    fn test_apply_status_without_id() {
        let mut job = Job::from_snapshot(snapshot(json!({"job_id": "j1", "status": "pending"}))).unwrap();
        job.apply(snapshot(json!({"status": "completed", "result": {"summary": "x"}})))
            .unwrap();
        assert_eq!(job.id, "j1");
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result, Some(ResultRef::Inline(json!({"summary": "x"}))));
    }

    #[test]
    fn test_submission_without_id_is_rejected() {
        let err = Job::from_snapshot(snapshot(json!({"status": "pending"}))).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UpstreamApiError);
        assert!(err.to_string().contains("no job id"));
    }

    #[test]
    fn test_progress_is_clamped() {
        let job = Job::from_snapshot(snapshot(json!({"id": "j1", "status": "running", "progress": 250}))).unwrap();
        assert_eq!(job.progress, 100);
    }

    // ============================================================================
    // backoff tests
    // ============================================================================

    #[test]
    fn test_backoff_grows_then_caps() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(0), Duration::from_secs(1));
        assert_eq!(backoff.delay(1), Duration::from_secs(2));
        assert_eq!(backoff.delay(3), Duration::from_secs(8));
        assert_eq!(backoff.delay(4), Duration::from_secs(10));
        assert_eq!(backoff.delay(60), Duration::from_secs(10));
    }

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::fixed(Duration::from_millis(250));
        for attempt in 0..5 {
            assert_eq!(backoff.delay(attempt), Duration::from_millis(250));
        }
    }
}

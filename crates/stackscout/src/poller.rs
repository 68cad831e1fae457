//! Drives a submitted job to a terminal state
//!
//! Polls are strictly sequential. Cancellation and the overall deadline are
//! checked between polls and while waiting, never in the middle of a call.
//! Stopping early does not cancel the job on the server.

use serde_json::Value;
use stackscout_core::job::{Backoff, Job, JobStatus, ResultRef};
use stackscout_core::ScoutError;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::PollConfig;
use crate::remote::{RemoteClient, Transport};

/// Receives every job state the poller applies, submission included
pub trait ProgressObserver: Send + Sync {
    fn on_update(&self, job: &Job);
}

impl<F> ProgressObserver for F
where
    F: Fn(&Job) + Send + Sync,
{
    fn on_update(&self, job: &Job) {
        self(job)
    }
}

/// Observer for callers that don't report progress
pub struct Silent;

impl ProgressObserver for Silent {
    fn on_update(&self, _job: &Job) {}
}

/// A completed job with its resolved result
#[derive(Debug, Clone)]
pub struct CompletedJob {
    pub job: Job,
    pub result: Value,
}

pub struct JobPoller<T> {
    client: RemoteClient<T>,
    backoff: Backoff,
    deadline: Duration,
}

impl<T: Transport> JobPoller<T> {
    pub fn new(client: RemoteClient<T>, config: &PollConfig) -> Self {
        Self {
            client,
            backoff: config.backoff(),
            deadline: config.deadline,
        }
    }

    /// Submit a blueprint request; the returned job is what the server accepted
    pub async fn submit(&self, body: Value) -> Result<Job, ScoutError> {
        let snapshot = self.client.submit_blueprint(body).await?;
        let job = Job::from_snapshot(snapshot)?;
        log::info!("submitted job {} ({})", job.id, job.status);
        Ok(job)
    }

    /// Poll an existing job until it is terminal, the deadline passes or the
    /// caller cancels
    pub async fn wait(
        &self,
        mut job: Job,
        cancel: &CancellationToken,
        observer: &dyn ProgressObserver,
    ) -> Result<CompletedJob, ScoutError> {
        let deadline = Instant::now() + self.deadline;
        let mut attempt = 0;

        observer.on_update(&job);

        while !job.is_terminal() {
            if cancel.is_cancelled() {
                return Err(stopped_waiting(&job));
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(self.deadline_exceeded(&job));
            }

            let delay = self.backoff.delay(attempt).min(deadline - now);
            tokio::select! {
                _ = cancel.cancelled() => return Err(stopped_waiting(&job)),
                _ = tokio::time::sleep(delay) => {}
            }

            if Instant::now() >= deadline {
                return Err(self.deadline_exceeded(&job));
            }

            attempt += 1;
            let snapshot = self.client.job_status(&job.status_path()).await?;
            job.apply(snapshot)?;
            log::debug!(
                "job {} poll #{attempt}: {} ({}%)",
                job.id,
                job.status,
                job.progress
            );
            observer.on_update(&job);
        }

        log::info!("job {} finished as {}", job.id, job.status);
        self.resolve(job).await
    }

    async fn resolve(&self, job: Job) -> Result<CompletedJob, ScoutError> {
        match job.status {
            JobStatus::Completed => {
                let result = match &job.result {
                    Some(ResultRef::Inline(value)) => value.clone(),
                    Some(ResultRef::Remote(reference)) => {
                        self.client.fetch_result(reference).await?
                    }
                    None => {
                        return Err(ScoutError::Upstream {
                            status: None,
                            message: format!("Job {} completed without a result", job.id),
                        })
                    }
                };
                Ok(CompletedJob { job, result })
            }
            JobStatus::Failed => Err(job.failure()),
            JobStatus::Cancelled => Err(ScoutError::Cancelled(format!(
                "Job {} was cancelled by the server",
                job.id
            ))),
            JobStatus::Pending | JobStatus::Running => Err(ScoutError::Internal(format!(
                "Job {} resolved while still {}",
                job.id, job.status
            ))),
        }
    }

    fn deadline_exceeded(&self, job: &Job) -> ScoutError {
        log::warn!("gave up on job {} after {:?}", job.id, self.deadline);
        ScoutError::Timeout {
            operation: format!("Waiting for job {} (last status: {})", job.id, job.status),
            after_ms: self.deadline.as_millis() as u64,
        }
    }
}

fn stopped_waiting(job: &Job) -> ScoutError {
    log::info!("stopped waiting for job {}", job.id);
    ScoutError::Cancelled(format!(
        "Stopped waiting for job {}; it may still be running on the server",
        job.id
    ))
}

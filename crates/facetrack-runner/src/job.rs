//! Job submission and polling.

use metrics::counter;
use reqwest::StatusCode;
use tracing::debug;

use facetrack_ams::AmsResult;
use facetrack_models::{CreateJob, Job};

use crate::error::{RunnerError, RunnerResult, Step, StepContext};
use crate::pipeline::Pipeline;
use crate::retry::FailureTracker;
use crate::upload::UploadOutcome;

/// Consecutive poll failures logged before suppression.
const MAX_LOGGED_POLL_FAILURES: u32 = 5;

impl Pipeline {
    /// Submit a job running the processor over the uploaded asset.
    ///
    /// The task configuration is the template file, sent verbatim.
    pub async fn submit_job(&self, upload: &UploadOutcome) -> RunnerResult<String> {
        let log = &self.logger;
        log.log_start(Step::SubmitJob);

        let path = &self.config.task_template_path;
        let configuration = tokio::fs::read_to_string(path).await.map_err(|e| {
            RunnerError::config_error(format!("cannot read task template {}: {}", path.display(), e))
        })?;

        let input_uri = self.ams.asset_uri(&upload.asset_id).step(Step::SubmitJob)?;
        let body = CreateJob::single_task(
            self.config.output_asset_name()?,
            input_uri,
            &upload.processor_id,
            configuration,
        );

        let job: Job = self
            .ams
            .create_job(&body)
            .await
            .and_then(|r| r.entity(StatusCode::CREATED, "create_job"))
            .step(Step::SubmitJob)?;

        log.log_value(Step::SubmitJob, "Media Job Id", &job.id);
        Ok(job.id)
    }

    /// Poll the job until the service stamps its end time.
    ///
    /// Returns the URI of the job's output assets collection.
    pub async fn poll_job(&self, job_id: &str) -> RunnerResult<String> {
        let log = &self.logger;
        let policy = &self.config.poll;
        let mut tracker = FailureTracker::new(MAX_LOGGED_POLL_FAILURES);
        let mut attempt = 0u32;

        log.log_start(Step::PollJob);

        loop {
            attempt += 1;
            counter!("facetrack_job_polls_total").increment(1);

            match self.fetch_job(job_id).await {
                Ok(job) => {
                    tracker.record_success();
                    log.log_value(Step::PollJob, "Media Job Status", job.state_label());

                    if job.is_finished() {
                        let uri = job.output_assets_uri().ok_or_else(|| {
                            RunnerError::missing_output(
                                Step::PollJob,
                                format!("job {} finished without output assets", job_id),
                            )
                        })?;
                        debug!(job_id = %job_id, attempts = attempt, "Job finished");
                        return Ok(uri.to_string());
                    }
                }
                Err(e) if e.is_retryable() => {
                    counter!("facetrack_job_poll_failures_total").increment(1);
                    if tracker.record_failure(e.to_string()) {
                        log.log_warning(
                            Step::PollJob,
                            &format!("poll {} of job {} failed, retrying: {}", attempt, job_id, e),
                        );
                    }
                }
                Err(e) => return Err(e).step(Step::PollJob),
            }

            if policy.is_exhausted(attempt) {
                if let Some(reason) = tracker.last_failure() {
                    debug!(job_id = %job_id, last_failure = reason, "Giving up on job");
                }
                return Err(RunnerError::PollExhausted {
                    job_id: job_id.to_string(),
                    attempts: attempt,
                });
            }

            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    async fn fetch_job(&self, job_id: &str) -> AmsResult<Job> {
        self.ams
            .list_jobs(Some(job_id))
            .await?
            .entity(StatusCode::OK, "list_jobs")
    }
}

//! Submission workflow.
//!
//! Takes a finished capture artifact through upload, same-day conflict
//! negotiation and status polling until the remote job reaches a terminal
//! state. The protocol is strictly sequential — at most one request is in
//! flight at any moment, and poll ticks never overlap because each status
//! fetch is awaited inside the tick loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::capture::AudioArtifact;

use super::confirm::ConflictDecider;
use super::endpoint::{EndpointError, JobStatus, ScoreEndpoint, SubmitReply};
use super::results::ResultsHook;
use super::status::{SubmitPhase, SubmitStatusHandle};
use super::SubmitError;

const MSG_UPLOADING: &str = "Analyzing and uploading your recording…";
const MSG_OVERWRITING: &str = "Overwriting today's entry…";
const MSG_SCORING: &str = "Upload complete. Detailed scoring in progress…";
const MSG_JOB_FAILED: &str = "Detailed scoring failed. Please try again.";
const MSG_SOFT_TIMEOUT: &str =
    "Scoring is taking longer than expected. Check your dashboard in a few minutes.";
const MSG_CANCELLED: &str = "Submission cancelled — today's entry was kept.";
const MSG_MISSING_JOB_ID: &str = "The server did not return a job id. Please try again.";

/// Poll cadence and budget for the job-status loop.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1500),
            max_attempts: 20,
        }
    }
}

/// Terminal result of a submission that made it to polling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubmitOutcome {
    /// The job finished; the score is whatever the server reported.
    Scored { score: Option<f64> },
    /// The remote job reported an explicit failure.
    JobFailed,
    /// The attempt budget ran out with the job still running. Informational,
    /// not an error — the result will appear on the dashboard later.
    StillProcessing,
}

/// State machine for one artifact's journey to a score.
pub struct SubmissionWorkflow {
    endpoint: Arc<dyn ScoreEndpoint>,
    decider: Arc<dyn ConflictDecider>,
    hook: Option<Box<dyn ResultsHook>>,
    status: SubmitStatusHandle,
    poll: PollSettings,
    redirect_delay: Duration,
    artifact: Option<AudioArtifact>,
    job_id: Option<String>,
}

impl SubmissionWorkflow {
    pub fn new(
        endpoint: Arc<dyn ScoreEndpoint>,
        decider: Arc<dyn ConflictDecider>,
        status: SubmitStatusHandle,
    ) -> Self {
        Self {
            endpoint,
            decider,
            hook: None,
            status,
            poll: PollSettings::default(),
            redirect_delay: Duration::from_millis(800),
            artifact: None,
            job_id: None,
        }
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    pub fn with_results_hook(mut self, hook: Box<dyn ResultsHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn status(&self) -> SubmitStatusHandle {
        self.status.clone()
    }

    /// The artifact currently eligible for (re)submission.
    pub fn artifact(&self) -> Option<&AudioArtifact> {
        self.artifact.as_ref()
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    /// Hand an artifact to the workflow, replacing any previous one and
    /// resetting the machine to Idle. Empty artifacts never get this far
    /// into the pipeline.
    pub async fn load_artifact(&mut self, artifact: AudioArtifact) -> Result<(), SubmitError> {
        if artifact.is_empty() {
            return Err(SubmitError::NoArtifact);
        }
        debug!(
            "Loaded {} byte {} artifact for submission",
            artifact.len(),
            artifact.media_type()
        );
        self.artifact = Some(artifact);
        self.job_id = None;
        self.status.reset().await;
        Ok(())
    }

    /// Run the full protocol for the loaded artifact.
    ///
    /// Any error returns the workflow to Idle with the artifact still
    /// loaded; calling `submit()` again is the retry path. Nothing here
    /// retries on its own — the overwrite negotiation is user-gated, not
    /// automatic.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, SubmitError> {
        if self.status.get().await.phase != SubmitPhase::Idle {
            return Err(SubmitError::Busy);
        }
        let artifact = match self.artifact.as_ref() {
            Some(artifact) if !artifact.is_empty() => artifact,
            _ => return Err(SubmitError::NoArtifact),
        };

        self.status
            .set_phase(SubmitPhase::Uploading, MSG_UPLOADING)
            .await;
        info!("Submitting {} byte recording", artifact.len());

        let reply = match self.endpoint.submit(artifact, false).await {
            Ok(reply) => reply,
            Err(e) => return Err(self.fail_to_idle(e).await),
        };

        let job_id = match reply {
            SubmitReply::Accepted { job_id } => job_id,
            SubmitReply::Conflict { message } => {
                info!("Server reported a same-day conflict, asking the user");
                self.status
                    .set_phase(SubmitPhase::AwaitingConflictDecision, message.clone())
                    .await;

                if !self.decider.confirm_overwrite(&message).await {
                    info!("Overwrite declined, submission abandoned");
                    self.status.idle_after_failure(MSG_CANCELLED).await;
                    return Err(SubmitError::ConflictDeclined);
                }

                self.status
                    .set_phase(SubmitPhase::Overwriting, MSG_OVERWRITING)
                    .await;
                match self.endpoint.submit(artifact, true).await {
                    Ok(SubmitReply::Accepted { job_id }) => job_id,
                    Ok(SubmitReply::Conflict { .. }) => {
                        let e = EndpointError::Rejected {
                            status: 409,
                            detail: "conflict reported despite the overwrite directive"
                                .to_string(),
                        };
                        return Err(self.fail_to_idle(e).await);
                    }
                    Err(e) => return Err(self.fail_to_idle(e).await),
                }
            }
        };

        // An HTTP success without a job id is not a success.
        let job_id = match job_id {
            Some(id) => id,
            None => {
                warn!("Upload accepted but the response carried no job id");
                self.status.idle_after_failure(MSG_MISSING_JOB_ID).await;
                return Err(SubmitError::MissingJobId);
            }
        };

        info!("Scoring job created: {}", job_id);
        self.job_id = Some(job_id.clone());
        self.status.submitted(job_id.clone(), MSG_SCORING).await;

        self.status.set_phase(SubmitPhase::Polling, MSG_SCORING).await;
        let outcome = self.poll_job(&job_id).await;

        match outcome {
            SubmitOutcome::Scored { score } => {
                let message = match score {
                    Some(score) => format!("Scoring complete! Score: {}", format_score(score)),
                    None => "Scoring complete!".to_string(),
                };
                info!("Job {} finished: {}", job_id, message);
                self.status.finished(score, message).await;

                // Leave the score on screen briefly, then hand off to the
                // dashboard.
                sleep(self.redirect_delay).await;
                if let Some(hook) = &self.hook {
                    if let Err(e) = hook.on_scored(score).await {
                        warn!("Results hook failed: {}", e);
                    }
                }
            }
            SubmitOutcome::JobFailed => {
                warn!("Job {} failed remotely", job_id);
                self.status.set_phase(SubmitPhase::Failed, MSG_JOB_FAILED).await;
            }
            SubmitOutcome::StillProcessing => {
                info!(
                    "Job {} still running after {} attempts, handing off to the dashboard",
                    job_id, self.poll.max_attempts
                );
                self.status
                    .set_phase(SubmitPhase::Failed, MSG_SOFT_TIMEOUT)
                    .await;
            }
        }

        Ok(outcome)
    }

    /// Fixed-interval status polling.
    ///
    /// One request per tick, awaited inline, so cycles never overlap; missed
    /// ticks are delayed rather than bursted. A failed fetch is absorbed and
    /// consumes an attempt exactly like a `running` response.
    async fn poll_job(&self, job_id: &str) -> SubmitOutcome {
        let mut ticker = interval(self.poll.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // the immediate tick; the first request waits one interval

        for attempt in 1..=self.poll.max_attempts {
            ticker.tick().await;
            self.status.set_poll_attempts(attempt).await;

            match self.endpoint.job_status(job_id).await {
                Ok(JobStatus::Finished { score }) => {
                    return SubmitOutcome::Scored { score };
                }
                Ok(JobStatus::Failed) => {
                    return SubmitOutcome::JobFailed;
                }
                Ok(JobStatus::Running) => {}
                Err(e) => {
                    // Transient; the next tick will ask again.
                    debug!("Poll attempt {} failed: {}", attempt, e);
                }
            }
        }

        SubmitOutcome::StillProcessing
    }

    async fn fail_to_idle(&self, error: EndpointError) -> SubmitError {
        warn!("Upload failed: {}", error);
        let (submit_error, message) = match error {
            EndpointError::Network(detail) => (
                SubmitError::Network(detail),
                "A network error occurred. Please try again.".to_string(),
            ),
            EndpointError::Rejected { status, detail } => {
                let message = format!("Upload failed: {detail}");
                (SubmitError::Rejected { status, detail }, message)
            }
        };
        self.status.idle_after_failure(message).await;
        submit_error
    }
}

fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{score:.0}")
    } else {
        format!("{score}")
    }
}

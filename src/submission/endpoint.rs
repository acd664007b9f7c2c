//! Remote job system contract.
//!
//! The workflow talks to the scoring server only through this trait, so the
//! protocol can be exercised end to end without a network.

use async_trait::async_trait;
use thiserror::Error;

use crate::capture::AudioArtifact;

/// Reply to an upload request that the server actually answered.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitReply {
    /// The upload was taken. A well-behaved server includes the job id;
    /// its absence is a distinct failure the workflow surfaces.
    Accepted { job_id: Option<String> },
    /// An entry already exists for today; the server asks before replacing
    /// it. `message` is the human-readable prompt to show the user.
    Conflict { message: String },
}

/// Status of a scoring job, as reported by the remote system.
///
/// The workflow never computes this — anything the server reports that is
/// not terminal keeps the poll loop going.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JobStatus {
    Running,
    Finished { score: Option<f64> },
    Failed,
}

/// Failures between us and the server.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// Transport never delivered a response.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered and said no (non-success HTTP status, or an
    /// application-level rejection in a success envelope).
    #[error("server rejected the request ({status}): {detail}")]
    Rejected { status: u16, detail: String },
}

/// The scoring server: accepts an artifact with an overwrite directive and
/// answers job status queries.
#[async_trait]
pub trait ScoreEndpoint: Send + Sync {
    async fn submit(
        &self,
        artifact: &AudioArtifact,
        overwrite: bool,
    ) -> Result<SubmitReply, EndpointError>;

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, EndpointError>;
}

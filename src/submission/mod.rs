pub mod confirm;
pub mod endpoint;
pub mod http;
pub mod results;
pub mod status;
pub mod workflow;

pub use confirm::{ConflictDecider, ConflictPolicy, PolicyDecider, TerminalDecider};
pub use endpoint::{EndpointError, JobStatus, ScoreEndpoint, SubmitReply};
pub use http::HttpScoreEndpoint;
pub use results::{DashboardRedirect, ResultsHook};
pub use status::{SubmitPhase, SubmitStatus, SubmitStatusHandle};
pub use workflow::{PollSettings, SubmissionWorkflow, SubmitOutcome};

use thiserror::Error;

/// Failures that end a submission attempt. All of them return the workflow
/// to Idle with the artifact still loaded; calling `submit()` again is the
/// retry path — nothing retries automatically.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("no recorded audio to submit")]
    NoArtifact,

    #[error("a submission is already running")]
    Busy,

    #[error("network error during upload: {0}")]
    Network(String),

    #[error("upload rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("the server accepted the upload but returned no job id")]
    MissingJobId,

    #[error("overwrite declined; submission abandoned")]
    ConflictDeclined,
}

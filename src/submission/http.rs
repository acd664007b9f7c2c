//! HTTP client for the scoring server's upload and job-status endpoints.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::capture::AudioArtifact;

use super::endpoint::{EndpointError, JobStatus, ScoreEndpoint, SubmitReply};

const UPLOAD_FIELD: &str = "audio_data";
const UPLOAD_FILENAME: &str = "recording.wav";

/// `ScoreEndpoint` over the real server.
pub struct HttpScoreEndpoint {
    client: reqwest::Client,
    base_url: String,
}

impl HttpScoreEndpoint {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ScoreEndpoint for HttpScoreEndpoint {
    async fn submit(
        &self,
        artifact: &AudioArtifact,
        overwrite: bool,
    ) -> Result<SubmitReply, EndpointError> {
        let part = Part::bytes(artifact.bytes().to_vec())
            .file_name(UPLOAD_FILENAME)
            .mime_str(artifact.media_type())
            .map_err(|e| EndpointError::Network(e.to_string()))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let url = format!("{}/api/upload", self.base_url);
        let mut request = self.client.post(&url).multipart(form);
        if overwrite {
            request = request.query(&[("overwrite", "true")]);
        }

        debug!("POST {} (overwrite: {})", url, overwrite);
        let response = request
            .send()
            .await
            .map_err(|e| EndpointError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EndpointError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(EndpointError::Rejected {
                status: status.as_u16(),
                detail: body,
            });
        }

        parse_upload_response(status.as_u16(), &body)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, EndpointError> {
        let url = format!("{}/api/job_status/{}", self.base_url, job_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EndpointError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EndpointError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(EndpointError::Rejected {
                status: status.as_u16(),
                detail: body,
            });
        }

        parse_status_response(status.as_u16(), &body)
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    already: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: String,
    #[serde(default)]
    score: Option<f64>,
}

fn parse_upload_response(status: u16, body: &str) -> Result<SubmitReply, EndpointError> {
    let response: UploadResponse =
        serde_json::from_str(body).map_err(|_| EndpointError::Rejected {
            status,
            detail: "unparseable upload response".to_string(),
        })?;

    if response.already {
        let message = response.message.unwrap_or_else(|| {
            "A recording already exists for today. Overwrite it?".to_string()
        });
        return Ok(SubmitReply::Conflict { message });
    }

    // An application-level rejection inside a success envelope.
    if response.success == Some(false) {
        let detail = response
            .message
            .or(response.error)
            .unwrap_or_else(|| "upload rejected".to_string());
        return Err(EndpointError::Rejected { status, detail });
    }

    Ok(SubmitReply::Accepted {
        job_id: response.job_id,
    })
}

fn parse_status_response(status: u16, body: &str) -> Result<JobStatus, EndpointError> {
    let response: JobStatusResponse =
        serde_json::from_str(body).map_err(|_| EndpointError::Rejected {
            status,
            detail: "unparseable status response".to_string(),
        })?;

    Ok(match response.status.as_str() {
        "finished" => JobStatus::Finished {
            score: response.score,
        },
        "failed" => JobStatus::Failed,
        // Anything non-terminal keeps the poll loop going.
        _ => JobStatus::Running,
    })
}

/// Media type for a pre-recorded file picked by extension, for the
/// `submit <file>` path. Unknown extensions fall back to an opaque blob —
/// the server inspects content anyway.
pub fn mime_type_for_extension(extension: Option<&str>) -> &'static str {
    match extension {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        Some("opus") => "audio/opus",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepted_upload() {
        let reply =
            parse_upload_response(200, r#"{"success": true, "job_id": "j-42"}"#).unwrap();
        assert_eq!(
            reply,
            SubmitReply::Accepted {
                job_id: Some("j-42".to_string())
            }
        );
    }

    #[test]
    fn test_parse_upload_without_job_id_is_still_accepted_shape() {
        // The workflow, not the client, decides that a missing job id on an
        // accepted upload is a failure.
        let reply = parse_upload_response(200, r#"{"success": true}"#).unwrap();
        assert_eq!(reply, SubmitReply::Accepted { job_id: None });
    }

    #[test]
    fn test_parse_conflict_carries_server_message() {
        let reply = parse_upload_response(
            200,
            r#"{"already": true, "message": "Today's entry exists. Overwrite?"}"#,
        )
        .unwrap();
        assert_eq!(
            reply,
            SubmitReply::Conflict {
                message: "Today's entry exists. Overwrite?".to_string()
            }
        );
    }

    #[test]
    fn test_parse_conflict_without_message_gets_default_prompt() {
        let reply = parse_upload_response(200, r#"{"already": true}"#).unwrap();
        match reply {
            SubmitReply::Conflict { message } => {
                assert!(message.contains("Overwrite"));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_success_false_is_rejection() {
        let err = parse_upload_response(
            200,
            r#"{"success": false, "message": "overwrite failed"}"#,
        )
        .unwrap_err();
        match err {
            EndpointError::Rejected { status, detail } => {
                assert_eq!(status, 200);
                assert_eq!(detail, "overwrite failed");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_garbage_upload_body_is_rejection() {
        assert!(matches!(
            parse_upload_response(200, "<html>oops</html>"),
            Err(EndpointError::Rejected { .. })
        ));
    }

    #[test]
    fn test_parse_status_terminal_and_running() {
        assert_eq!(
            parse_status_response(200, r#"{"status": "finished", "score": 87}"#).unwrap(),
            JobStatus::Finished { score: Some(87.0) }
        );
        assert_eq!(
            parse_status_response(200, r#"{"status": "failed"}"#).unwrap(),
            JobStatus::Failed
        );
        assert_eq!(
            parse_status_response(200, r#"{"status": "running"}"#).unwrap(),
            JobStatus::Running
        );
        // Unknown statuses are non-terminal.
        assert_eq!(
            parse_status_response(200, r#"{"status": "queued"}"#).unwrap(),
            JobStatus::Running
        );
    }

    #[test]
    fn test_mime_type_table() {
        assert_eq!(mime_type_for_extension(Some("wav")), "audio/wav");
        assert_eq!(mime_type_for_extension(Some("webm")), "audio/webm");
        assert_eq!(mime_type_for_extension(Some("xyz")), "application/octet-stream");
        assert_eq!(mime_type_for_extension(None), "application/octet-stream");
    }
}

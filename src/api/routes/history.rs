//! Submission history endpoints.

use axum::{extract::Query, response::Json, routing::get, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiResult;
use crate::db::{self, SubmissionRepository};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    20
}

pub fn router() -> Router {
    Router::new().route("/", get(list_history))
}

async fn list_history(Query(query): Query<HistoryQuery>) -> ApiResult<Json<Value>> {
    let records = tokio::task::spawn_blocking(move || {
        let conn = db::init_db()?;
        SubmissionRepository::recent(&conn, query.limit)
    })
    .await
    .map_err(|e| anyhow::anyhow!("history task failed: {e}"))??;

    Ok(Json(json!({ "submissions": records })))
}

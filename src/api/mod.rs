//! Local control API.
//!
//! HTTP endpoints for:
//! - Capture control (start, stop)
//! - Submission trigger and combined status
//! - Submission history

pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tracing::info;

pub use routes::control::{AppCommand, ControlState};

pub struct ApiServer {
    port: u16,
    control_state: ControlState,
}

impl ApiServer {
    pub fn new(port: u16, control_state: ControlState) -> Self {
        Self {
            port,
            control_state,
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .route("/", get(service_info))
            .route("/version", get(version))
            .merge(routes::control::router(self.control_state))
            .nest("/history", routes::history::router())
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("Control API listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /               - Service info");
        info!("  GET  /version        - Version info");
        info!("  GET  /status         - Capture + submission status");
        info!("  POST /capture/start  - Start recording");
        info!("  POST /capture/stop   - Stop recording");
        info!("  POST /submit         - Submit the last recording");
        info!("  GET  /history        - List recent submissions");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "voxscore",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "voxscore"
    }))
}

//! HTTP surface: health check and `POST /diagnose`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use neuro_core::{DiagnoseError, DiagnosisRequest};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::service::DiagnosisService;

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub service: Arc<DiagnosisService>,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/diagnose", post(diagnose))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": state.app_name,
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.service.model_name(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn diagnose(
    State(state): State<AppState>,
    body: Result<Json<DiagnosisRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if request.audio_path.trim().is_empty() {
        return Err(ApiError::BadRequest("audio_path must not be empty".to_string()));
    }

    let request_id = Uuid::new_v4();
    info!(%request_id, audio = %request.audio_path, "POST /diagnose");
    match state.service.diagnose(&request).await {
        Ok(result) => {
            info!(%request_id, "diagnosis returned");
            Ok(Json(result))
        }
        Err(e) => {
            warn!(%request_id, kind = e.kind(), "diagnosis rejected");
            Err(ApiError::Diagnose(e))
        }
    }
}

/// Error body: `{"error": kind, "message": str, "actual"?: value}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Diagnose(DiagnoseError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Diagnose(DiagnoseError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Diagnose(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::BadRequest(message) => json!({
                "error": "bad_request",
                "message": message,
            }),
            ApiError::Diagnose(e) => {
                let mut body = json!({
                    "error": e.kind(),
                    "message": e.to_string(),
                });
                if let Some(actual) = e.actual() {
                    body["actual"] = actual.clone();
                }
                body
            }
        };
        (status, Json(body)).into_response()
    }
}

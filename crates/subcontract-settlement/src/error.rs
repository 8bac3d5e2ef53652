use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::risk_audit::NarrationError;
use crate::workflows::settlement::SettlementError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("settlement error: {0}")]
    Settlement(#[from] SettlementError),
    #[error("narration setup error: {0}")]
    Narration(#[from] NarrationError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Settlement(SettlementError::UnknownDeduction(_)) => StatusCode::NOT_FOUND,
            AppError::Settlement(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Narration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

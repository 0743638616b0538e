//! JSON response envelope.

use axum::Json;
use serde::Serialize;

use super::error::ApiError;

/// Envelope around every API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Whether the request succeeded.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Payload of a successful request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error detail of a failed request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse<()> {
    /// A failure envelope.
    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Handler result.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Successful response carrying `data`.
#[allow(clippy::unnecessary_wraps)]
pub fn ok<T>(message: impl Into<String>, data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse {
        success: true,
        message: message.into(),
        data: Some(data),
        error: None,
    }))
}

/// Successful response without a payload.
#[allow(clippy::unnecessary_wraps)]
pub fn done(message: impl Into<String>) -> ApiResult<()> {
    Ok(Json(ApiResponse {
        success: true,
        message: message.into(),
        data: None,
        error: None,
    }))
}

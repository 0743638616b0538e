//! Mapping of service errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mailvault_core::Error;
use tracing::{error, warn};

use super::response::ApiResponse;

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A service call failed.
    Core(Error),
    /// The request could not be decoded.
    BadRequest(String),
    /// The request carried no usable session.
    Unauthorized(String),
    /// No route matched.
    NotFound,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Core(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Core(err) => match err {
                Error::Validation(_) => StatusCode::BAD_REQUEST,
                Error::Duplicate(_) | Error::Conflict(_) | Error::TagInUse { .. } => {
                    StatusCode::CONFLICT
                }
                Error::Gateway(_) => StatusCode::BAD_GATEWAY,
                Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::Forbidden(_) => StatusCode::FORBIDDEN,
                Error::Unauthorized(_) | Error::Token(_) => StatusCode::UNAUTHORIZED,
                Error::Database(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn summary(&self) -> &'static str {
        match self.status() {
            StatusCode::BAD_REQUEST => "Invalid request",
            StatusCode::UNAUTHORIZED => "Not signed in",
            StatusCode::FORBIDDEN => "Access denied",
            StatusCode::NOT_FOUND => "Not found",
            StatusCode::CONFLICT => "Conflict",
            StatusCode::BAD_GATEWAY => "Mail gateway error",
            _ => "Internal error",
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::BadRequest(detail) | Self::Unauthorized(detail) => detail.clone(),
            Self::NotFound => "no such route".to_string(),
            // Storage details stay in the server log.
            Self::Core(Error::Database(_) | Error::Io(_)) => "internal error".to_string(),
            Self::Core(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Core(err) if status == StatusCode::INTERNAL_SERVER_ERROR => {
                error!("Request failed: {err}");
            }
            Self::Core(Error::Gateway(err)) => warn!("Mail gateway call failed: {err}"),
            _ => {}
        }

        let body = ApiResponse::failure(self.summary(), self.detail());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::Validation("x".into()), StatusCode::BAD_REQUEST),
            (Error::Duplicate("x".into()), StatusCode::CONFLICT),
            (Error::Conflict("x".into()), StatusCode::CONFLICT),
            (
                Error::TagInUse {
                    name: "Work".into(),
                    count: 2,
                },
                StatusCode::CONFLICT,
            ),
            (
                Error::Gateway(mailvault_gateway::Error::EmptyResult),
                StatusCode::BAD_GATEWAY,
            ),
            (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (Error::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (Error::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (Error::Io(std::io::Error::other("disk full")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_storage_detail_is_hidden() {
        let err = ApiError::from(Error::Io(std::io::Error::other("disk full")));
        assert_eq!(err.detail(), "internal error");

        let err = ApiError::from(Error::TagInUse {
            name: "Work".into(),
            count: 2,
        });
        assert!(err.detail().contains("Work"));
    }
}

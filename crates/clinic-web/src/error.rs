//! HTTP 错误映射

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clinic_core::ClinicError;
use serde_json::json;
use tracing::error;

/// 处理器错误，包装核心错误并映射为 HTTP 状态码
#[derive(Debug)]
pub struct ApiError(pub ClinicError);

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ClinicError::Validation(_) => StatusCode::BAD_REQUEST,
            ClinicError::NotFound(_) => StatusCode::NOT_FOUND,
            ClinicError::ConcurrentAllocationConflict(_) => StatusCode::CONFLICT,
            ClinicError::SourceUnavailable(_) | ClinicError::Timeout(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.0.kind(), "Request failed: {}", self.0);
        }

        let body = Json(json!({
            "error": true,
            "message": self.0.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ClinicError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (ClinicError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ClinicError::ConcurrentAllocationConflict(3), StatusCode::CONFLICT),
            (ClinicError::Timeout(Duration::from_secs(1)), StatusCode::SERVICE_UNAVAILABLE),
            (ClinicError::SourceUnavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (ClinicError::malformed("age", "bad"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}

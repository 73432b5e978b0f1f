//! HTTP rendering of `DomainError`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use domain::DomainError;
use serde::Serialize;

const GENERIC_FAILURE: &str = "Something went very wrong!";

/// Error response body: `status` is `fail` for 4xx and `error` for 5xx.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorDetails>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetails {
    kind: &'static str,
    status_code: u16,
    detail: String,
}

/// A domain failure on its way out, plus whether debugging details may be echoed.
#[derive(Debug)]
pub struct ApiError {
    pub error: DomainError,
    pub expose_details: bool,
}

impl ApiError {
    pub fn new(error: DomainError, expose_details: bool) -> Self {
        Self {
            error,
            expose_details,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        status_for(&self.error)
    }
}

pub fn status_for(error: &DomainError) -> StatusCode {
    match error {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::RepositoryError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        DomainError::ValidationError(_)
        | DomainError::InvalidRequest(_)
        | DomainError::InvalidId { .. }
        | DomainError::DuplicateField { .. }
        | DomainError::Conflict(_) => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let server_fault = status.is_server_error();

        if server_fault {
            tracing::error!(error = %self.error, "request failed");
        } else {
            tracing::debug!(kind = self.error.kind(), error = %self.error, "request rejected");
        }

        // Internal failures are not described to clients in production.
        let message = if server_fault && !self.expose_details {
            GENERIC_FAILURE.to_string()
        } else {
            self.error.to_string()
        };

        let body = ErrorBody {
            status: if server_fault { "error" } else { "fail" },
            message,
            error: self.expose_details.then(|| ErrorDetails {
                kind: self.error.kind(),
                status_code: status.as_u16(),
                detail: format!("{:?}", self.error),
            }),
        };

        (status, Json(body)).into_response()
    }
}

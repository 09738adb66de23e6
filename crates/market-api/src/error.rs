use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use market_db::models::WriteOutcome;
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Request-scoped failure kinds. Nothing here ever ends the process.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Not allowed to modify this resource")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    /// An extractor could not parse the path, query string or body.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Rejected { status, message } => (*status, message.clone()),
            ApiError::Store(e) => {
                error!("Store error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// Maps a store outcome to the value or the matching 404/409.
pub(crate) fn written<T>(
    outcome: WriteOutcome<T>,
    missing: &'static str,
    conflict: &'static str,
) -> ApiResult<T> {
    match outcome {
        WriteOutcome::Written(value) => Ok(value),
        WriteOutcome::Missing => Err(ApiError::NotFound(missing)),
        WriteOutcome::Conflict => Err(ApiError::Conflict(conflict)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized("no"), StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden, StatusCode::FORBIDDEN),
            (ApiError::NotFound("User"), StatusCode::NOT_FOUND),
            (ApiError::Conflict("taken"), StatusCode::CONFLICT),
            (
                ApiError::Rejected {
                    status: StatusCode::UNPROCESSABLE_ENTITY,
                    message: "missing field `price`".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ApiError::Store(anyhow::anyhow!("disk I/O error")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn written_maps_outcomes() {
        assert_eq!(written(WriteOutcome::Written(7), "User", "taken").unwrap(), 7);
        assert!(matches!(
            written::<()>(WriteOutcome::Missing, "User", "taken"),
            Err(ApiError::NotFound("User"))
        ));
        assert!(matches!(
            written::<()>(WriteOutcome::Conflict, "User", "taken"),
            Err(ApiError::Conflict("taken"))
        ));
    }
}

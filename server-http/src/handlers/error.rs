use crate::api::ErrorResponse;
use axum::Json;
use axum::http::StatusCode;
use shared::Error;
use tracing::{error, warn};

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a domain error onto a status code and the JSON error body.
/// `message` describes the failed operation.
pub fn api_error(err: Error, message: &str) -> ApiError {
    let status = match &err {
        Error::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::NotFound => StatusCode::NOT_FOUND,
        Error::InfrastructureUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::LoaderFailure(_) | Error::InvalidArgument(_) | Error::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status.is_server_error() {
        error!("{}: {}", message, err);
    } else {
        warn!("{}: {}", message, err);
    }

    let detail = match err {
        Error::Validation { reason, .. } => reason,
        other => other.to_string(),
    };
    (status, Json(ErrorResponse::new(message, Some(detail))))
}

pub fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Category not found", None)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                Error::Validation {
                    field: "name",
                    reason: "The name field is required".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (Error::Conflict("slug taken".into()), StatusCode::CONFLICT),
            (Error::NotFound, StatusCode::NOT_FOUND),
            (
                Error::infrastructure("redis down"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                Error::loader(std::io::Error::other("db gone")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                Error::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let (status, Json(body)) = api_error(err, "Operation failed");
            assert_eq!(status, expected);
            assert!(!body.success);
            assert_eq!(body.message, "Operation failed");
            assert!(body.error.is_some());
        }
    }

    #[test]
    fn test_validation_detail_is_the_reason() {
        let (_, Json(body)) = api_error(
            Error::Validation {
                field: "slug",
                reason: "The slug field is required".into(),
            },
            "The given data was invalid",
        );
        assert_eq!(body.error.as_deref(), Some("The slug field is required"));
    }
}

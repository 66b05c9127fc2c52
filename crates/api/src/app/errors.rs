use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use dealership_infra::repository::RepositoryError;

/// Map a repository failure to its status and `{"error", "message"}` body.
///
/// Store-side rejections are 500s: foreign keys are not pre-validated, so an unknown
/// `dealer_id` surfaces from the database.
pub fn repository_error_to_response(err: RepositoryError) -> axum::response::Response {
    match err {
        RepositoryError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        RepositoryError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        RepositoryError::ConstraintViolation(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "constraint_violation", msg)
        }
        RepositoryError::PoolExhausted => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "pool_exhausted",
            "no database connection available, retry later",
        ),
        e @ (RepositoryError::Connection(_) | RepositoryError::Database(_) | RepositoryError::Decode(_)) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors surfaced to the upload page. Bodies are `{"error": "..."}` because
/// the page script displays `data.error` verbatim.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Non trouvé")]
    NotFound,

    #[error("Fichier trop volumineux (limite: {limit} octets)")]
    PayloadTooLarge { limit: usize },

    /// The processing chain failed; the message goes back to the user.
    #[error("{0:#}")]
    Pipeline(anyhow::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()).into_response(),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, axum::Json(json!({ "error": msg }))).into_response()
            }
            ApiError::PayloadTooLarge { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                axum::Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            ApiError::Pipeline(err) => {
                tracing::warn!(error = %format!("{err:#}"), "job failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({ "error": self.to_string() })),
                )
                    .into_response()
            }
            ApiError::Internal(err) => {
                tracing::error!(error = %format!("{err:#}"), "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({ "error": "Erreur interne" })),
                )
                    .into_response()
            }
        }
    }
}

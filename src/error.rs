//! Error taxonomy for the scoring pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type ScoringResult<T> = Result<T, ScoringError>;

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    /// Request payload could not be parsed into a transaction
    #[error("invalid transaction: {0}")]
    Validation(String),

    /// Trained artifact could not be opened or is structurally unusable
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Classifier received a vector of the wrong arity
    #[error("invalid feature vector: expected {expected} features, got {actual}")]
    InvalidFeatureVector { expected: usize, actual: usize },

    /// Feature extraction or classification failed for a single request
    #[error("inference failed: {0}")]
    Inference(String),
}

impl ScoringError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ScoringError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ScoringError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            ScoringError::InvalidFeatureVector { .. } | ScoringError::Inference(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<serde_json::Error> for ScoringError {
    fn from(err: serde_json::Error) -> Self {
        ScoringError::Validation(err.to_string())
    }
}

impl IntoResponse for ScoringError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ScoringError::Validation(msg) => msg.clone(),
            ScoringError::ModelLoad(msg) => {
                tracing::error!(error = %msg, "Classifier unavailable");
                "ML model not loaded".to_string()
            }
            ScoringError::InvalidFeatureVector { .. } | ScoringError::Inference(_) => {
                format!("Prediction error: {}", self)
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ScoringError::Validation("missing field".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ScoringError::Inference("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ScoringError::InvalidFeatureVector {
                expected: 6,
                actual: 3
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ScoringError::ModelLoad("gone".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_json_error_is_validation() {
        let err = serde_json::from_str::<u64>("\"x\"").unwrap_err();
        assert!(matches!(ScoringError::from(err), ScoringError::Validation(_)));
    }
}

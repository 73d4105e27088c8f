//! API error type and its HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;
use crate::wizard::{SessionView, WizardError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Not found: {0}")]
    UnknownRoute(String),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    /// Gateway failure; carries the session restored for retry, if it still exists
    #[error("{message}")]
    SubmissionFailed {
        message: &'static str,
        session: Option<Box<SessionView>>,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Missing or invalid bearer token")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::SessionNotFound(_) | ApiError::UnknownRoute(_) => StatusCode::NOT_FOUND,
            ApiError::Wizard(WizardError::MissingName) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Wizard(WizardError::WrongClip { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Wizard(_) => StatusCode::CONFLICT,
            ApiError::SubmissionFailed { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        let body = match self {
            ApiError::SubmissionFailed { session, .. } => json!({
                "error": message,
                "session": session,
            }),
            _ => json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Clip;
    use crate::wizard::{Step, SUBMISSION_ERROR_MESSAGE};

    #[test]
    fn test_wizard_error_status_mapping() {
        assert_eq!(
            ApiError::from(WizardError::MissingName).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(WizardError::PlaybackPending).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(WizardError::SubmissionInFlight).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(WizardError::WrongStep {
                expected: Step::Welcome,
                actual: Step::Intro
            })
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(WizardError::WrongClip {
                clip: Clip::Employment,
                step: Step::Intro
            })
            .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_submission_failure_message() {
        let err = ApiError::SubmissionFailed {
            message: SUBMISSION_ERROR_MESSAGE,
            session: None,
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), SUBMISSION_ERROR_MESSAGE);
    }
}

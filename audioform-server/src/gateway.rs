//! Submission gateway
//!
//! Shapes a finished session into a flat record and performs one insert
//! against the configured store. The gateway does not trust the wizard's
//! guards and re-validates the record itself. It never retries; a retry is the
//! visitor answering again.

use audioform_common::time::elapsed_whole_secs;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::store::{NewSubmission, StoreError, StoredSubmission, SubmissionStore};
use crate::wizard::{SubmissionRequest, SUBMISSION_ERROR_MESSAGE};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid submission: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Store did not answer within {0:?}")]
    Timeout(Duration),
}

impl GatewayError {
    /// The only message visitors ever see for a failed submission
    pub fn user_message(&self) -> &'static str {
        SUBMISSION_ERROR_MESSAGE
    }
}

pub struct SubmissionGateway {
    store: Arc<dyn SubmissionStore>,
    timeout: Duration,
}

impl SubmissionGateway {
    pub fn new(store: Arc<dyn SubmissionStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn store(&self) -> &Arc<dyn SubmissionStore> {
        &self.store
    }

    /// Validate and flatten a request into the persisted record shape
    pub fn shape(request: &SubmissionRequest) -> Result<NewSubmission, GatewayError> {
        let first_name = request.first_name.trim();
        let last_name = request.last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(GatewayError::InvalidRecord(
                "first and last name are required".to_string(),
            ));
        }
        let employment_status = request.employment_status.ok_or_else(|| {
            GatewayError::InvalidRecord("employment status was not answered".to_string())
        })?;
        if request.form_completion_time < request.form_start_time {
            return Err(GatewayError::InvalidRecord(
                "completion time precedes start time".to_string(),
            ));
        }

        let engagement = &request.engagement;
        Ok(NewSubmission {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            dob: request
                .dob
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            company: request.company.clone(),
            employment_status,
            intro_audio_played: engagement.intro_audio_played,
            employment_audio_played: engagement.employment_audio_played,
            total_audio_listen_time_seconds: engagement.total_audio_listen_time_seconds,
            intro_audio_completion_time: engagement.intro_audio_completion_time,
            employment_audio_completion_time: engagement.employment_audio_completion_time,
            form_start_time: request.form_start_time,
            form_completion_time: request.form_completion_time,
            form_completion_time_seconds: elapsed_whole_secs(
                request.form_start_time,
                request.form_completion_time,
            ),
        })
    }

    /// Shape the request and insert it, bounded by the configured timeout
    pub async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<StoredSubmission, GatewayError> {
        let record = Self::shape(request).map_err(|e| {
            error!("Session {}: {}", request.session_id, e);
            e
        })?;

        let result = match tokio::time::timeout(self.timeout, self.store.insert(&record)).await {
            Ok(result) => result.map_err(GatewayError::from),
            Err(_) => Err(GatewayError::Timeout(self.timeout)),
        };

        match &result {
            Ok(stored) => info!(
                "Session {}: stored submission {} for {} ({} store)",
                request.session_id,
                stored.id,
                stored.company,
                self.store.name()
            ),
            Err(e) => error!(
                "Session {}: submission to {} store failed: {}",
                request.session_id,
                self.store.name(),
                e
            ),
        }
        result
    }
}

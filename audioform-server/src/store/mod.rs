//! Submission stores
//!
//! The gateway writes through the [`SubmissionStore`] trait so the backend is
//! chosen once at startup and can be swapped for a fake in tests:
//! - [`SqliteStore`]: local SQLite database (default)
//! - [`RestStore`]: hosted PostgREST-style table endpoint
//! - [`MemoryStore`]: in-process, with injectable failures

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod memory;
mod rest;
mod sqlite;

pub use memory::MemoryStore;
pub use rest::RestStore;
pub use sqlite::SqliteStore;

/// Store failures; never shown to visitors verbatim
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Unexpected store response: {0}")]
    Decode(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid store configuration: {0}")]
    Config(String),
}

/// A completed submission before the store assigns `id` and `created_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubmission {
    pub first_name: String,
    pub last_name: String,
    pub dob: Option<String>,
    pub company: String,
    pub employment_status: bool,
    pub intro_audio_played: bool,
    pub employment_audio_played: bool,
    pub total_audio_listen_time_seconds: i64,
    pub intro_audio_completion_time: Option<DateTime<Utc>>,
    pub employment_audio_completion_time: Option<DateTime<Utc>>,
    pub form_start_time: DateTime<Utc>,
    pub form_completion_time: DateTime<Utc>,
    pub form_completion_time_seconds: i64,
}

/// A persisted submission row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSubmission {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub dob: Option<String>,
    pub company: String,
    pub employment_status: bool,
    pub intro_audio_played: bool,
    pub employment_audio_played: bool,
    pub total_audio_listen_time_seconds: i64,
    pub intro_audio_completion_time: Option<DateTime<Utc>>,
    pub employment_audio_completion_time: Option<DateTime<Utc>>,
    pub form_start_time: DateTime<Utc>,
    pub form_completion_time: DateTime<Utc>,
    pub form_completion_time_seconds: i64,
    pub created_at: DateTime<Utc>,
}

impl StoredSubmission {
    pub fn from_new(id: i64, created_at: DateTime<Utc>, record: NewSubmission) -> Self {
        Self {
            id,
            first_name: record.first_name,
            last_name: record.last_name,
            dob: record.dob,
            company: record.company,
            employment_status: record.employment_status,
            intro_audio_played: record.intro_audio_played,
            employment_audio_played: record.employment_audio_played,
            total_audio_listen_time_seconds: record.total_audio_listen_time_seconds,
            intro_audio_completion_time: record.intro_audio_completion_time,
            employment_audio_completion_time: record.employment_audio_completion_time,
            form_start_time: record.form_start_time,
            form_completion_time: record.form_completion_time,
            form_completion_time_seconds: record.form_completion_time_seconds,
            created_at,
        }
    }
}

/// Durable home for completed submissions
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Persist one record, returning it with server-assigned fields
    async fn insert(&self, record: &NewSubmission) -> Result<StoredSubmission, StoreError>;

    /// Every stored record, newest first
    async fn list_all(&self) -> Result<Vec<StoredSubmission>, StoreError>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn new_submission(company: &str, employment_status: bool) -> NewSubmission {
        let start = Utc.with_ymd_and_hms(2025, 1, 14, 12, 0, 0).unwrap();
        NewSubmission {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            dob: None,
            company: company.to_string(),
            employment_status,
            intro_audio_played: true,
            employment_audio_played: false,
            total_audio_listen_time_seconds: 21,
            intro_audio_completion_time: Some(start + chrono::Duration::seconds(22)),
            employment_audio_completion_time: None,
            form_start_time: start,
            form_completion_time: start + chrono::Duration::seconds(60),
            form_completion_time_seconds: 60,
        }
    }
}

//! In-process submission store
//!
//! Used by `--store memory` for demos and by tests, which can make it fail or
//! stall to exercise the gateway's error and timeout paths.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{NewSubmission, StoreError, StoredSubmission, SubmissionStore};

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StoredSubmission>>,
    fail_inserts: AtomicBool,
    insert_delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store (reporting tests)
    pub fn with_rows(rows: Vec<StoredSubmission>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Make every subsequent insert fail until reset
    pub fn set_failing(&self, failing: bool) {
        self.fail_inserts.store(failing, Ordering::SeqCst);
    }

    /// Hold every insert for `delay` before completing it
    pub fn set_insert_delay(&self, delay: Option<Duration>) {
        if let Ok(mut guard) = self.insert_delay.lock() {
            *guard = delay;
        }
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, record: &NewSubmission) -> Result<StoredSubmission, StoreError> {
        let delay = self.insert_delay.lock().ok().and_then(|guard| *guard);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".to_string()));
        }

        let mut rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        let id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let stored = StoredSubmission::from_new(id, chrono::Utc::now(), record.clone());
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn list_all(&self) -> Result<Vec<StoredSubmission>, StoreError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        let mut out = rows.clone();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }
}

//! SQLite-backed submission store

use async_trait::async_trait;
use audioform_common::db::validate_table_name;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::{NewSubmission, StoreError, StoredSubmission, SubmissionStore};

const COLUMNS: &str = "id, first_name, last_name, dob, company, employment_status, \
    intro_audio_played, employment_audio_played, total_audio_listen_time_seconds, \
    intro_audio_completion_time, employment_audio_completion_time, form_start_time, \
    form_completion_time, form_completion_time_seconds, created_at";

pub struct SqliteStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteStore {
    /// Wrap a pool whose schema was created by `audioform_common::db::init_database`
    pub fn new(pool: SqlitePool, table: impl Into<String>) -> Result<Self, StoreError> {
        let table = table.into();
        validate_table_name(&table).map_err(|e| StoreError::Config(e.to_string()))?;
        Ok(Self { pool, table })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_submission(row: &SqliteRow) -> Result<StoredSubmission, sqlx::Error> {
    Ok(StoredSubmission {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        dob: row.try_get("dob")?,
        company: row.try_get("company")?,
        employment_status: row.try_get("employment_status")?,
        intro_audio_played: row.try_get("intro_audio_played")?,
        employment_audio_played: row.try_get("employment_audio_played")?,
        total_audio_listen_time_seconds: row.try_get("total_audio_listen_time_seconds")?,
        intro_audio_completion_time: row.try_get("intro_audio_completion_time")?,
        employment_audio_completion_time: row.try_get("employment_audio_completion_time")?,
        form_start_time: row.try_get("form_start_time")?,
        form_completion_time: row.try_get("form_completion_time")?,
        form_completion_time_seconds: row.try_get("form_completion_time_seconds")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl SubmissionStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn insert(&self, record: &NewSubmission) -> Result<StoredSubmission, StoreError> {
        let sql = format!(
            "INSERT INTO {} (first_name, last_name, dob, company, employment_status, \
             intro_audio_played, employment_audio_played, total_audio_listen_time_seconds, \
             intro_audio_completion_time, employment_audio_completion_time, form_start_time, \
             form_completion_time, form_completion_time_seconds) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING id, created_at",
            self.table
        );

        let row = sqlx::query(&sql)
            .bind(&record.first_name)
            .bind(&record.last_name)
            .bind(&record.dob)
            .bind(&record.company)
            .bind(record.employment_status)
            .bind(record.intro_audio_played)
            .bind(record.employment_audio_played)
            .bind(record.total_audio_listen_time_seconds)
            .bind(record.intro_audio_completion_time)
            .bind(record.employment_audio_completion_time)
            .bind(record.form_start_time)
            .bind(record.form_completion_time)
            .bind(record.form_completion_time_seconds)
            .fetch_one(&self.pool)
            .await?;

        let id: i64 = row.try_get("id")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        debug!("Inserted submission {} into {}", id, self.table);

        Ok(StoredSubmission::from_new(id, created_at, record.clone()))
    }

    async fn list_all(&self) -> Result<Vec<StoredSubmission>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at DESC, id DESC",
            COLUMNS, self.table
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let submissions = rows
            .iter()
            .map(row_to_submission)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(submissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::new_submission;
    use audioform_common::config::DEFAULT_TABLE;
    use audioform_common::db::init_database;
    use tempfile::TempDir;

    async fn store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("audioform.db"), DEFAULT_TABLE)
            .await
            .unwrap();
        (dir, SqliteStore::new(pool, DEFAULT_TABLE).unwrap())
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_created_at() {
        let (_dir, store) = store().await;
        let record = new_submission("HCS", true);

        let stored = store.insert(&record).await.unwrap();
        assert_eq!(stored.id, 1);
        assert_eq!(stored.company, "HCS");
        assert!(stored.employment_status);
        assert_eq!(stored.form_completion_time_seconds, 60);
    }

    #[tokio::test]
    async fn test_list_all_reads_back_every_column() {
        let (_dir, store) = store().await;
        let record = new_submission("Royal", false);
        let inserted = store.insert(&record).await.unwrap();

        let rows = store.list_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, inserted.id);
        assert_eq!(row.first_name, "Jane");
        assert_eq!(row.dob, None);
        assert!(!row.employment_status);
        assert!(row.intro_audio_played);
        assert!(!row.employment_audio_played);
        assert_eq!(row.total_audio_listen_time_seconds, 21);
        assert_eq!(row.intro_audio_completion_time, record.intro_audio_completion_time);
        assert_eq!(row.form_start_time, record.form_start_time);
        assert_eq!(row.created_at, inserted.created_at);
    }

    #[tokio::test]
    async fn test_list_all_newest_first() {
        let (_dir, store) = store().await;
        for company in ["A", "B", "C"] {
            store.insert(&new_submission(company, true)).await.unwrap();
        }
        let companies: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.company)
            .collect();
        assert_eq!(companies, vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn test_constraint_violation_surfaces_as_error() {
        let (_dir, store) = store().await;
        let mut record = new_submission("HCS", true);
        record.last_name = " ".to_string();
        assert!(matches!(
            store.insert(&record).await,
            Err(StoreError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_bad_table_name() {
        let (_dir, store) = store().await;
        assert!(SqliteStore::new(store.pool().clone(), "no spaces").is_err());
    }
}

//! Hosted table store over a PostgREST-style HTTP interface
//!
//! Inserts `POST {base}/rest/v1/{table}` with `Prefer: return=representation`
//! and reads `GET {base}/rest/v1/{table}?select=*&order=created_at.desc`.
//! The API key goes in both the `apikey` and bearer `Authorization` headers.

use async_trait::async_trait;
use audioform_common::db::validate_table_name;
use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;

use super::{NewSubmission, StoreError, StoredSubmission, SubmissionStore};

pub struct RestStore {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: Option<String>, table: &str) -> Result<Self, StoreError> {
        validate_table_name(table).map_err(|e| StoreError::Config(e.to_string()))?;
        let base = base_url.trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(StoreError::Config(format!("Invalid store url: {}", base_url)));
        }
        Ok(Self {
            client: Client::new(),
            endpoint: format!("{}/rest/v1/{}", base, table),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }
}

/// Map non-2xx responses to `StoreError::Rejected` with the body for logs
async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl SubmissionStore for RestStore {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn insert(&self, record: &NewSubmission) -> Result<StoredSubmission, StoreError> {
        let request = self
            .client
            .post(&self.endpoint)
            .header("Prefer", "return=representation")
            .json(&[record]);
        let response = check_status(self.authorize(request).send().await?).await?;

        let mut rows: Vec<StoredSubmission> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let stored = rows
            .pop()
            .ok_or_else(|| StoreError::Decode("insert returned no rows".to_string()))?;
        debug!("Inserted submission {} via {}", stored.id, self.endpoint);
        Ok(stored)
    }

    async fn list_all(&self) -> Result<Vec<StoredSubmission>, StoreError> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*"), ("order", "created_at.desc")]);
        let response = check_status(self.authorize(request).send().await?).await?;

        response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_built_from_base_and_table() {
        let store = RestStore::new("https://db.example.invalid/", None, "audio_form_responses")
            .unwrap();
        assert_eq!(
            store.endpoint(),
            "https://db.example.invalid/rest/v1/audio_form_responses"
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(RestStore::new("ftp://x", None, "t").is_err());
        assert!(RestStore::new("https://x", None, "bad table").is_err());
    }
}

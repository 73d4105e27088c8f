//! Reporting endpoints over stored submissions

use audioform_common::time;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ApiError;
use crate::reporting::{self, ReportStats, ResponseFilter};
use crate::store::StoredSubmission;
use crate::AppState;

/// `?company=&employment=`; absent or `all` means no restriction
#[derive(Debug, Default, Deserialize)]
pub struct ResponseQuery {
    pub company: Option<String>,
    pub employment: Option<String>,
}

impl ResponseQuery {
    fn filter(&self) -> Result<ResponseFilter, ApiError> {
        ResponseFilter::from_params(self.company.as_deref(), self.employment.as_deref())
            .map_err(ApiError::BadRequest)
    }
}

#[derive(Debug, Serialize)]
pub struct ResponsesReport {
    pub filter: ResponseFilter,
    pub stats: ReportStats,
    /// Every company with at least one row, regardless of the filter
    pub companies: Vec<String>,
    pub rows: Vec<StoredSubmission>,
}

/// GET /api/responses
pub async fn list_responses(
    State(state): State<AppState>,
    Query(query): Query<ResponseQuery>,
) -> Result<Json<ResponsesReport>, ApiError> {
    let filter = query.filter()?;
    let all = state.store.list_all().await?;
    let rows = filter.apply(&all);

    Ok(Json(ResponsesReport {
        stats: ReportStats::compute(&rows),
        companies: reporting::companies(&all),
        filter,
        rows,
    }))
}

/// GET /api/responses/export.csv
pub async fn export_responses(
    State(state): State<AppState>,
    Query(query): Query<ResponseQuery>,
) -> Result<Response, ApiError> {
    let filter = query.filter()?;
    let rows = filter.apply(&state.store.list_all().await?);
    let filename = reporting::export_filename(&filter, time::now());
    info!("Exporting {} submission(s) as {}", rows.len(), filename);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        reporting::export_csv(&rows),
    )
        .into_response())
}

//! REST API types for upload clients.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{JobError, ServerError};
use crate::transform::pipeline::{JobReport, SheetSummary};

/// Response sent after an upload has been normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready", "warning", "error"
    pub status: String,

    pub document: String,

    /// Output sheets in creation order
    pub sheets: Vec<SheetPreview>,

    /// Input sheets no category claimed
    pub skipped: Vec<String>,

    pub total_rows: usize,

    /// Whether the notification reached the outbox
    pub delivered: bool,

    pub persisted: bool,

    pub elapsed_ms: u64,
}

/// One output sheet with its header and the first rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetPreview {
    pub name: String,
    pub header: Vec<String>,
    pub row_count: usize,
    pub preview: Vec<Vec<Value>>,
}

/// Rows shown per sheet in an upload response.
pub const PREVIEW_ROWS: usize = 5;

impl From<JobReport> for UploadResponse {
    fn from(report: JobReport) -> Self {
        let sheets = report
            .workbook
            .sheets()
            .iter()
            .zip(&report.sheets)
            .map(|(sheet, SheetSummary { rows, .. })| SheetPreview {
                name: sheet.name.clone(),
                header: sheet.header.clone(),
                row_count: *rows,
                preview: sheet
                    .rows
                    .iter()
                    .take(PREVIEW_ROWS)
                    .map(|row| row.iter().map(|c| json!(c)).collect())
                    .collect(),
            })
            .collect();

        UploadResponse {
            job_id: report.job_id.to_string(),
            status: if report.skipped.is_empty() { "ready" } else { "warning" }.to_string(),
            document: report.document_name,
            sheets,
            skipped: report.skipped,
            total_rows: report.workbook.row_count(),
            delivered: report.delivered,
            persisted: report.persisted,
            elapsed_ms: report.elapsed_ms,
        }
    }
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Job(JobError::Decode(_) | JobError::Normalize(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServerError::Job(JobError::Delivery(_)) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
        "sheets": [],
        "totalRows": 0
    })
}

/// Axum rejection for a server error.
pub fn reject(err: ServerError) -> (StatusCode, Json<Value>) {
    (err.status_code(), Json(error_response(&err.to_string())))
}

//! Hand-off to the collaborators that outlive a job.
//!
//! - [`render_xlsx`] - Re-serialize an output workbook as `.xlsx`
//! - [`Notification`] - The message sent to the job initiator
//! - [`Delivery`] / [`OutboxDelivery`] - Drop notifications for a mail relay
//! - [`Persistence`] / [`JsonSnapshot`] - Write canonical rows for a bulk loader
//!
//! The mail transport and the relational store are external; this module
//! stops at files an external process picks up.

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DeliveryError, DeliveryResult};
use crate::models::{Cell, OutputWorkbook};
use crate::transform::pipeline::JobContext;

/// Excel's worksheet name limit.
const MAX_SHEET_NAME: usize = 31;

/// Names Excel keeps for itself.
const RESERVED_SHEET_NAMES: &[&str] = &["history"];

const SUBJECT_TEMPLATE: &str = "Normalized inventory: {document}";

const BODY_TEMPLATE: &str = "Hello,

The inventory workbook \"{document}\" has been normalized into {sheets} sheet(s) holding {rows} row(s).
The normalized workbook is attached as {attachment}.

Job reference: {job}
";

// =============================================================================
// Spreadsheet rendering
// =============================================================================

/// Render the workbook as `.xlsx` bytes: bold header row, then data rows.
pub fn render_xlsx(workbook: &OutputWorkbook) -> DeliveryResult<Vec<u8>> {
    let mut xlsx = Workbook::new();
    let bold = Format::new().set_bold();
    let names = worksheet_names(workbook.keys());

    for (sheet, name) in workbook.sheets().iter().zip(names) {
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(&name)?;

        for (col, title) in sheet.header.iter().enumerate() {
            worksheet.write_string_with_format(0, column_number(col)?, title, &bold)?;
        }

        for (i, row) in sheet.rows.iter().enumerate() {
            let row_number = u32::try_from(i + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
            for (col, cell) in row.iter().enumerate() {
                let col = column_number(col)?;
                match cell {
                    Cell::Empty => {}
                    Cell::Number(n) => {
                        worksheet.write_number(row_number, col, *n)?;
                    }
                    Cell::Text(s) => {
                        worksheet.write_string(row_number, col, s)?;
                    }
                }
            }
        }
    }

    Ok(xlsx.save_to_buffer()?)
}

fn column_number(index: usize) -> Result<u16, XlsxError> {
    u16::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)
}

/// Turn output sheet keys into valid, unique worksheet names.
///
/// Forbidden characters become `-`, names are cut to 31 characters, and
/// collisions (case-insensitive, as Excel compares) get a numeric suffix.
/// Reserved names count as collisions.
pub fn worksheet_names<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = RESERVED_SHEET_NAMES.iter().map(|s| s.to_string()).collect();
    let mut names = Vec::new();

    for key in keys {
        let cleaned: String = key
            .chars()
            .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '-' } else { c })
            .collect();
        let cleaned = cleaned.trim().trim_matches('\'').to_string();
        let base = if cleaned.is_empty() { "Sheet".to_string() } else { cleaned };

        let mut candidate = truncate(&base, MAX_SHEET_NAME);
        let mut n = 2;
        while seen.contains(&candidate.to_lowercase()) {
            let suffix = format!(" ({})", n);
            candidate = format!("{}{}", truncate(&base, MAX_SHEET_NAME - suffix.len()), suffix);
            n += 1;
        }

        seen.insert(candidate.to_lowercase());
        names.push(candidate);
    }

    names
}

fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

// =============================================================================
// Notification
// =============================================================================

/// Message to the job initiator, carrying the normalized workbook.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub job_id: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment_name: String,
    #[serde(skip)]
    pub attachment: Vec<u8>,
}

impl Notification {
    /// Build the fixed-template message for a finished job.
    pub fn for_job(job: &JobContext, workbook: &OutputWorkbook) -> DeliveryResult<Self> {
        let to = job
            .initiator
            .as_deref()
            .map(str::trim)
            .filter(|to| is_plausible_address(to))
            .ok_or_else(|| {
                DeliveryError::InvalidRecipient(job.initiator.clone().unwrap_or_default())
            })?
            .to_string();

        let attachment_name = format!("{}-normalized.xlsx", document_stem(&job.document_name));
        let fill = |template: &str| {
            template
                .replace("{document}", &job.document_name)
                .replace("{sheets}", &workbook.len().to_string())
                .replace("{rows}", &workbook.row_count().to_string())
                .replace("{attachment}", &attachment_name)
                .replace("{job}", &job.job_id.to_string())
        };

        Ok(Self {
            job_id: job.job_id.to_string(),
            to,
            subject: fill(SUBJECT_TEMPLATE),
            body: fill(BODY_TEMPLATE),
            attachment_name: attachment_name.clone(),
            attachment: render_xlsx(workbook)?,
        })
    }
}

fn is_plausible_address(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn document_stem(document: &str) -> String {
    Path::new(document)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("inventory")
        .to_string()
}

// =============================================================================
// Collaborators
// =============================================================================

/// Sends a finished job's notification.
pub trait Delivery: Send + Sync {
    fn deliver(&self, notification: &Notification) -> DeliveryResult<()>;
}

/// Loads a finished job's canonical rows.
pub trait Persistence: Send + Sync {
    fn persist(&self, job: &JobContext, workbook: &OutputWorkbook) -> DeliveryResult<()>;

    /// Withdraw rows stored by [`Persistence::persist`] for `job`.
    fn discard(&self, job: &JobContext) -> DeliveryResult<()>;
}

/// Writes each notification into an outbox directory for a mail relay.
///
/// Per job: `<job>.xlsx` (the attachment) and `<job>.json` (the envelope).
#[derive(Debug, Clone)]
pub struct OutboxDelivery {
    dir: PathBuf,
}

impl OutboxDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    #[serde(flatten)]
    notification: &'a Notification,
    attachment_path: String,
}

impl Delivery for OutboxDelivery {
    fn deliver(&self, notification: &Notification) -> DeliveryResult<()> {
        fs::create_dir_all(&self.dir)?;

        let attachment_path = self.dir.join(format!("{}.xlsx", notification.job_id));
        let envelope = Envelope {
            notification,
            attachment_path: attachment_path.to_string_lossy().to_string(),
        };
        let json = serde_json::to_string_pretty(&envelope)?;

        // The relay picks up envelopes, so the envelope lands last.
        fs::write(&attachment_path, &notification.attachment)?;
        if let Err(e) = fs::write(self.dir.join(format!("{}.json", notification.job_id)), json) {
            let _ = fs::remove_file(&attachment_path);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Writes canonical rows as JSON records, one file per job.
#[derive(Debug, Clone)]
pub struct JsonSnapshot {
    dir: PathBuf,
}

impl JsonSnapshot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path the snapshot for `job` is written to.
    pub fn path_for(&self, job: &JobContext) -> PathBuf {
        self.dir.join(format!("{}.json", job.job_id))
    }
}

impl Persistence for JsonSnapshot {
    fn persist(&self, job: &JobContext, workbook: &OutputWorkbook) -> DeliveryResult<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(&snapshot(job, workbook))?;

        // Loaders only see complete files.
        let partial = self.dir.join(format!("{}.json.partial", job.job_id));
        fs::write(&partial, json)?;
        fs::rename(&partial, self.path_for(job))?;
        Ok(())
    }

    fn discard(&self, job: &JobContext) -> DeliveryResult<()> {
        match fs::remove_file(self.path_for(job)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// JSON form of a workbook: one array of header-keyed records per sheet.
pub fn snapshot(job: &JobContext, workbook: &OutputWorkbook) -> Value {
    let sheets: Vec<Value> = workbook
        .sheets()
        .iter()
        .map(|sheet| {
            let keys = unique_keys(&sheet.header);
            let records: Vec<Value> = sheet
                .rows
                .iter()
                .map(|row| {
                    let record: Map<String, Value> = keys
                        .iter()
                        .zip(row)
                        .map(|(key, cell)| (key.clone(), cell_value(cell)))
                        .collect();
                    Value::Object(record)
                })
                .collect();
            serde_json::json!({ "name": sheet.name, "records": records })
        })
        .collect();

    serde_json::json!({
        "jobId": job.job_id.to_string(),
        "document": job.document_name,
        "startedAt": job.started_at.to_rfc3339(),
        "sheets": sheets,
    })
}

/// Header names made unique by suffixing repeats with `_2`, `_3`, ...
fn unique_keys(header: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    header
        .iter()
        .map(|name| {
            let mut key = name.clone();
            let mut n = 2;
            while seen.contains(&key) {
                key = format!("{}_{}", name, n);
                n += 1;
            }
            seen.insert(key.clone());
            key
        })
        .collect()
}

fn cell_value(cell: &Cell) -> Value {
    match cell {
        Cell::Empty => Value::Null,
        Cell::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Cell::Text(s) => Value::String(s.clone()),
    }
}

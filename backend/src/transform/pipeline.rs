//! Job-level entry points: decode, dispatch, persist, deliver.
//!
//! # Example
//!
//! ```rust,ignore
//! use tagsheet::transform::pipeline::{JobContext, Orchestrator};
//! use tagsheet::transform::CategoryRegistry;
//! use tagsheet::delivery::JsonSnapshot;
//!
//! let job = JobContext::new("register.xlsx", Some("it@example.org".into()));
//! let report = Orchestrator::new(CategoryRegistry::builtin())
//!     .with_persistence(JsonSnapshot::new("snapshots"))
//!     .transform_file(Path::new("register.xlsx"), &job)?;
//!
//! println!("{} rows in {} sheets", report.workbook.row_count(), report.workbook.len());
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

use super::dispatcher::{dispatch, CategoryRegistry};
use crate::api::logs::JobLog;
use crate::delivery::{Delivery, Notification, Persistence};
use crate::error::{JobResult, NormalizeResult};
use crate::models::{OutputWorkbook, RawWorkbook};
use crate::parser::{decode_xlsx_bytes, decode_xlsx_file};

/// Identity of one transformation job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobContext {
    pub job_id: Uuid,
    pub document_name: String,
    /// Address of whoever submitted the workbook.
    pub initiator: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl JobContext {
    pub fn new(document_name: impl Into<String>, initiator: Option<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            document_name: document_name.into(),
            initiator,
            started_at: Utc::now(),
        }
    }
}

/// Row count of one output sheet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSummary {
    pub name: String,
    pub columns: usize,
    pub rows: usize,
}

/// Result of a finished job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job_id: Uuid,
    pub document_name: String,
    #[serde(skip)]
    pub workbook: OutputWorkbook,
    pub sheets: Vec<SheetSummary>,
    /// Input sheets with no registered category.
    pub skipped: Vec<String>,
    pub persisted: bool,
    pub delivered: bool,
    pub elapsed_ms: u64,
}

/// Pure transformation with the built-in categories.
pub fn normalize(raw: &RawWorkbook) -> NormalizeResult<OutputWorkbook> {
    dispatch(raw, CategoryRegistry::builtin()).map(|outcome| outcome.workbook)
}

/// Runs jobs against a registry and hands results to the configured collaborators.
///
/// The notification is built first, then rows are stored, then the
/// notification is sent. A failed send withdraws the stored rows, so a job
/// either commits everything or nothing.
pub struct Orchestrator<'a> {
    registry: &'a CategoryRegistry,
    delivery: Option<Box<dyn Delivery>>,
    persistence: Option<Box<dyn Persistence>>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(registry: &'a CategoryRegistry) -> Self {
        Self {
            registry,
            delivery: None,
            persistence: None,
        }
    }

    pub fn with_delivery(mut self, delivery: impl Delivery + 'static) -> Self {
        self.delivery = Some(Box::new(delivery));
        self
    }

    pub fn with_persistence(mut self, persistence: impl Persistence + 'static) -> Self {
        self.persistence = Some(Box::new(persistence));
        self
    }

    /// Decode an uploaded `.xlsx` payload and transform it.
    pub fn transform_bytes(&self, bytes: &[u8], job: &JobContext) -> JobResult<JobReport> {
        let log = JobLog::new(job.job_id.to_string());
        log.info(format!("📖 Reading {} ({} bytes)...", job.document_name, bytes.len()));
        let raw = decode_xlsx_bytes(bytes).inspect_err(|e| log.error(e.to_string()))?;
        self.transform(&raw, job)
    }

    /// Decode an `.xlsx` file and transform it.
    pub fn transform_file(&self, path: &Path, job: &JobContext) -> JobResult<JobReport> {
        let log = JobLog::new(job.job_id.to_string());
        log.info(format!("📖 Reading {}...", path.display()));
        let raw = decode_xlsx_file(path).inspect_err(|e| log.error(e.to_string()))?;
        self.transform(&raw, job)
    }

    /// Transform a decoded workbook, then persist and deliver the result.
    pub fn transform(&self, raw: &RawWorkbook, job: &JobContext) -> JobResult<JobReport> {
        let started = Instant::now();
        let log = JobLog::new(job.job_id.to_string());
        log.info(format!("⚙️  Normalizing {} sheet(s)...", raw.len()));

        let outcome = dispatch(raw, self.registry).inspect_err(|e| log.error(e.to_string()))?;

        for (sheet, category) in &outcome.handled {
            log.info_indent(format!("{} → {}", sheet, category), 1);
        }
        for sheet in &outcome.skipped {
            log.warning(format!("Skipped sheet '{}': no registered category", sheet));
        }

        let workbook = outcome.workbook;
        let sheets: Vec<SheetSummary> = workbook
            .sheets()
            .iter()
            .map(|s| SheetSummary {
                name: s.name.clone(),
                columns: s.header.len(),
                rows: s.rows.len(),
            })
            .collect();
        log.success(format!(
            "{} row(s) across {} output sheet(s)",
            workbook.row_count(),
            workbook.len()
        ));

        // Validate the recipient and render the attachment before anything is stored.
        let notification = match (&self.delivery, &job.initiator) {
            (Some(_), Some(_)) => Some(
                Notification::for_job(job, &workbook)
                    .inspect_err(|e| log.error(format!("Notification failed: {}", e)))?,
            ),
            (Some(_), None) => {
                log.warning("No initiator address; notification not sent");
                None
            }
            (None, _) => None,
        };

        let persisted = match &self.persistence {
            Some(store) => {
                store
                    .persist(job, &workbook)
                    .inspect_err(|e| log.error(format!("Persistence failed: {}", e)))?;
                log.success("💾 Canonical rows stored");
                true
            }
            None => false,
        };

        let delivered = match (&self.delivery, &notification) {
            (Some(delivery), Some(notification)) => {
                if let Err(e) = delivery.deliver(notification) {
                    log.error(format!("Delivery failed: {}", e));
                    if let (true, Some(store)) = (persisted, &self.persistence) {
                        match store.discard(job) {
                            Ok(()) => log.warning("Stored rows withdrawn"),
                            Err(discard) => {
                                log.error(format!("Could not withdraw stored rows: {}", discard))
                            }
                        }
                    }
                    return Err(e.into());
                }
                log.success(format!("📧 Sent to {}", notification.to));
                true
            }
            _ => false,
        };

        Ok(JobReport {
            job_id: job.job_id,
            document_name: job.document_name.clone(),
            workbook,
            sheets,
            skipped: outcome.skipped,
            persisted,
            delivered,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{JsonSnapshot, OutboxDelivery};
    use crate::error::{DeliveryError, DeliveryResult, JobError};
    use crate::models::{Cell, RawRow};
    use std::sync::{Arc, Mutex};

    fn row(cells: &[&str]) -> RawRow {
        cells.iter().map(|c| Cell::from(*c)).collect()
    }

    fn raw() -> RawWorkbook {
        RawWorkbook::new()
            .with_sheet(
                "Desktops",
                vec![
                    row(&["Tag", "Area", "User"]),
                    row(&["", "Finance", ""]),
                    row(&["HQ/1-3", "", "shared"]),
                ],
            )
            .with_sheet("Summary", vec![row(&["Total", "3"])])
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Persistence for Recorder {
        fn persist(&self, _: &JobContext, _: &OutputWorkbook) -> DeliveryResult<()> {
            self.events.lock().unwrap().push("persist");
            Ok(())
        }

        fn discard(&self, _: &JobContext) -> DeliveryResult<()> {
            self.events.lock().unwrap().push("discard");
            Ok(())
        }
    }

    impl Delivery for Recorder {
        fn deliver(&self, _: &Notification) -> DeliveryResult<()> {
            self.events.lock().unwrap().push("deliver");
            Ok(())
        }
    }

    struct FailingStore;

    impl Persistence for FailingStore {
        fn persist(&self, _: &JobContext, _: &OutputWorkbook) -> DeliveryResult<()> {
            Err(DeliveryError::IoError(std::io::Error::other("disk full")))
        }

        fn discard(&self, _: &JobContext) -> DeliveryResult<()> {
            Ok(())
        }
    }

    struct FailingRelay;

    impl Delivery for FailingRelay {
        fn deliver(&self, _: &Notification) -> DeliveryResult<()> {
            Err(DeliveryError::IoError(std::io::Error::other("relay down")))
        }
    }

    #[test]
    fn test_normalize_expands_and_skips() {
        let out = normalize(&raw()).unwrap();
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["Computers"]);
        assert_eq!(out.row_count(), 3);
    }

    #[test]
    fn test_report_counts_sheets_and_skips() {
        let job = JobContext::new("register.xlsx", None);
        let report = Orchestrator::new(CategoryRegistry::builtin())
            .transform(&raw(), &job)
            .unwrap();

        assert_eq!(report.sheets.len(), 1);
        assert_eq!(report.sheets[0].rows, 3);
        assert_eq!(report.skipped, vec!["Summary".to_string()]);
        assert!(!report.persisted && !report.delivered);
    }

    #[test]
    fn test_persistence_runs_before_delivery() {
        let recorder = Recorder::default();
        let job = JobContext::new("register.xlsx", Some("it@example.org".to_string()));
        let report = Orchestrator::new(CategoryRegistry::builtin())
            .with_persistence(recorder.clone())
            .with_delivery(recorder.clone())
            .transform(&raw(), &job)
            .unwrap();

        assert!(report.persisted && report.delivered);
        assert_eq!(*recorder.events.lock().unwrap(), vec!["persist", "deliver"]);
    }

    #[test]
    fn test_failed_persistence_skips_delivery() {
        let recorder = Recorder::default();
        let job = JobContext::new("register.xlsx", Some("it@example.org".to_string()));
        let err = Orchestrator::new(CategoryRegistry::builtin())
            .with_persistence(FailingStore)
            .with_delivery(recorder.clone())
            .transform(&raw(), &job)
            .unwrap_err();

        assert!(matches!(err, JobError::Delivery(_)));
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_file_collaborators_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let job = JobContext::new("register.xlsx", Some("it@example.org".to_string()));
        Orchestrator::new(CategoryRegistry::builtin())
            .with_persistence(JsonSnapshot::new(dir.path().join("snapshots")))
            .with_delivery(OutboxDelivery::new(dir.path().join("outbox")))
            .transform(&raw(), &job)
            .unwrap();

        let id = job.job_id.to_string();
        assert!(dir.path().join("snapshots").join(format!("{}.json", id)).exists());
        assert!(dir.path().join("outbox").join(format!("{}.xlsx", id)).exists());
    }

    #[test]
    fn test_garbage_bytes_are_a_decode_error() {
        let job = JobContext::new("notes.txt", None);
        let err = Orchestrator::new(CategoryRegistry::builtin())
            .transform_bytes(b"just text", &job)
            .unwrap_err();
        assert!(matches!(err, JobError::Decode(_)));
    }

    #[test]
    fn test_bad_recipient_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshot::new(dir.path().join("snapshots"));
        let job = JobContext::new("register.xlsx", Some("not-an-address".to_string()));
        let err = Orchestrator::new(CategoryRegistry::builtin())
            .with_persistence(store.clone())
            .with_delivery(OutboxDelivery::new(dir.path().join("outbox")))
            .transform(&raw(), &job)
            .unwrap_err();

        assert!(matches!(err, JobError::Delivery(DeliveryError::InvalidRecipient(_))));
        assert!(!store.path_for(&job).exists());
    }

    #[test]
    fn test_failed_delivery_withdraws_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshot::new(dir.path());
        let job = JobContext::new("register.xlsx", Some("it@example.org".to_string()));
        let err = Orchestrator::new(CategoryRegistry::builtin())
            .with_persistence(store.clone())
            .with_delivery(FailingRelay)
            .transform(&raw(), &job)
            .unwrap_err();

        assert!(matches!(err, JobError::Delivery(_)));
        assert!(!store.path_for(&job).exists());
    }

    #[test]
    fn test_failed_delivery_discards_after_persist() {
        let recorder = Recorder::default();
        let job = JobContext::new("register.xlsx", Some("it@example.org".to_string()));
        Orchestrator::new(CategoryRegistry::builtin())
            .with_persistence(recorder.clone())
            .with_delivery(FailingRelay)
            .transform(&raw(), &job)
            .unwrap_err();

        assert_eq!(*recorder.events.lock().unwrap(), vec!["persist", "discard"]);
    }
}

//! # Tagsheet - Inventory spreadsheet normalization
//!
//! Tagsheet turns hand-maintained IT asset registers (one `.xlsx` workbook,
//! one sheet per equipment category) into canonical per-category tables.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  .xlsx file │────▶│   Parser    │────▶│  Transform  │────▶│   Output    │
//! │  (upload)   │     │  (calamine) │     │ (categories)│     │  workbook   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                                          ┌─────────────┐           │
//!                                          │  Delivery   │◀──────────┘
//!                                          │ (outbox/db) │
//!                                          └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tagsheet::{decode_xlsx_file, normalize};
//!
//! let raw = decode_xlsx_file(Path::new("register.xlsx"))?;
//! let out = normalize(&raw)?;
//! println!("{} rows in {} sheets", out.row_count(), out.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cells, raw and output workbooks
//! - [`parser`] - `.xlsx` decoding
//! - [`transform`] - Tag expansion, sections, status, grouping, dispatch
//! - [`delivery`] - Rendering, notification and persistence
//! - [`config`] - Runtime settings
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Delivery
pub mod delivery;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    DecodeError, DecodeResult, DeliveryError, DeliveryResult, JobError, JobResult,
    NormalizeError, NormalizeResult, ServerError, ServerResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, OutputSheet, OutputWorkbook, RawSheet, RawWorkbook};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{decode_xlsx_bytes, decode_xlsx_file};

// =============================================================================
// Re-exports - Engine
// =============================================================================

pub use transform::{
    dispatch, expand, expand_tag, normalize, CategoryHandler, CategoryRegistry, DispatchOutcome,
    JobContext, JobReport, Orchestrator,
};

// =============================================================================
// Re-exports - Delivery
// =============================================================================

pub use delivery::{render_xlsx, Delivery, JsonSnapshot, Notification, OutboxDelivery, Persistence};

pub use config::Settings;

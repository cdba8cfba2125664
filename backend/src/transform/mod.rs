//! Normalization engine.
//!
//! - Tags: Range expansion of asset tag cells
//! - Section: Section context carried across rows
//! - Header: Canonical header and row projection
//! - Status: Condition codes and derived status
//! - Grouper: Fuzzy description clusters
//! - Dispatcher: Sheet name to category routing
//! - Categories: Built-in category configuration and handlers
//! - Pipeline: Job orchestration

pub mod categories;
pub mod dispatcher;
pub mod grouper;
pub mod header;
pub mod pipeline;
pub mod section;
pub mod status;
pub mod tags;

pub use dispatcher::{dispatch, CategoryHandler, CategoryRegistry, DispatchOutcome};
pub use pipeline::*;
pub use tags::{expand, expand_tag};

//! Sheet-name routing to category handlers.
//!
//! Each input sheet is looked up by its normalized name (trimmed,
//! lower-cased, inner whitespace collapsed). Sheets with no registered
//! handler are skipped without error and reported in [`DispatchOutcome`].

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::categories;
use super::status::squash;
use crate::error::NormalizeResult;
use crate::models::{OutputWorkbook, RawSheet, RawWorkbook};

/// A category's normalization routine.
///
/// Handlers extend the accumulator; they must not rewrite sheets another
/// handler produced.
pub trait CategoryHandler: Send + Sync {
    /// Category label, for reports.
    fn category(&self) -> &str;

    /// Normalize `sheet` into `out`.
    fn handle(&self, sheet: &RawSheet, out: &mut OutputWorkbook) -> NormalizeResult<()>;
}

static BUILTIN: Lazy<CategoryRegistry> = Lazy::new(categories::builtin_registry);

/// Normalized registry key for a sheet name.
pub fn sheet_key(name: &str) -> String {
    squash(name)
}

/// Sheet name → handler map.
#[derive(Default)]
pub struct CategoryRegistry {
    handlers: HashMap<String, Box<dyn CategoryHandler>>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled-in registry.
    pub fn builtin() -> &'static CategoryRegistry {
        &BUILTIN
    }

    /// Register `handler` for a sheet name (normalized on insert).
    pub fn register(&mut self, sheet_name: &str, handler: Box<dyn CategoryHandler>) {
        self.handlers.insert(sheet_key(sheet_name), handler);
    }

    pub fn lookup(&self, sheet_name: &str) -> Option<&dyn CategoryHandler> {
        self.handlers.get(&sheet_key(sheet_name)).map(|h| h.as_ref())
    }

    /// Registered sheet names with their category, sorted by name.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .handlers
            .iter()
            .map(|(name, handler)| (name.as_str(), handler.category()))
            .collect();
        entries.sort();
        entries
    }
}

/// What happened to each input sheet during one dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    pub workbook: OutputWorkbook,
    /// (input sheet, category) for every routed sheet.
    pub handled: Vec<(String, String)>,
    /// Input sheets with no registered handler.
    pub skipped: Vec<String>,
}

/// Route every sheet of `raw` through `registry`.
///
/// The first handler error aborts the dispatch.
pub fn dispatch(raw: &RawWorkbook, registry: &CategoryRegistry) -> NormalizeResult<DispatchOutcome> {
    let mut outcome = DispatchOutcome::default();

    for sheet in raw.sheets() {
        match registry.lookup(&sheet.name) {
            Some(handler) => {
                handler.handle(sheet, &mut outcome.workbook)?;
                outcome
                    .handled
                    .push((sheet.name.clone(), handler.category().to_string()));
            }
            None => outcome.skipped.push(sheet.name.clone()),
        }
    }

    Ok(outcome)
}

/// Route every sheet and keep only the resulting workbook.
pub fn run(raw: &RawWorkbook, registry: &CategoryRegistry) -> NormalizeResult<OutputWorkbook> {
    dispatch(raw, registry).map(|outcome| outcome.workbook)
}

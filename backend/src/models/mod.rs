//! Domain models for the normalization engine.
//!
//! - [`Cell`] - A single decoded spreadsheet value
//! - [`RawSheet`] / [`RawWorkbook`] - The decoded upload, read-only to the engine
//! - [`OutputSheet`] / [`OutputWorkbook`] - Canonical per-category tables

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{NormalizeError, NormalizeResult};

// =============================================================================
// Cells
// =============================================================================

/// A decoded cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    /// Blank cell.
    #[default]
    Empty,
    /// Numeric cell (integers and date serials included).
    Number(f64),
    /// Text cell.
    Text(String),
}

impl Cell {
    /// Build a text cell.
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// True for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Textual rendering used by every string-based rule.
    ///
    /// Integral numbers render without a fractional part so that a tag typed
    /// as `15` reads back as `"15"`, not `"15.0"`.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// One input row.
pub type RawRow = Vec<Cell>;

/// One output row, aligned with its sheet's header.
pub type CanonicalRow = Vec<Cell>;

/// Read a cell by index, treating out-of-range as empty.
pub fn cell_text(row: &[Cell], index: usize) -> String {
    row.get(index).map(Cell::as_text).unwrap_or_default()
}

// =============================================================================
// Input workbook
// =============================================================================

/// A decoded input sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<RawRow>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<RawRow>) -> Self {
        Self { name: name.into(), rows }
    }

    /// True when no row carries a non-blank cell.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(Cell::is_blank))
    }
}

/// The decoded upload, in source sheet order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWorkbook {
    sheets: Vec<RawSheet>,
}

impl RawWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet; a repeated name replaces the earlier sheet in place.
    pub fn insert(&mut self, sheet: RawSheet) {
        match self.sheets.iter_mut().find(|s| s.name == sheet.name) {
            Some(existing) => *existing = sheet,
            None => self.sheets.push(sheet),
        }
    }

    /// Builder-style [`RawWorkbook::insert`].
    pub fn with_sheet(mut self, name: impl Into<String>, rows: Vec<RawRow>) -> Self {
        self.insert(RawSheet::new(name, rows));
        self
    }

    pub fn sheets(&self) -> &[RawSheet] {
        &self.sheets
    }

    pub fn get(&self, name: &str) -> Option<&RawSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

// =============================================================================
// Output workbook
// =============================================================================

/// One canonical output table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<CanonicalRow>,
}

impl OutputSheet {
    pub fn new(name: impl Into<String>, header: Vec<String>) -> Self {
        Self {
            name: name.into(),
            header,
            rows: Vec::new(),
        }
    }

    /// Append a row, enforcing the header-length invariant.
    pub fn push(&mut self, row: CanonicalRow) -> NormalizeResult<()> {
        if row.len() != self.header.len() {
            return Err(NormalizeError::ShapeMismatch {
                sheet: self.name.clone(),
                expected: self.header.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }
}

/// The engine's result: output sheets keyed by unique name, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputWorkbook {
    sheets: Vec<OutputSheet>,
}

impl OutputWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sheet names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&OutputSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut OutputSheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn sheets(&self) -> &[OutputSheet] {
        &self.sheets
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Total canonical rows across all sheets.
    pub fn row_count(&self) -> usize {
        self.sheets.iter().map(|s| s.rows.len()).sum()
    }

    /// Get the sheet `name`, creating it with `header` if absent.
    ///
    /// An existing sheet must carry the same header; extending it with a
    /// different layout would break the row-length invariant.
    pub fn sheet_with_header(
        &mut self,
        name: &str,
        header: &[String],
    ) -> NormalizeResult<&mut OutputSheet> {
        let index = match self.sheets.iter().position(|s| s.name == name) {
            Some(i) => {
                if self.sheets[i].header != header {
                    return Err(NormalizeError::HeaderConflict {
                        sheet: name.to_string(),
                        existing: self.sheets[i].header.clone(),
                        incoming: header.to_vec(),
                    });
                }
                i
            }
            None => {
                self.sheets.push(OutputSheet::new(name, header.to_vec()));
                self.sheets.len() - 1
            }
        };
        Ok(&mut self.sheets[index])
    }
}

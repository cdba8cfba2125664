//! Canonical header construction.
//!
//! Source layouts differ from office to office. A category describes its
//! canonical header as "the source header, minus some columns, with some
//! names substituted, plus derived columns". The keep-set is computed once
//! and reused to project every data row, so header and rows cannot drift.

use std::collections::{BTreeSet, HashMap};

use crate::error::{NormalizeError, NormalizeResult};
use crate::models::{CanonicalRow, Cell};

/// Build a canonical header from a source header row.
///
/// Out-of-range removal indices are ignored, as are duplicates.
pub fn build_header(
    source: &[Cell],
    name_map: &HashMap<String, String>,
    removed: &[usize],
    appended: &[String],
) -> Vec<String> {
    Layout::new(source, name_map, removed, appended).header
}

/// A source-to-canonical column projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Source indices that survive, in source order.
    keep: Vec<usize>,
    /// Number of derived columns appended after the kept ones.
    appended: usize,
    /// The canonical header.
    pub header: Vec<String>,
}

impl Layout {
    pub fn new(
        source: &[Cell],
        name_map: &HashMap<String, String>,
        removed: &[usize],
        appended: &[String],
    ) -> Self {
        let removed: BTreeSet<usize> = removed.iter().copied().collect();
        let keep: Vec<usize> = (0..source.len()).filter(|i| !removed.contains(i)).collect();

        let mut header: Vec<String> = keep
            .iter()
            .map(|&i| {
                let name = source[i].as_text();
                match name_map.get(name.trim()) {
                    Some(renamed) => renamed.clone(),
                    None => name,
                }
            })
            .collect();
        header.extend(appended.iter().cloned());

        Self {
            keep,
            appended: appended.len(),
            header,
        }
    }

    /// Position of a source column in the canonical header, if it survived.
    pub fn position_of(&self, source_index: usize) -> Option<usize> {
        self.keep.iter().position(|&i| i == source_index)
    }

    /// Project a source row and its derived values onto the canonical header.
    ///
    /// Short rows are padded with empty cells; cells beyond the source header
    /// are dropped.
    pub fn project(&self, row: &[Cell], derived: Vec<Cell>) -> NormalizeResult<CanonicalRow> {
        if derived.len() != self.appended {
            return Err(NormalizeError::ShapeMismatch {
                sheet: self.header.join("|"),
                expected: self.appended,
                found: derived.len(),
            });
        }

        let mut out: CanonicalRow = self
            .keep
            .iter()
            .map(|&i| row.get(i).cloned().unwrap_or_default())
            .collect();
        out.extend(derived);
        Ok(out)
    }
}

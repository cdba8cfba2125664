//! Section/area context propagation.
//!
//! Hand-maintained registers group rows under a section row that names a
//! room or department, and later rows leave their own area blank or write a
//! generic placeholder such as "Shared" in the assignee column. A single
//! forward scan carries the last recognized section label down the sheet.
//!
//! The scan is a fold over [`SectionContext`]; nothing survives past the
//! sheet it was started for.

use crate::models::{cell_text, Cell, RawRow};

/// Assignee values that stand for "whoever sits in this section".
///
/// Matching is case-insensitive on the trimmed value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSet {
    prefixes: Vec<String>,
    exact: Vec<String>,
}

impl MarkerSet {
    pub fn new(prefixes: &[&str], exact: &[&str]) -> Self {
        Self {
            prefixes: prefixes.iter().map(|p| p.to_lowercase()).collect(),
            exact: exact.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        let value = value.trim().to_lowercase();
        if value.is_empty() {
            return false;
        }
        self.exact.iter().any(|e| *e == value) || self.prefixes.iter().any(|p| value.starts_with(p))
    }
}

/// Which labels count as section names, and which assignees are markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionRules {
    sections: Vec<String>,
    markers: MarkerSet,
}

impl SectionRules {
    pub fn new(sections: &[&str], markers: MarkerSet) -> Self {
        Self {
            sections: sections.iter().map(|s| s.to_lowercase()).collect(),
            markers,
        }
    }

    pub fn is_section(&self, label: &str) -> bool {
        let label = label.trim().to_lowercase();
        !label.is_empty() && self.sections.contains(&label)
    }

    pub fn is_marker(&self, value: &str) -> bool {
        self.markers.matches(value)
    }
}

/// Columns the scan reads and rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionColumns {
    pub area: usize,
    pub assignee: Option<usize>,
}

/// The scan accumulator: the most recent recognized section label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionContext {
    pub label: String,
}

impl SectionContext {
    /// Advance over one row, returning the new context and the rewritten row.
    ///
    /// Blank area cells inherit the current label; marker assignees are
    /// replaced by it.
    pub fn step(self, mut row: RawRow, rules: &SectionRules, columns: SectionColumns) -> (Self, RawRow) {
        let area = cell_text(&row, columns.area);
        let label = if rules.is_section(&area) {
            area.trim().to_string()
        } else {
            self.label
        };

        if area.trim().is_empty() && !label.is_empty() {
            set_cell(&mut row, columns.area, Cell::text(label.clone()));
        }

        if let Some(assignee) = columns.assignee {
            if rules.is_marker(&cell_text(&row, assignee)) {
                set_cell(&mut row, assignee, Cell::from(label.as_str()));
            }
        }

        (Self { label }, row)
    }
}

/// Run the scan over a sheet's data rows.
pub fn propagate(rows: Vec<RawRow>, rules: &SectionRules, columns: SectionColumns) -> Vec<RawRow> {
    let (_, rows) = rows.into_iter().fold(
        (SectionContext::default(), Vec::new()),
        |(context, mut out), row| {
            let (context, row) = context.step(row, rules, columns);
            out.push(row);
            (context, out)
        },
    );
    rows
}

/// A row that only names a section: recognized label, nothing else filled.
pub fn is_section_row(row: &[Cell], rules: &SectionRules, area: usize) -> bool {
    rules.is_section(&cell_text(row, area))
        && row
            .iter()
            .enumerate()
            .all(|(i, cell)| i == area || cell.is_blank())
}

fn set_cell(row: &mut RawRow, index: usize, cell: Cell) {
    if row.len() <= index {
        row.resize(index + 1, Cell::Empty);
    }
    row[index] = cell;
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: SectionColumns = SectionColumns {
        area: 0,
        assignee: Some(2),
    };

    fn rules() -> SectionRules {
        SectionRules::new(
            &["SectionA", "SectionB"],
            MarkerSet::new(&["shared"], &["general"]),
        )
    }

    fn row(cells: &[&str]) -> RawRow {
        cells.iter().map(|c| Cell::from(*c)).collect()
    }

    #[test]
    fn test_marker_rows_take_latest_section() {
        let rows = vec![
            row(&["SectionA", "", ""]),
            row(&["", "HQ/1", "Shared desk"]),
            row(&["SectionB", "", ""]),
            row(&["", "HQ/2", "general"]),
        ];
        let out = propagate(rows, &rules(), COLUMNS);
        assert_eq!(out[1][2], Cell::text("SectionA"));
        assert_eq!(out[3][2], Cell::text("SectionB"));
        assert_eq!(out[1][0], Cell::text("SectionA"));
    }

    #[test]
    fn test_unrecognized_area_does_not_move_label() {
        let rows = vec![
            row(&["SectionA", "", ""]),
            row(&["Corridor", "HQ/1", "shared"]),
        ];
        let out = propagate(rows, &rules(), COLUMNS);
        assert_eq!(out[1][0], Cell::text("Corridor"));
        assert_eq!(out[1][2], Cell::text("SectionA"));
    }

    #[test]
    fn test_named_assignees_are_kept() {
        let rows = vec![row(&["SectionA", "", ""]), row(&["", "HQ/1", "J. Moyo"])];
        let out = propagate(rows, &rules(), COLUMNS);
        assert_eq!(out[1][2], Cell::text("J. Moyo"));
    }

    #[test]
    fn test_marker_before_any_section_is_blanked() {
        let out = propagate(vec![row(&["", "HQ/1", "shared"])], &rules(), COLUMNS);
        assert_eq!(out[0][2], Cell::Empty);
        assert_eq!(out[0][0], Cell::Empty);
    }

    #[test]
    fn test_step_is_independent_of_other_rows() {
        let context = SectionContext {
            label: "SectionB".into(),
        };
        let (next, out) = context.step(row(&["", "HQ/9", "general"]), &rules(), COLUMNS);
        assert_eq!(next.label, "SectionB");
        assert_eq!(out[2], Cell::text("SectionB"));
    }

    #[test]
    fn test_section_row_detection() {
        assert!(is_section_row(&row(&["sectiona", "", ""]), &rules(), 0));
        assert!(!is_section_row(&row(&["SectionA", "HQ/1", ""]), &rules(), 0));
        assert!(!is_section_row(&row(&["Corridor", "", ""]), &rules(), 0));
    }
}

//! Status derivation and condition clean-up.
//!
//! Registers rarely carry a status column. What they do carry is an
//! "assigned to" column holding either a person or a placeholder ("Spare",
//! "Store room", "Faulty") and a free-text condition column. Both are mapped
//! onto the registry's canonical vocabulary by per-category tables.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{cell_text, Cell};

/// Status used when no rule recognizes the assignee.
pub const DEFAULT_STATUS: &str = "Assigned";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

/// Lower-case and collapse runs of whitespace.
pub fn squash(value: &str) -> String {
    WHITESPACE.replace_all(value.trim(), " ").to_lowercase()
}

/// Free-text condition normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionRules {
    /// Whole-value substitutions, checked first.
    values: Vec<(String, String)>,
    /// Substring substitutions, first match wins.
    contains: Vec<(String, String)>,
}

impl ConditionRules {
    pub fn new(values: &[(&str, &str)], contains: &[(&str, &str)]) -> Self {
        Self {
            values: values.iter().map(|(k, v)| (squash(k), v.to_string())).collect(),
            contains: contains.iter().map(|(k, v)| (squash(k), v.to_string())).collect(),
        }
    }

    /// Map a condition cell onto its canonical code.
    ///
    /// Unrecognized text passes through unchanged.
    pub fn normalize(&self, cell: &Cell) -> Cell {
        if cell.is_blank() {
            return Cell::Empty;
        }
        let key = squash(&cell.as_text());

        let found = self
            .values
            .iter()
            .find(|(k, _)| *k == key)
            .or_else(|| self.contains.iter().find(|(k, _)| key.contains(k.as_str())));

        match found {
            Some((_, code)) => Cell::from(code.as_str()),
            None => cell.clone(),
        }
    }
}

/// Per-category status derivation tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRules {
    /// Assignee placeholder → status.
    assignee: Vec<(String, String)>,
    /// Normalized condition code → status; overrides the assignee rule.
    condition: Vec<(String, String)>,
}

impl StatusRules {
    pub fn new(assignee: &[(&str, &str)], condition: &[(&str, &str)]) -> Self {
        Self {
            assignee: assignee.iter().map(|(k, v)| (squash(k), v.to_string())).collect(),
            condition: condition.iter().map(|(k, v)| (squash(k), v.to_string())).collect(),
        }
    }
}

/// Columns status derivation reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusColumns {
    pub assignee: Option<usize>,
    pub condition: Option<usize>,
}

/// Derive the canonical status label for a row.
pub fn derive_status(row: &[Cell], columns: StatusColumns, rules: &StatusRules) -> String {
    let lookup = |table: &[(String, String)], index: Option<usize>| {
        let key = squash(&cell_text(row, index?));
        table.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone())
    };

    lookup(&rules.condition, columns.condition)
        .or_else(|| lookup(&rules.assignee, columns.assignee))
        .unwrap_or_else(|| DEFAULT_STATUS.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions() -> ConditionRules {
        ConditionRules::new(
            &[("n/a", ""), ("ok", "G")],
            &[("not working", "B"), ("good", "G"), ("working", "G")],
        )
    }

    fn statuses() -> StatusRules {
        StatusRules::new(
            &[("spare", "Available"), ("store room", "In Storage"), ("", "Available")],
            &[("B", "Broken")],
        )
    }

    const COLUMNS: StatusColumns = StatusColumns {
        assignee: Some(0),
        condition: Some(1),
    };

    #[test]
    fn test_condition_substitutions() {
        let rules = conditions();
        assert_eq!(rules.normalize(&Cell::text("Good  working order")), Cell::text("G"));
        assert_eq!(rules.normalize(&Cell::text("NOT working")), Cell::text("B"));
        assert_eq!(rules.normalize(&Cell::text("N/A")), Cell::Empty);
        assert_eq!(rules.normalize(&Cell::text("Scratched")), Cell::text("Scratched"));
        assert_eq!(rules.normalize(&Cell::Empty), Cell::Empty);
    }

    #[test]
    fn test_assignee_lookup_is_case_insensitive() {
        let row = vec![Cell::text("  SPARE "), Cell::text("G")];
        assert_eq!(derive_status(&row, COLUMNS, &statuses()), "Available");

        let row = vec![Cell::text("Store   Room"), Cell::Empty];
        assert_eq!(derive_status(&row, COLUMNS, &statuses()), "In Storage");
    }

    #[test]
    fn test_unmatched_assignee_defaults_to_assigned() {
        let row = vec![Cell::text("T. Banda"), Cell::text("G")];
        assert_eq!(derive_status(&row, COLUMNS, &statuses()), DEFAULT_STATUS);
    }

    #[test]
    fn test_blank_assignee_uses_empty_rule() {
        let row = vec![Cell::Empty, Cell::Empty];
        assert_eq!(derive_status(&row, COLUMNS, &statuses()), "Available");
    }

    #[test]
    fn test_condition_overrides_assignee() {
        let row = vec![Cell::text("T. Banda"), Cell::text("B")];
        assert_eq!(derive_status(&row, COLUMNS, &statuses()), "Broken");
    }

    #[test]
    fn test_missing_columns_default() {
        let row = vec![Cell::text("spare")];
        assert_eq!(
            derive_status(&row, StatusColumns::default(), &statuses()),
            DEFAULT_STATUS
        );
    }
}

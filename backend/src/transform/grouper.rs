//! Cluster accessory rows into output sheets by description similarity.
//!
//! Accessory logs name the same kind of item a dozen ways. Instead of exact
//! keys, each row joins the first existing sheet whose name is close enough
//! to its description, or opens a new sheet named after it.
//!
//! # Architecture
//!
//! ```text
//! Accessory rows                      Output sheets
//! ┌──────────────────────────┐       ┌─────────────────────────────┐
//! │ USB Mouse                │       │ USB Mouse                   │
//! │ HDMI Cable 2m            │       │   USB Mouse, USB Mouses     │
//! │ USB Mouses               │  →    ├─────────────────────────────┤
//! │ HDMI Cable 3m            │       │ HDMI Cable 2m               │
//! │ Keyboard/Mouse           │       │   HDMI Cable 2m, HDMI Cab…  │
//! └──────────────────────────┘       ├─────────────────────────────┤
//!                                    │ Keyboard-Mouse              │
//!                                    └─────────────────────────────┘
//! ```
//!
//! Similarity is the character matching ratio `2·M / (|a| + |b|)`, where `M`
//! counts characters in the longest-common-block decomposition of both
//! strings. Candidates are tried in the order their sheets were created.

use crate::error::NormalizeResult;
use crate::models::{cell_text, CanonicalRow, OutputWorkbook};

/// A description must score strictly above this to join an existing sheet.
pub const SIMILARITY_THRESHOLD: f64 = 0.80;

/// Sheet-key form of a description: `/` is not allowed in sheet names.
pub fn normalize_description(raw: &str) -> String {
    raw.trim().replace('/', "-")
}

/// Place `row` into the sheet its description belongs to.
///
/// Only sheets laid out with `header` are candidates, so other categories'
/// tables are never joined. Returns the receiving sheet's name, or `None`
/// when the description is empty and the row was dropped.
pub fn assign(
    row: CanonicalRow,
    sheets: &mut OutputWorkbook,
    description_column: usize,
    header: &[String],
    reserved: &[&str],
) -> NormalizeResult<Option<String>> {
    let description = normalize_description(&cell_text(&row, description_column));
    if description.is_empty() {
        return Ok(None);
    }

    let candidates = sheets
        .sheets()
        .iter()
        .filter(|sheet| sheet.header == header)
        .map(|sheet| sheet.name.as_str());
    let key = match best_match(&description, candidates) {
        Some(key) => key,
        None => cluster_key(sheets, &description, header, reserved),
    };

    sheets.sheet_with_header(&key, header)?.push(row)?;
    Ok(Some(key))
}

/// Name for a new cluster.
///
/// The description itself unless it is `reserved` (case-insensitively) or
/// held by a sheet with another layout; then the first free `"{name} (n)"`.
fn cluster_key(
    sheets: &OutputWorkbook,
    description: &str,
    header: &[String],
    reserved: &[&str],
) -> String {
    let mut key = description.to_string();
    let mut n = 2;
    loop {
        let is_reserved = reserved.iter().any(|r| r.eq_ignore_ascii_case(&key));
        match sheets.get(&key) {
            Some(sheet) if sheet.header == header && !is_reserved => return key,
            None if !is_reserved => return key,
            _ => {}
        }
        key = format!("{} ({})", description, n);
        n += 1;
    }
}

/// First key scoring strictly above [`SIMILARITY_THRESHOLD`].
pub fn best_match<'a>(description: &str, mut keys: impl Iterator<Item = &'a str>) -> Option<String> {
    keys.find(|key| similarity(description, key) > SIMILARITY_THRESHOLD)
        .map(str::to_string)
}

/// Character matching ratio in `0.0..=1.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Sum of block sizes found by recursively splitting around the longest match.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, b, (alo, ahi), (blo, bhi));
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    total
}

/// Longest common block within the given windows.
///
/// Ties go to the block starting earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let width = bhi - blo + 1;
    let mut best = (alo, blo, 0);
    let mut previous = vec![0usize; width];

    for i in alo..ahi {
        let mut current = vec![0usize; width];
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = previous[j - blo] + 1;
                current[j - blo + 1] = k;
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        previous = current;
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    fn described(description: &str) -> CanonicalRow {
        vec![Cell::text(description), Cell::Empty]
    }

    fn header() -> Vec<String> {
        vec!["description".to_string(), "status".to_string()]
    }

    fn grouped(descriptions: &[&str]) -> OutputWorkbook {
        let mut sheets = OutputWorkbook::new();
        for description in descriptions {
            assign(described(description), &mut sheets, 0, &header(), &[]).unwrap();
        }
        sheets
    }

    #[test]
    fn test_similarity_ratio() {
        assert_eq!(similarity("abcd", "abcd"), 1.0);
        assert_eq!(similarity("abcd", "wxyz"), 0.0);
        assert_eq!(similarity("abcde", "abcdf"), 0.8);
        assert!((similarity("abcdefghijk", "abcdefghixy") - 18.0 / 22.0).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_of_exactly_threshold_is_not_merged() {
        let sheets = grouped(&["abcde", "abcdf"]);
        assert_eq!(sheets.keys().collect::<Vec<_>>(), vec!["abcde", "abcdf"]);
    }

    #[test]
    fn test_ratio_above_threshold_is_merged() {
        let sheets = grouped(&["abcdefghijk", "abcdefghixy"]);
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets.get("abcdefghijk").unwrap().rows.len(), 2);
    }

    #[test]
    fn test_slash_is_normalized_in_new_keys() {
        let sheets = grouped(&["Mouse/Keyboard combo"]);
        assert!(sheets.contains("Mouse-Keyboard combo"));
    }

    #[test]
    fn test_empty_description_is_dropped() {
        let mut sheets = OutputWorkbook::new();
        let placed = assign(described("  "), &mut sheets, 0, &header(), &[]).unwrap();
        assert_eq!(placed, None);
        assert!(sheets.is_empty());
    }

    #[test]
    fn test_first_qualifying_key_wins() {
        let mut sheets = OutputWorkbook::new();
        assign(described("HDMI Cable 2m"), &mut sheets, 0, &header(), &[]).unwrap();
        assign(described("HDMI Cable 3m"), &mut sheets, 0, &header(), &[]).unwrap();
        assert_eq!(sheets.len(), 1);

        // Scores above threshold against both keys once a second key exists.
        sheets.sheet_with_header("HDMI Cable 5m", &header()).unwrap();
        let placed = assign(described("HDMI Cable 4m"), &mut sheets, 0, &header(), &[]).unwrap();
        assert_eq!(placed.as_deref(), Some("HDMI Cable 2m"));
    }

    #[test]
    fn test_other_layouts_are_never_joined() {
        let mut sheets = OutputWorkbook::new();
        let tagged = vec!["asset_tag".to_string(), "status".to_string()];
        sheets.sheet_with_header("Printers", &tagged).unwrap();

        let placed = assign(described("Printers"), &mut sheets, 0, &header(), &[]).unwrap();
        assert_eq!(placed.as_deref(), Some("Printers (2)"));
        assert_eq!(sheets.get("Printers").unwrap().header, tagged);

        // The suffixed cluster is reused for the same description.
        let placed = assign(described("Printers"), &mut sheets, 0, &header(), &[]).unwrap();
        assert_eq!(placed.as_deref(), Some("Printers (2)"));
        assert_eq!(sheets.get("Printers (2)").unwrap().rows.len(), 2);
    }

    #[test]
    fn test_reserved_names_are_avoided() {
        let mut sheets = OutputWorkbook::new();
        let placed = assign(described("monitors"), &mut sheets, 0, &header(), &["Monitors"]).unwrap();
        assert_eq!(placed.as_deref(), Some("monitors (2)"));
        assert!(!sheets.contains("monitors"));
    }
}

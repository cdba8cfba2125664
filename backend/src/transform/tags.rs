//! Compact asset tag expansion.
//!
//! Asset registers abbreviate runs of sequentially numbered assets into one
//! row whose tag ends in a range token:
//!
//! ```text
//! AND/UT/010-11        →  AND/UT/010, AND/UT/011
//! AND/UT/T015-16       →  AND/UT/T/015, AND/UT/T/016
//! AND/UT/001-002,010   →  AND/UT/001, AND/UT/002, AND/UT/010
//! ```
//!
//! Everything before the last `/` is the stable prefix shared by every
//! expanded tag. Letters inside a bound become their own path segment and the
//! lower bound's digit count fixes the zero-padding of every generated number.

use crate::error::{TagError, TagResult};
use crate::models::{Cell, RawRow};

/// Largest number of identifiers one tag cell may expand to.
pub const MAX_SPAN: u64 = 10_000;

/// A range bound decomposed against a stable prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    /// Prefix, extended with the bound's letters when it has any.
    pub prefix: String,
    /// The bound's digits, leading zeros kept.
    pub digits: String,
    /// `prefix/digits`.
    pub joined: String,
}

/// Split a raw bound into its letter segment and digit run.
///
/// `("AND/UT", "T015")` gives prefix `AND/UT/T` and digits `015`. Characters
/// keep their relative order inside each partition.
pub fn validate_lower_limit(prefix: &str, raw: &str) -> Bound {
    let (digits, letters): (String, String) = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .partition(|c| c.is_ascii_digit());

    let prefix = if letters.is_empty() {
        prefix.to_string()
    } else {
        join_segment(prefix, &letters)
    };
    let joined = join_segment(&prefix, &digits);

    Bound {
        prefix,
        digits,
        joined,
    }
}

/// Expand the tag held at `tag_column` into one row per resolved identifier.
///
/// Every other cell is cloned unchanged; the tag cell is replaced in place.
/// Rows whose tag is a single identifier, and rows too short to have a tag
/// cell, come back as the single original row.
pub fn expand(row: &RawRow, tag_column: usize) -> TagResult<Vec<RawRow>> {
    let Some(cell) = row.get(tag_column) else {
        return Ok(vec![row.clone()]);
    };

    Ok(match expand_tag(&cell.as_text())? {
        Some(tags) => tags
            .into_iter()
            .map(|tag| {
                let mut expanded = row.clone();
                expanded[tag_column] = Cell::Text(tag);
                expanded
            })
            .collect(),
        None => vec![row.clone()],
    })
}

/// Resolve a compact tag into its ordered identifiers.
///
/// Returns `None` when the range token holds a single identifier, meaning the
/// tag is already resolved and must be kept verbatim. Fails when the whole
/// cell would resolve to more than [`MAX_SPAN`] identifiers.
pub fn expand_tag(tag: &str) -> TagResult<Option<Vec<String>>> {
    let tag = tag.trim();
    let (prefix, token) = match tag.rsplit_once('/') {
        Some((prefix, token)) => (prefix, token),
        None => ("", tag),
    };

    if !token.contains(',') && !token.contains('-') {
        return Ok(None);
    }

    let mut tags: Vec<String> = Vec::new();
    for sub in token.split(',').map(str::trim).filter(|sub| !sub.is_empty()) {
        let span = sub_range_len(prefix, sub);
        let total = (tags.len() as u64).saturating_add(span);
        if total > MAX_SPAN {
            return Err(TagError::SpanTooLarge {
                tag: tag.to_string(),
                span: total,
                limit: MAX_SPAN,
            });
        }
        tags.extend(expand_sub_range(prefix, sub));
    }

    // A token made only of separators resolves to nothing; keep the row as is.
    if tags.is_empty() {
        Ok(None)
    } else {
        Ok(Some(tags))
    }
}

/// Number of identifiers [`expand_sub_range`] will produce, without building them.
fn sub_range_len(prefix: &str, sub: &str) -> u64 {
    match sub.split('-').map(str::trim).collect::<Vec<_>>().as_slice() {
        [lower, upper] => Span::parse(prefix, lower, upper).map_or(1, |span| span.len()),
        _ => 1,
    }
}

/// Expand one comma-separated piece of a range token.
fn expand_sub_range(prefix: &str, sub: &str) -> Vec<String> {
    let parts: Vec<&str> = sub.split('-').map(str::trim).collect();

    match parts.as_slice() {
        [single] => {
            let bound = validate_lower_limit(prefix, single);
            if bound.digits.is_empty() {
                vec![join_segment(prefix, single)]
            } else {
                vec![bound.joined]
            }
        }
        [lower, upper] => match Span::parse(prefix, lower, upper) {
            Some(span) => span.tags().collect(),
            None => vec![join_segment(prefix, sub)],
        },
        _ => vec![join_segment(prefix, sub)],
    }
}

/// An inclusive numeric span with a fixed output width.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    prefix: String,
    start: u64,
    end: u64,
    width: usize,
}

impl Span {
    /// `None` when either bound carries no parseable digits.
    fn parse(prefix: &str, lower: &str, upper: &str) -> Option<Self> {
        let lower = validate_lower_limit(prefix, lower);
        let upper_digits: String = upper.chars().filter(|c| c.is_ascii_digit()).collect();

        let from: u64 = lower.digits.parse().ok()?;
        let to: u64 = upper_digits.parse().ok()?;

        // Reversed bounds keep their cardinality; iteration stays ascending.
        Some(Self {
            prefix: lower.prefix,
            start: from.min(to),
            end: from.max(to),
            width: lower.digits.len(),
        })
    }

    fn len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    fn tags(&self) -> impl Iterator<Item = String> + '_ {
        (self.start..=self.end).map(move |n| {
            let number = format!("{:0width$}", n, width = self.width);
            join_segment(&self.prefix, &number)
        })
    }
}

fn join_segment(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}/{}", prefix, segment)
    }
}

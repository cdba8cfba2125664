//! Built-in category profiles and their handlers.
//!
//! Every table in this module is configuration: which sheet names map to
//! which category, how source columns are recognized and renamed, which
//! labels count as sections, which assignees are placeholders, and how
//! free text maps onto canonical condition codes and statuses.
//!
//! | Sheet names              | Handler       | Output sheet(s)           |
//! |--------------------------|---------------|---------------------------|
//! | computers, desktops      | tagged assets | `Computers`               |
//! | laptops, notebooks       | tagged assets | `Laptops`                 |
//! | monitors, screens        | tagged assets | `Monitors`                |
//! | printers                 | tagged assets | `Printers`                |
//! | accessories, accessory log | accessories | one per description group |

use std::collections::HashMap;

use super::dispatcher::{CategoryHandler, CategoryRegistry};
use super::grouper;
use super::header::Layout;
use super::section::{self, MarkerSet, SectionColumns, SectionRules};
use super::status::{derive_status, squash, ConditionRules, StatusColumns, StatusRules};
use super::tags;
use crate::error::{NormalizeError, NormalizeResult};
use crate::models::{CanonicalRow, Cell, OutputWorkbook, RawRow, RawSheet};

/// Derived column appended to every category.
pub const STATUS_COLUMN: &str = "status";

// =============================================================================
// Configuration tables
// =============================================================================

const TAG_ALIASES: &[&str] = &["asset tag", "tag", "tag no", "tag no.", "tag number", "asset no", "asset number"];
const AREA_ALIASES: &[&str] = &["area", "location", "section", "room", "department"];
const ASSIGNEE_ALIASES: &[&str] = &["assigned to", "user", "assignee", "issued to", "custodian"];
const CONDITION_ALIASES: &[&str] = &["condition", "state", "working condition"];
const DESCRIPTION_ALIASES: &[&str] = &["description", "item description", "item", "accessory"];

/// Bookkeeping columns the registry has no field for.
const REMOVED_COLUMNS: &[&str] = &[
    "no", "no.", "#", "s/no", "item no", "checked", "verified", "verified by", "notes", "comments", "remarks",
];

/// Source header → canonical column name.
const RENAMES: &[(&str, &str)] = &[
    ("asset tag", "asset_tag"),
    ("tag", "asset_tag"),
    ("tag no", "asset_tag"),
    ("tag no.", "asset_tag"),
    ("tag number", "asset_tag"),
    ("asset no", "asset_tag"),
    ("asset number", "asset_tag"),
    ("type", "asset_type"),
    ("make", "manufacturer"),
    ("brand", "manufacturer"),
    ("manufacturer", "manufacturer"),
    ("model", "model"),
    ("model no", "model"),
    ("serial", "serial"),
    ("serial no", "serial"),
    ("serial no.", "serial"),
    ("serial number", "serial"),
    ("s/n", "serial"),
    ("area", "location"),
    ("location", "location"),
    ("section", "location"),
    ("room", "location"),
    ("department", "location"),
    ("assigned to", "assigned_to"),
    ("user", "assigned_to"),
    ("assignee", "assigned_to"),
    ("issued to", "assigned_to"),
    ("custodian", "assigned_to"),
    ("condition", "condition"),
    ("state", "condition"),
    ("working condition", "condition"),
    ("description", "description"),
    ("item description", "description"),
    ("item", "description"),
    ("accessory", "description"),
    ("qty", "quantity"),
    ("quantity", "quantity"),
    ("date received", "received_on"),
    ("received", "received_on"),
    ("purchase date", "purchased_on"),
];

const SECTIONS: &[&str] = &[
    "Reception",
    "Administration",
    "Admin",
    "Finance",
    "Accounts",
    "HR",
    "Human Resources",
    "Boardroom",
    "Server Room",
    "Training Room",
    "Store Room",
    "Workshop",
    "Registry",
    "Open Plan",
    "Executive Suite",
];

const MARKER_PREFIXES: &[&str] = &["shared", "common", "hot desk", "hotdesk", "pool", "general"];
const MARKER_VALUES: &[&str] = &["open plan", "various", "area", "all staff", "staff", "office", "dept"];

const CONDITION_VALUES: &[(&str, &str)] = &[
    ("n/a", ""),
    ("na", ""),
    ("-", ""),
    ("not applicable", ""),
    ("ok", "G"),
    ("new", "N"),
];

const CONDITION_CONTAINS: &[(&str, &str)] = &[
    ("not working", "B"),
    ("not good", "P"),
    ("faulty", "B"),
    ("broken", "B"),
    ("dead", "B"),
    ("excellent", "G"),
    ("good", "G"),
    ("working", "G"),
    ("fair", "F"),
    ("poor", "P"),
];

const ASSIGNEE_STATUSES: &[(&str, &str)] = &[
    ("", "Available"),
    ("spare", "Available"),
    ("available", "Available"),
    ("stock", "Available"),
    ("in stock", "Available"),
    ("store", "In Storage"),
    ("store room", "In Storage"),
    ("storeroom", "In Storage"),
    ("it store", "In Storage"),
    ("repair", "Under Repair"),
    ("in repair", "Under Repair"),
    ("with vendor", "Under Repair"),
    ("faulty", "Broken"),
    ("broken", "Broken"),
    ("disposed", "Retired"),
    ("written off", "Retired"),
    ("missing", "Lost"),
    ("stolen", "Lost"),
];

const CONDITION_STATUSES: &[(&str, &str)] = &[("B", "Broken")];

/// Static description of one category.
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    pub category: &'static str,
    /// Track section context across rows.
    pub sections: bool,
    /// Expand compact tags when a tag column exists.
    pub expand_tags: bool,
}

const COMPUTERS: Profile = Profile {
    category: "computers",
    sections: true,
    expand_tags: true,
};

const LAPTOPS: Profile = Profile {
    category: "laptops",
    sections: true,
    expand_tags: true,
};

const MONITORS: Profile = Profile {
    category: "monitors",
    sections: true,
    expand_tags: true,
};

const PRINTERS: Profile = Profile {
    category: "printers",
    sections: false,
    expand_tags: true,
};

const ACCESSORIES: Profile = Profile {
    category: "accessories",
    sections: true,
    expand_tags: true,
};

/// Build the compiled-in registry.
pub fn builtin_registry() -> CategoryRegistry {
    let mut registry = CategoryRegistry::new();

    let tagged = [
        (&["computers", "desktops"][..], COMPUTERS, "Computers"),
        (&["laptops", "notebooks"][..], LAPTOPS, "Laptops"),
        (&["monitors", "screens"][..], MONITORS, "Monitors"),
        (&["printers"][..], PRINTERS, "Printers"),
    ];
    let outputs: Vec<&'static str> = tagged.iter().map(|(_, _, output)| *output).collect();

    for (names, profile, output) in tagged {
        for name in names {
            registry.register(name, Box::new(TaggedAssets::new(profile, output)));
        }
    }

    for name in ["accessories", "accessory log"] {
        registry.register(name, Box::new(Accessories::new(ACCESSORIES, &outputs)));
    }

    registry
}

// =============================================================================
// Shared sheet preparation
// =============================================================================

/// Resolved column positions in a source header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Columns {
    tag: Option<usize>,
    area: Option<usize>,
    assignee: Option<usize>,
    condition: Option<usize>,
    description: Option<usize>,
}

impl Columns {
    fn resolve(header: &[Cell]) -> Self {
        Self {
            tag: find_column(header, TAG_ALIASES),
            area: find_column(header, AREA_ALIASES),
            assignee: find_column(header, ASSIGNEE_ALIASES),
            condition: find_column(header, CONDITION_ALIASES),
            description: find_column(header, DESCRIPTION_ALIASES),
        }
    }
}

/// First header cell matching any alias, case- and spacing-insensitively.
fn find_column(header: &[Cell], aliases: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|cell| aliases.contains(&squash(&cell.as_text()).as_str()))
}

/// First row with any non-blank cell.
fn header_row(rows: &[RawRow]) -> Option<usize> {
    rows.iter().position(|row| !is_blank_row(row))
}

fn is_blank_row(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_blank)
}

/// A sheet ready for row normalization.
struct Prepared {
    columns: Columns,
    layout: Layout,
    rows: Vec<RawRow>,
}

/// Rules shared by every category, compiled from the tables above.
struct CategoryRules {
    profile: Profile,
    sections: SectionRules,
    conditions: ConditionRules,
    statuses: StatusRules,
}

impl CategoryRules {
    fn new(profile: Profile) -> Self {
        Self {
            profile,
            sections: SectionRules::new(SECTIONS, MarkerSet::new(MARKER_PREFIXES, MARKER_VALUES)),
            conditions: ConditionRules::new(CONDITION_VALUES, CONDITION_CONTAINS),
            statuses: StatusRules::new(ASSIGNEE_STATUSES, CONDITION_STATUSES),
        }
    }

    /// Locate the header, resolve columns and build the canonical layout.
    ///
    /// `None` for a sheet without any data.
    fn prepare(&self, sheet: &RawSheet) -> Option<Prepared> {
        let header_index = header_row(&sheet.rows)?;
        let header = &sheet.rows[header_index];
        let columns = Columns::resolve(header);

        let removed: Vec<usize> = header
            .iter()
            .enumerate()
            .filter(|(_, cell)| REMOVED_COLUMNS.contains(&squash(&cell.as_text()).as_str()))
            .map(|(i, _)| i)
            .collect();

        let renames: HashMap<String, String> = header
            .iter()
            .filter_map(|cell| {
                let source = cell.as_text().trim().to_string();
                let key = squash(&source);
                RENAMES
                    .iter()
                    .find(|(from, _)| *from == key)
                    .map(|(_, to)| (source, to.to_string()))
            })
            .collect();

        let layout = Layout::new(header, &renames, &removed, &[STATUS_COLUMN.to_string()]);
        let rows = sheet.rows[header_index + 1..]
            .iter()
            .filter(|row| !is_blank_row(row))
            .cloned()
            .collect();

        Some(Prepared {
            columns,
            layout,
            rows,
        })
    }

    /// Section fold, condition codes, tag expansion, status and projection.
    fn canonical_rows(&self, sheet: &str, prepared: Prepared) -> NormalizeResult<Vec<CanonicalRow>> {
        let Prepared {
            columns,
            layout,
            rows,
        } = prepared;

        let rows = match (self.profile.sections, columns.area) {
            (true, Some(area)) => {
                let scan = SectionColumns {
                    area,
                    assignee: columns.assignee,
                };
                section::propagate(rows, &self.sections, scan)
                    .into_iter()
                    .filter(|row| !section::is_section_row(row, &self.sections, area))
                    .collect()
            }
            _ => rows,
        };

        let status_columns = StatusColumns {
            assignee: columns.assignee,
            condition: columns.condition,
        };

        let mut out = Vec::with_capacity(rows.len());
        for mut row in rows {
            if let Some(condition) = columns.condition {
                if let Some(cell) = row.get_mut(condition) {
                    *cell = self.conditions.normalize(cell);
                }
            }

            let expanded = match (self.profile.expand_tags, columns.tag) {
                (true, Some(tag)) => {
                    tags::expand(&row, tag).map_err(|e| NormalizeError::from_tag(sheet, e))?
                }
                _ => vec![row],
            };

            for row in expanded {
                let status = derive_status(&row, status_columns, &self.statuses);
                out.push(layout.project(&row, vec![Cell::Text(status)])?);
            }
        }

        Ok(out)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Asset registers with one tag per row (possibly range-encoded).
pub struct TaggedAssets {
    rules: CategoryRules,
    output: &'static str,
}

impl TaggedAssets {
    pub fn new(profile: Profile, output: &'static str) -> Self {
        Self {
            rules: CategoryRules::new(profile),
            output,
        }
    }
}

impl CategoryHandler for TaggedAssets {
    fn category(&self) -> &str {
        self.rules.profile.category
    }

    fn handle(&self, sheet: &RawSheet, out: &mut OutputWorkbook) -> NormalizeResult<()> {
        let Some(prepared) = self.rules.prepare(sheet) else {
            return Ok(());
        };
        if prepared.columns.tag.is_none() {
            return Err(NormalizeError::MissingColumn {
                sheet: sheet.name.clone(),
                column: "asset tag".to_string(),
            });
        }

        let header = prepared.layout.header.clone();
        let rows = self.rules.canonical_rows(&sheet.name, prepared)?;

        let target = out.sheet_with_header(self.output, &header)?;
        for row in rows {
            target.push(row)?;
        }
        Ok(())
    }
}

/// Accessory logs, grouped into sheets by item description.
pub struct Accessories {
    rules: CategoryRules,
    /// Output sheets owned by other categories.
    reserved: Vec<&'static str>,
}

impl Accessories {
    pub fn new(profile: Profile, reserved: &[&'static str]) -> Self {
        Self {
            rules: CategoryRules::new(profile),
            reserved: reserved.to_vec(),
        }
    }
}

impl CategoryHandler for Accessories {
    fn category(&self) -> &str {
        self.rules.profile.category
    }

    fn handle(&self, sheet: &RawSheet, out: &mut OutputWorkbook) -> NormalizeResult<()> {
        let Some(prepared) = self.rules.prepare(sheet) else {
            return Ok(());
        };
        let description = prepared
            .columns
            .description
            .and_then(|i| prepared.layout.position_of(i))
            .ok_or_else(|| NormalizeError::MissingColumn {
                sheet: sheet.name.clone(),
                column: "description".to_string(),
            })?;

        let header = prepared.layout.header.clone();
        let rows = self.rules.canonical_rows(&sheet.name, prepared)?;

        // Clusters from earlier accessory sheets are candidates too.
        for row in rows {
            grouper::assign(row, out, description, &header, &self.reserved)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> RawRow {
        cells.iter().map(|c| Cell::from(*c)).collect()
    }

    fn text(rows: &[CanonicalRow], column: usize) -> Vec<String> {
        rows.iter().map(|r| r[column].as_text()).collect()
    }

    fn computers_sheet() -> RawSheet {
        RawSheet::new(
            "Computers",
            vec![
                row(&["", "", "", "", "", "", ""]),
                row(&["No", "Asset Tag", "Make", "Area", "Assigned To", "Condition", "Checked"]),
                row(&["", "", "", "Finance", "", "", ""]),
                row(&["1", "AND/UT/010-11", "Dell", "", "Shared", "Good", "yes"]),
                row(&["2", "AND/UT/T015", "HP", "", "J. Moyo", "not working", ""]),
                row(&["", "", "", "Reception", "", "", ""]),
                row(&["3", "AND/UT/020", "Lenovo", "", "spare", "n/a", ""]),
            ],
        )
    }

    #[test]
    fn test_tagged_assets_end_to_end() {
        let handler = TaggedAssets::new(COMPUTERS, "Computers");
        let mut out = OutputWorkbook::new();
        handler.handle(&computers_sheet(), &mut out).unwrap();

        let sheet = out.get("Computers").unwrap();
        assert_eq!(
            sheet.header,
            vec!["asset_tag", "manufacturer", "location", "assigned_to", "condition", "status"]
        );
        assert_eq!(
            text(&sheet.rows, 0),
            vec!["AND/UT/010", "AND/UT/011", "AND/UT/T015", "AND/UT/020"]
        );
        assert_eq!(
            text(&sheet.rows, 2),
            vec!["Finance", "Finance", "Finance", "Reception"]
        );
        assert_eq!(text(&sheet.rows, 3)[0], "Finance");
        assert_eq!(text(&sheet.rows, 4), vec!["G", "G", "B", ""]);
        assert_eq!(
            text(&sheet.rows, 5),
            vec!["Assigned", "Assigned", "Broken", "Available"]
        );
        assert!(sheet.rows.iter().all(|r| r.len() == sheet.header.len()));
    }

    #[test]
    fn test_tagged_assets_require_tag_column() {
        let handler = TaggedAssets::new(MONITORS, "Monitors");
        let sheet = RawSheet::new("Monitors", vec![row(&["Make", "Model"]), row(&["Dell", "P2419"])]);
        let err = handler.handle(&sheet, &mut OutputWorkbook::new()).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingColumn { .. }));
    }

    #[test]
    fn test_printers_do_not_track_sections() {
        let handler = TaggedAssets::new(PRINTERS, "Printers");
        let sheet = RawSheet::new(
            "Printers",
            vec![
                row(&["Tag", "Location", "User"]),
                row(&["", "Finance", ""]),
                row(&["HQ/PR/1", "", "shared"]),
            ],
        );
        let mut out = OutputWorkbook::new();
        handler.handle(&sheet, &mut out).unwrap();

        // Without section tracking the section row is kept as an ordinary row.
        let rows = &out.get("Printers").unwrap().rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][2], Cell::text("shared"));
    }

    #[test]
    fn test_empty_sheet_produces_nothing() {
        let handler = TaggedAssets::new(COMPUTERS, "Computers");
        let mut out = OutputWorkbook::new();
        handler
            .handle(&RawSheet::new("Computers", vec![row(&["", ""])]), &mut out)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_accessories_group_by_description() {
        let handler = Accessories::new(ACCESSORIES, &[]);
        let sheet = RawSheet::new(
            "Accessory Log",
            vec![
                row(&["Item", "Qty", "Area", "Issued To", "Notes"]),
                row(&["", "", "Boardroom", "", ""]),
                row(&["HDMI Cable 2m", "4", "", "", "box"]),
                row(&["HDMI Cable/3m", "2", "", "", ""]),
                row(&["USB Mouse", "10", "", "T. Banda", ""]),
                row(&["", "1", "", "", "unlabelled"]),
            ],
        );
        let mut out = OutputWorkbook::new();
        handler.handle(&sheet, &mut out).unwrap();

        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["HDMI Cable 2m", "USB Mouse"]);
        let cables = out.get("HDMI Cable 2m").unwrap();
        assert_eq!(
            cables.header,
            vec!["description", "quantity", "location", "assigned_to", "status"]
        );
        assert_eq!(cables.rows.len(), 2);
        assert_eq!(cables.rows[1][2], Cell::text("Boardroom"));
        assert_eq!(cables.rows[0][4], Cell::text("Available"));
        assert_eq!(out.get("USB Mouse").unwrap().rows[0][4], Cell::text("Assigned"));
    }

    #[test]
    fn test_two_sheets_extend_the_same_output() {
        let registry = builtin_registry();
        let mut out = OutputWorkbook::new();
        let desktops = RawSheet::new("Desktops", vec![row(&["Tag"]), row(&["HQ/1-2"])]);
        let computers = RawSheet::new("Computers", vec![row(&["Tag"]), row(&["HQ/9"])]);

        for sheet in [&desktops, &computers] {
            registry.lookup(&sheet.name).unwrap().handle(sheet, &mut out).unwrap();
        }
        assert_eq!(out.len(), 1);
        assert_eq!(text(&out.get("Computers").unwrap().rows, 0), vec!["HQ/1", "HQ/2", "HQ/9"]);
    }

    #[test]
    fn test_accessory_sheets_share_clusters() {
        let registry = builtin_registry();
        let mut out = OutputWorkbook::new();
        let first = RawSheet::new("Accessories", vec![row(&["Item", "Qty"]), row(&["HDMI Cable 2m", "1"])]);
        let second = RawSheet::new("Accessory Log", vec![row(&["Item", "Qty"]), row(&["HDMI Cable 3m", "2"])]);

        for sheet in [&first, &second] {
            registry.lookup(&sheet.name).unwrap().handle(sheet, &mut out).unwrap();
        }
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["HDMI Cable 2m"]);
        assert_eq!(out.get("HDMI Cable 2m").unwrap().rows.len(), 2);
    }

    #[test]
    fn test_accessory_named_like_a_category() {
        let registry = builtin_registry();
        let accessories = RawSheet::new("Accessories", vec![row(&["Item", "Qty"]), row(&["Printers", "2"])]);
        let printers = RawSheet::new("Printers", vec![row(&["Tag", "Make"]), row(&["HQ/PR/1", "HP"])]);

        // Either order: the category keeps its own sheet.
        for sheets in [[&printers, &accessories], [&accessories, &printers]] {
            let mut out = OutputWorkbook::new();
            for sheet in sheets {
                registry.lookup(&sheet.name).unwrap().handle(sheet, &mut out).unwrap();
            }
            assert_eq!(out.get("Printers").unwrap().header, vec!["asset_tag", "manufacturer", "status"]);
            assert_eq!(out.get("Printers (2)").unwrap().rows[0][0], Cell::text("Printers"));
        }
    }

    #[test]
    fn test_oversized_range_names_the_sheet() {
        let handler = TaggedAssets::new(LAPTOPS, "Laptops");
        let sheet = RawSheet::new("Notebooks", vec![row(&["Tag"]), row(&["HQ/1-99999999999"])]);
        let err = handler.handle(&sheet, &mut OutputWorkbook::new()).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::RangeTooLarge { ref sheet, .. } if sheet == "Notebooks"
        ));
    }
}

//! `.xlsx` decoding into a [`RawWorkbook`].
//!
//! Turns the uploaded container into sheets of [`Cell`] rows. No category
//! logic here. Column indices match the sheet as a user sees it: the leading
//! rows and columns the container leaves out are padded back with blanks.

use calamine::{Data, Range, Reader, Xlsx};
use std::io::Cursor;
use std::path::Path;

use crate::error::{DecodeError, DecodeResult};
use crate::models::{Cell, RawRow, RawSheet, RawWorkbook};

/// Every `.xlsx` file is a zip archive.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Decode an `.xlsx` payload held in memory.
pub fn decode_xlsx_bytes(bytes: &[u8]) -> DecodeResult<RawWorkbook> {
    if !bytes.starts_with(ZIP_MAGIC) {
        return Err(DecodeError::UnsupportedFormat(
            "expected an .xlsx workbook".to_string(),
        ));
    }

    let mut xlsx: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let mut workbook = RawWorkbook::new();

    for name in xlsx.sheet_names() {
        let range = xlsx.worksheet_range(&name)?;
        workbook.insert(RawSheet::new(name, absolute_rows(&range)));
    }

    if workbook.sheets().iter().all(RawSheet::is_empty) {
        return Err(DecodeError::EmptyWorkbook);
    }
    Ok(workbook)
}

/// Decode an `.xlsx` file from disk.
pub fn decode_xlsx_file(path: &Path) -> DecodeResult<RawWorkbook> {
    let bytes = std::fs::read(path)?;
    decode_xlsx_bytes(&bytes)
}

/// Rows of `range` re-anchored at A1.
fn absolute_rows(range: &Range<Data>) -> Vec<RawRow> {
    let Some((top, left)) = range.start() else {
        return Vec::new();
    };
    let left = left as usize;

    let mut rows: Vec<RawRow> = (0..top).map(|_| Vec::new()).collect();
    rows.extend(range.rows().map(|cells| {
        let mut row = vec![Cell::Empty; left];
        row.extend(cells.iter().map(to_cell));
        row
    }));
    rows
}

/// Convert a decoded cell.
pub fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn fixture() -> Vec<u8> {
        let mut workbook = Workbook::new();

        let sheet = workbook.add_worksheet();
        sheet.set_name("Computers").unwrap();
        // Header starts at B3, leaving two blank rows and one blank column.
        sheet.write_string(2, 1, "Asset Tag").unwrap();
        sheet.write_string(2, 2, "Qty").unwrap();
        sheet.write_string(3, 1, "HQ/1-2").unwrap();
        sheet.write_number(3, 2, 4.0).unwrap();
        sheet.write_boolean(4, 1, true).unwrap();

        workbook.add_worksheet().set_name("Blank").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_decode_keeps_absolute_positions() {
        let raw = decode_xlsx_bytes(&fixture()).unwrap();
        assert_eq!(raw.sheet_names(), vec!["Computers", "Blank"]);

        let sheet = raw.get("Computers").unwrap();
        assert_eq!(sheet.rows.len(), 5);
        assert!(sheet.rows[0].is_empty());
        assert_eq!(sheet.rows[2][0], Cell::Empty);
        assert_eq!(sheet.rows[2][1], Cell::text("Asset Tag"));
        assert_eq!(sheet.rows[3][2], Cell::Number(4.0));
        assert_eq!(sheet.rows[4][1], Cell::text("TRUE"));
        assert!(raw.get("Blank").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_xlsx_payload() {
        let err = decode_xlsx_bytes(b"asset tag,area\nHQ/1,Finance\n").unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_rejects_workbook_without_data() {
        let mut workbook = Workbook::new();
        workbook.add_worksheet();
        let bytes = workbook.save_to_buffer().unwrap();
        assert!(matches!(decode_xlsx_bytes(&bytes), Err(DecodeError::EmptyWorkbook)));
    }

    #[test]
    fn test_decode_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("register.xlsx");
        std::fs::write(&path, fixture()).unwrap();
        assert_eq!(decode_xlsx_file(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_error_cells_are_blank() {
        assert_eq!(to_cell(&Data::Error(calamine::CellErrorType::NA)), Cell::Empty);
        assert_eq!(to_cell(&Data::Int(7)), Cell::Number(7.0));
    }
}

// Excel / OpenDocument workbook import (xlsx, xlsm, xls, xlsb, ods)

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use chrono::{Days, NaiveDate};

use crate::error::IoError;
use crate::table::{Cell, Table};

/// Largest serial Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Parse workbook bytes. Reads `sheet` when given, otherwise the first sheet.
///
/// The first row with any non-empty cell is the header; fully blank rows are skipped.
pub fn parse_bytes(bytes: Vec<u8>, sheet: Option<&str>) -> Result<Table, IoError> {
    let mut workbook: Sheets<_> = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| IoError::Workbook(format!("failed to open workbook: {e}")))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) => {
            if !sheet_names.iter().any(|s| s == name) {
                return Err(IoError::NoSheet {
                    name: name.to_string(),
                    available: sheet_names.join(", "),
                });
            }
            name.to_string()
        }
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| IoError::Workbook("workbook contains no sheets".into()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IoError::Workbook(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for row in range.rows() {
        let cells: Vec<Cell> = row.iter().map(convert_cell).collect();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }

        if headers.is_none() {
            headers = Some(cells.iter().map(|c| c.display_value().trim().to_string()).collect());
            continue;
        }
        rows.push(cells);
    }

    log::debug!("sheet '{}': {} data rows", sheet_name, rows.len());

    Ok(Table::new(headers.unwrap_or_default(), rows))
}

fn convert_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.to_string())
            }
        }
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => {
            // 1900 date system assumed; calamine does not expose the 1904 flag here
            let serial = dt.as_f64();
            match serial_to_date(serial) {
                Some(date) => Cell::Date(date),
                None => Cell::Number(serial),
            }
        }
        Data::DateTimeIso(s) => s
            .get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Convert an Excel serial (1900 date system) to a calendar date.
///
/// The fractional time part is dropped. Serials below 1 are time-only values
/// and have no date.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    // Base 1899-12-30 absorbs Excel's phantom 1900-02-29
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_days(Days::new(serial.floor() as u64))
}

//! Record normalization: raw table → validated invoice records.
//!
//! Order matters: the schema check runs on the header first, then the trailer
//! row is dropped, and only then any per-row parsing. Rows with an unparsable invoice date are dropped
//! and counted; a malformed amount aborts the whole load.

use std::str::FromStr;

use ar_aging_io::{Cell, Table};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::config::ColumnMapping;
use crate::error::AgingError;
use crate::model::{DroppedRow, InvoiceRecord, Normalized};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
];

struct ColumnIndex {
    invoice_date: usize,
    amount_local: usize,
    currency_code: usize,
    amount_foreign: usize,
    customer_name: usize,
    memo: usize,
}

/// Normalize a raw ledger table.
pub fn normalize(table: &Table, columns: &ColumnMapping) -> Result<Normalized, AgingError> {
    let idx = resolve_columns(table, columns)?;

    // Final row is the ledger's total line
    let data_rows = table.rows.len().saturating_sub(1);

    let mut records = Vec::with_capacity(data_rows);
    let mut dropped = Vec::new();

    for row in 0..data_rows {
        let source_row = row + 1;

        let date_cell = table.cell(row, idx.invoice_date);
        let Some(invoice_date) = parse_date(date_cell) else {
            dropped.push(DroppedRow {
                source_row,
                value: date_cell.display_value(),
            });
            continue;
        };

        let amount_local = parse_amount(
            table.cell(row, idx.amount_local),
            &columns.amount_local,
            source_row,
        )?;
        let amount_foreign = parse_amount(
            table.cell(row, idx.amount_foreign),
            &columns.amount_foreign,
            source_row,
        )?;

        records.push(InvoiceRecord {
            invoice_date,
            amount_local,
            currency_code: text(table.cell(row, idx.currency_code)).to_uppercase(),
            amount_foreign,
            customer_name: text(table.cell(row, idx.customer_name)),
            memo: text(table.cell(row, idx.memo)),
            source_row,
        });
    }

    if !dropped.is_empty() {
        log::warn!(
            "dropped {} row(s) with invalid '{}' values",
            dropped.len(),
            columns.invoice_date
        );
    }

    if records.is_empty() {
        return Err(AgingError::EmptyDataset {
            dropped: dropped.len(),
        });
    }

    log::debug!("normalized {} record(s)", records.len());

    Ok(Normalized { records, dropped })
}

/// Fail with every missing column, not just the first.
fn resolve_columns(table: &Table, columns: &ColumnMapping) -> Result<ColumnIndex, AgingError> {
    let missing: Vec<String> = columns
        .required()
        .iter()
        .filter(|name| table.column_index(name).is_none())
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(AgingError::Schema { missing });
    }

    let idx = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| AgingError::Schema { missing: vec![name.to_string()] })
    };

    Ok(ColumnIndex {
        invoice_date: idx(&columns.invoice_date)?,
        amount_local: idx(&columns.amount_local)?,
        currency_code: idx(&columns.currency_code)?,
        amount_foreign: idx(&columns.amount_foreign)?,
        customer_name: idx(&columns.customer_name)?,
        memo: idx(&columns.memo)?,
    })
}

/// Coerce a cell to a calendar date, or `None` when it cannot be read as one.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Empty => None,
        Cell::Date(d) => Some(*d),
        Cell::Number(n) => ar_aging_io::xlsx::serial_to_date(*n),
        Cell::Text(s) => parse_date_text(s.trim()),
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Amount cell → decimal. Empty is zero; thousands separators are accepted.
fn parse_amount(cell: &Cell, column: &str, source_row: usize) -> Result<Decimal, AgingError> {
    let bad = |value: String| {
        AgingError::Computation(format!(
            "row {source_row}: column '{column}' is not numeric: '{value}'"
        ))
    };

    match cell {
        Cell::Empty => Ok(Decimal::ZERO),
        Cell::Number(n) => {
            if !n.is_finite() {
                return Err(bad(n.to_string()));
            }
            // shortest round-trip text keeps 0.1 as 0.1
            Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&format!("{n:e}")))
                .map_err(|_| bad(n.to_string()))
        }
        Cell::Date(d) => Err(bad(d.to_string())),
        Cell::Text(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            if cleaned.is_empty() || cleaned == "-" {
                return Ok(Decimal::ZERO);
            }
            Decimal::from_str(&cleaned)
                .or_else(|_| Decimal::from_scientific(&cleaned))
                .map_err(|_| bad(s.clone()))
        }
    }
}

fn text(cell: &Cell) -> String {
    cell.display_value().trim().to_string()
}

//! Cutoff date derivation and calendar arithmetic.

use chrono::{Datelike, Months, NaiveDate};

use crate::model::{InvoiceRecord, ReportingContext};

impl ReportingContext {
    /// Cutoff is the last day of the month containing the latest invoice.
    /// `None` for an empty slice.
    pub fn from_records(records: &[InvoiceRecord]) -> Option<Self> {
        let latest = records.iter().map(|r| r.invoice_date).max()?;
        Some(Self {
            cutoff_date: last_day_of_month(latest),
            latest_invoice_date: latest,
            overridden: false,
        })
    }

    /// Like [`from_records`](Self::from_records), but an explicit `as_of`
    /// replaces the derived cutoff.
    pub fn with_as_of(records: &[InvoiceRecord], as_of: Option<NaiveDate>) -> Option<Self> {
        let mut ctx = Self::from_records(records)?;
        if let Some(date) = as_of {
            ctx.cutoff_date = date;
            ctx.overridden = true;
        }
        Some(ctx)
    }

    /// Inclusive upper bound of the overdue window.
    pub fn overdue_threshold(&self, months: u32) -> NaiveDate {
        months_before(self.cutoff_date, months)
    }
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

fn is_month_end(date: NaiveDate) -> bool {
    last_day_of_month(date) == date
}

/// Step back whole calendar months.
///
/// A month-end date maps to the month-end of the target month, so
/// 2024-09-30 minus 6 months is 2024-03-31. Other days clamp to the target
/// month's length (2024-08-31 → 2024-02-29 is already the month-end case).
pub fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    let Some(shifted) = date.checked_sub_months(Months::new(months)) else {
        return NaiveDate::MIN;
    };
    if is_month_end(date) {
        last_day_of_month(shifted)
    } else {
        shifted
    }
}

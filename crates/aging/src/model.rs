use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AgingError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One normalized ledger row. Every record has a valid invoice date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRecord {
    pub invoice_date: NaiveDate,
    pub amount_local: Decimal,
    pub currency_code: String,
    pub amount_foreign: Decimal,
    pub customer_name: String,
    pub memo: String,
    /// 1-based data row in the source table.
    pub source_row: usize,
}

/// A row excluded because its invoice date did not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRow {
    pub source_row: usize,
    pub value: String,
}

/// Normalizer output: immutable records plus what was dropped.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub records: Vec<InvoiceRecord>,
    pub dropped: Vec<DroppedRow>,
}

impl Normalized {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

// ---------------------------------------------------------------------------
// Aging
// ---------------------------------------------------------------------------

/// Single as-of date every age computation in one report refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportingContext {
    pub cutoff_date: NaiveDate,
    pub latest_invoice_date: NaiveDate,
    /// Cutoff was given explicitly instead of derived.
    pub overridden: bool,
}

/// Age buckets in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeBucket {
    #[serde(rename = "<1mo")]
    UnderOneMonth,
    #[serde(rename = "1-3mo")]
    OneToThreeMonths,
    #[serde(rename = "3-6mo")]
    ThreeToSixMonths,
    #[serde(rename = "6-12mo")]
    SixToTwelveMonths,
    #[serde(rename = ">1yr")]
    OverOneYear,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 5] = [
        AgeBucket::UnderOneMonth,
        AgeBucket::OneToThreeMonths,
        AgeBucket::ThreeToSixMonths,
        AgeBucket::SixToTwelveMonths,
        AgeBucket::OverOneYear,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::UnderOneMonth => "<1mo",
            Self::OneToThreeMonths => "1-3mo",
            Self::ThreeToSixMonths => "3-6mo",
            Self::SixToTwelveMonths => "6-12mo",
            Self::OverOneYear => ">1yr",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.label() == label.trim())
    }
}

impl std::fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Dimension an aggregate is grouped by, and a drill-down selects on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    Bucket,
    Currency,
    Customer,
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bucket => write!(f, "bucket"),
            Self::Currency => write!(f, "currency"),
            Self::Customer => write!(f, "customer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    /// Grouping identity (what a drill-down selects on).
    pub key: String,
    /// Display text; differs from `key` only when a customer alias applies.
    pub label: String,
    pub amount_local: Decimal,
    pub amount_foreign: Decimal,
    pub record_count: usize,
    /// Percentage of the aggregate total, one decimal place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_pct: Option<Decimal>,
    /// Synthetic rollup of the rows past the Top-N cut.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_other: bool,
}

impl AggregateRow {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            amount_local: Decimal::ZERO,
            amount_foreign: Decimal::ZERO,
            record_count: 0,
            share_pct: None,
            is_other: false,
        }
    }

    pub(crate) fn add(&mut self, record: &InvoiceRecord) -> Result<(), AgingError> {
        self.absorb(record.amount_local, record.amount_foreign, 1)
    }

    /// Fold amounts into this row, failing instead of overflowing.
    pub(crate) fn absorb(
        &mut self,
        local: Decimal,
        foreign: Decimal,
        count: usize,
    ) -> Result<(), AgingError> {
        self.amount_local = checked_add(self.amount_local, local, &self.key)?;
        self.amount_foreign = checked_add(self.amount_foreign, foreign, &self.key)?;
        self.record_count += count;
        Ok(())
    }
}

/// Group key → summed amounts, in a deterministic order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub selector: Selector,
    pub rows: Vec<AggregateRow>,
}

impl Aggregate {
    pub fn total_local(&self) -> Result<Decimal, AgingError> {
        checked_sum(self.rows.iter().map(|r| r.amount_local), "aggregate total")
    }

    pub fn get(&self, key: &str) -> Option<&AggregateRow> {
        self.rows.iter().find(|r| r.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.key.as_str())
    }
}

fn checked_add(acc: Decimal, value: Decimal, context: &str) -> Result<Decimal, AgingError> {
    acc.checked_add(value)
        .ok_or_else(|| AgingError::Computation(format!("amount overflow summing '{context}'")))
}

/// Sum of `values`, or a computation error when the total leaves the decimal range.
pub fn checked_sum(
    values: impl IntoIterator<Item = Decimal>,
    context: &str,
) -> Result<Decimal, AgingError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| checked_add(acc, v, context))
}

// ---------------------------------------------------------------------------
// Drill-down
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Detail,
    Subtotal,
}

/// A detail line, or the synthetic subtotal closing a detail table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub kind: RowKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_bucket: Option<AgeBucket>,
    pub customer_name: String,
    pub currency_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_foreign: Option<Decimal>,
    pub amount_local: Decimal,
    pub memo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_row: Option<usize>,
}

/// Matching detail rows sorted by descending local amount, then one subtotal row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailTable {
    pub selector: Selector,
    pub key: String,
    pub rows: Vec<DetailRow>,
}

impl DetailTable {
    pub fn details(&self) -> &[DetailRow] {
        match self.rows.split_last() {
            Some((_, details)) => details,
            None => &[],
        }
    }

    pub fn subtotal(&self) -> Option<&DetailRow> {
        self.rows.last().filter(|r| r.kind == RowKind::Subtotal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Drilldown {
    /// Nothing matched; the caller shows an empty state.
    Empty { selector: Selector, key: String },
    Rows(DetailTable),
}

impl Drilldown {
    pub fn is_empty(&self) -> bool {
        matches!(self, Drilldown::Empty { .. })
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub engine_version: String,
    pub generated_at: String,
    pub source: String,
    pub fingerprint: String,
    pub context: ReportingContext,
    pub record_count: usize,
    pub dropped_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped_rows: Vec<DroppedRow>,
}

/// Scalar total, raw and scaled to the display unit.
#[derive(Debug, Clone, Serialize)]
pub struct TotalSummary {
    pub amount_local: Decimal,
    pub unit: Decimal,
    pub unit_label: String,
    /// `amount_local / unit`, rounded to a whole number.
    pub amount_in_unit: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverdueSummary {
    pub months: u32,
    /// Records dated on or before this date are overdue.
    pub threshold_date: NaiveDate,
    pub record_count: usize,
    pub amount_local: Decimal,
    /// Every overdue customer, descending.
    pub customers: Aggregate,
    /// Top-N customers plus the "Other" rollup.
    pub top_customers: Aggregate,
}

/// Everything the presentation layer renders for one dataset.
#[derive(Debug, Clone, Serialize)]
pub struct AgingReport {
    pub meta: ReportMeta,
    pub total: TotalSummary,
    pub by_currency: Aggregate,
    pub by_bucket: Aggregate,
    pub overdue: OverdueSummary,
}

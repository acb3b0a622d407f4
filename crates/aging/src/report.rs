use chrono::NaiveDate;
use rust_decimal::RoundingStrategy;

use crate::aggregate::{
    apply_display_labels, overdue_beyond, sum_by_age_bucket, sum_by_currency, sum_by_customer,
    top_n_with_other, total_local, with_shares,
};
use crate::config::AgingConfig;
use crate::error::AgingError;
use crate::model::{
    AgingReport, Normalized, OverdueSummary, ReportMeta, ReportingContext, TotalSummary,
};

/// Identity of the dataset a report was built from.
#[derive(Debug, Clone, Copy)]
pub struct SourceInfo<'a> {
    pub name: &'a str,
    pub fingerprint: &'a str,
}

/// Build every view of one dataset against a single reporting context.
pub fn build_report(
    normalized: &Normalized,
    config: &AgingConfig,
    source: SourceInfo<'_>,
    as_of: Option<NaiveDate>,
) -> Result<AgingReport, AgingError> {
    let records = &normalized.records;
    let ctx = ReportingContext::with_as_of(records, as_of).ok_or(AgingError::EmptyDataset {
        dropped: normalized.dropped_count(),
    })?;

    // Total
    let amount_local = total_local(records)?;
    let amount_in_unit = amount_local
        .checked_div(config.report.unit)
        .ok_or_else(|| {
            AgingError::Computation(format!(
                "cannot scale total {amount_local} by unit {}",
                config.report.unit
            ))
        })?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);

    let by_currency = with_shares(sum_by_currency(records)?)?;
    let by_bucket = sum_by_age_bucket(records, ctx.cutoff_date)?;

    // Overdue
    let months = config.report.overdue_months;
    let overdue = overdue_beyond(records, ctx.cutoff_date, months);
    let mut customers = sum_by_customer(overdue.iter().copied(), &config.aliases)?;
    let mut top_customers =
        top_n_with_other(&customers, config.report.top_n, &config.report.other_label)?;
    apply_display_labels(&mut customers, &config.aliases);
    apply_display_labels(&mut top_customers, &config.aliases);

    log::debug!(
        "report: cutoff {}, {} record(s), {} overdue",
        ctx.cutoff_date,
        records.len(),
        overdue.len()
    );

    Ok(AgingReport {
        meta: ReportMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            source: source.name.to_string(),
            fingerprint: source.fingerprint.to_string(),
            context: ctx,
            record_count: records.len(),
            dropped_count: normalized.dropped_count(),
            dropped_rows: normalized.dropped.clone(),
        },
        total: TotalSummary {
            amount_local,
            unit: config.report.unit,
            unit_label: config.report.unit_label.clone(),
            amount_in_unit,
        },
        by_currency,
        by_bucket,
        overdue: OverdueSummary {
            months,
            threshold_date: ctx.overdue_threshold(months),
            record_count: overdue.len(),
            amount_local: total_local(overdue.iter().copied())?,
            customers,
            top_customers,
        },
    })
}

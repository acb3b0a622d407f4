//! Plain-text rendering of reports and detail tables.

use ar_aging::model::{Aggregate, AggregateRow, AgingReport, DetailTable, Drilldown, RowKind};

use crate::util::{display_width, format_amount, pad_left, pad_right};

/// Widest a text column may grow before it is truncated.
const MAX_TEXT_WIDTH: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Right,
}

/// Aligned table with a header rule. Cells are display-width aware.
pub(crate) fn table(headers: &[&str], align: &[Align], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(display_width(cell));
            }
        }
    }
    for (w, a) in widths.iter_mut().zip(align) {
        if *a == Align::Left {
            *w = (*w).min(MAX_TEXT_WIDTH);
        }
    }

    let mut out = String::new();
    out.push_str(&render_line(headers.iter().copied(), &widths, align));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    out.push('\n');
    for row in rows {
        out.push_str(&render_line(row.iter().map(String::as_str), &widths, align));
        out.push('\n');
    }
    out
}

fn render_line<'a>(
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
    align: &[Align],
) -> String {
    cells
        .zip(widths.iter().zip(align))
        .map(|(cell, (w, a))| match a {
            Align::Left => pad_right(cell, *w),
            Align::Right => pad_left(cell, *w),
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Name cell of an aggregate row: the label, with the drill key beside it
/// when they differ.
fn row_name(r: &AggregateRow) -> String {
    if r.is_other || r.label == r.key {
        r.key.clone()
    } else {
        format!("{} [{}]", r.label, r.key)
    }
}

fn aggregate_rows(aggregate: &Aggregate, with_share: bool) -> Vec<Vec<String>> {
    aggregate
        .rows
        .iter()
        .map(|r| {
            let mut row = vec![
                row_name(r),
                format_amount(r.amount_local),
                r.record_count.to_string(),
            ];
            if with_share {
                row.push(
                    r.share_pct
                        .map(|p| format!("{p}%"))
                        .unwrap_or_else(|| "-".to_string()),
                );
            }
            row
        })
        .collect()
}

pub(crate) fn report(report: &AgingReport) -> String {
    let meta = &report.meta;
    let ctx = &meta.context;
    let mut out = String::new();

    out.push_str(&format!("AR aging: {}\n", meta.source));
    if ctx.overridden {
        out.push_str(&format!(
            "cutoff:   {} (as of; latest invoice {})\n",
            ctx.cutoff_date, ctx.latest_invoice_date
        ));
    } else {
        out.push_str(&format!(
            "cutoff:   {} (latest invoice {})\n",
            ctx.cutoff_date, ctx.latest_invoice_date
        ));
    }
    out.push_str(&format!(
        "records:  {} ({} dropped)\n",
        meta.record_count, meta.dropped_count
    ));
    out.push_str(&format!(
        "total:    {} ({} {})\n",
        format_amount(report.total.amount_local),
        format_amount(report.total.amount_in_unit),
        report.total.unit_label
    ));

    out.push_str("\nBy currency\n");
    out.push_str(&table(
        &["currency", "amount", "records", "share"],
        &[Align::Left, Align::Right, Align::Right, Align::Right],
        &aggregate_rows(&report.by_currency, true),
    ));

    out.push_str("\nBy age\n");
    out.push_str(&table(
        &["bucket", "amount", "records"],
        &[Align::Left, Align::Right, Align::Right],
        &aggregate_rows(&report.by_bucket, false),
    ));

    let overdue = &report.overdue;
    out.push_str(&format!(
        "\nOverdue {}+ months (invoiced on or before {}): {} record(s), {}\n",
        overdue.months,
        overdue.threshold_date,
        overdue.record_count,
        format_amount(overdue.amount_local)
    ));
    if overdue.top_customers.rows.is_empty() {
        out.push_str("(none)\n");
    } else {
        out.push_str(&table(
            &["customer", "amount", "records"],
            &[Align::Left, Align::Right, Align::Right],
            &aggregate_rows(&overdue.top_customers, false),
        ));
    }

    out
}

fn detail_rows(t: &DetailTable) -> Vec<Vec<String>> {
    t.rows
        .iter()
        .map(|r| {
            let opt = |v: Option<String>| v.unwrap_or_default();
            vec![
                opt(r.source_row.map(|n| n.to_string())),
                opt(r.invoice_date.map(|d| d.to_string())),
                opt(r.age_bucket.map(|b| b.label().to_string())),
                r.customer_name.clone(),
                r.currency_code.clone(),
                opt(r.amount_foreign.map(format_amount)),
                format_amount(r.amount_local),
                r.memo.clone(),
            ]
        })
        .collect()
}

pub(crate) fn drilldown(drill: &Drilldown) -> String {
    match drill {
        Drilldown::Empty { selector, key } => {
            format!("{selector} '{key}': no matching records\n")
        }
        Drilldown::Rows(t) => {
            let count = t.rows.iter().filter(|r| r.kind == RowKind::Detail).count();
            let mut out = format!("{} '{}': {} record(s)\n", t.selector, t.key, count);
            out.push_str(&table(
                &["row", "date", "age", "customer", "currency", "foreign", "local", "memo"],
                &[
                    Align::Right,
                    Align::Left,
                    Align::Left,
                    Align::Left,
                    Align::Left,
                    Align::Right,
                    Align::Right,
                    Align::Left,
                ],
                &detail_rows(t),
            ));
            out
        }
    }
}

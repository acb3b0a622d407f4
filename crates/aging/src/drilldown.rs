//! Selection → detail table.

use crate::aggregate::customer_key;
use crate::classify::classify_age;
use crate::config::AliasConfig;
use crate::error::AgingError;
use crate::model::{
    checked_sum, AgeBucket, DetailRow, DetailTable, Drilldown, InvoiceRecord, ReportingContext,
    RowKind, Selector,
};

/// Customer column text of the closing subtotal row.
pub const SUBTOTAL_LABEL: &str = "Subtotal";

/// Detail rows whose `selector` dimension equals `key`.
///
/// Keys are the ones an aggregate produced: bucket labels, currency codes, or
/// customer keys under the configured alias mode. An unknown key yields
/// [`Drilldown::Empty`].
pub fn drill_down<'a>(
    records: impl IntoIterator<Item = &'a InvoiceRecord>,
    ctx: &ReportingContext,
    selector: Selector,
    key: &str,
    aliases: &AliasConfig,
) -> Result<Drilldown, AgingError> {
    let key = key.trim();
    match selector {
        Selector::Bucket => {
            let Some(bucket) = AgeBucket::from_label(key) else {
                return Ok(Drilldown::Empty {
                    selector,
                    key: key.to_string(),
                });
            };
            drill_down_matching(records, ctx, selector, key, |r| {
                classify_age(r.invoice_date, ctx.cutoff_date) == bucket
            })
        }
        Selector::Currency => {
            drill_down_matching(records, ctx, selector, key, |r| r.currency_code == key)
        }
        Selector::Customer => drill_down_matching(records, ctx, selector, key, |r| {
            customer_key(r, aliases) == key
        }),
    }
}

/// Detail table of every record accepted by `matches`, labelled with `key`.
pub fn drill_down_matching<'a, F>(
    records: impl IntoIterator<Item = &'a InvoiceRecord>,
    ctx: &ReportingContext,
    selector: Selector,
    key: &str,
    matches: F,
) -> Result<Drilldown, AgingError>
where
    F: Fn(&InvoiceRecord) -> bool,
{
    let mut selected: Vec<&InvoiceRecord> = records.into_iter().filter(|r| matches(*r)).collect();

    if selected.is_empty() {
        return Ok(Drilldown::Empty {
            selector,
            key: key.to_string(),
        });
    }

    selected.sort_by(|a, b| {
        b.amount_local
            .cmp(&a.amount_local)
            .then(a.source_row.cmp(&b.source_row))
    });

    let mut rows: Vec<DetailRow> = selected
        .iter()
        .map(|r| DetailRow {
            kind: RowKind::Detail,
            invoice_date: Some(r.invoice_date),
            age_bucket: Some(classify_age(r.invoice_date, ctx.cutoff_date)),
            customer_name: r.customer_name.clone(),
            currency_code: r.currency_code.clone(),
            amount_foreign: Some(r.amount_foreign),
            amount_local: r.amount_local,
            memo: r.memo.clone(),
            source_row: Some(r.source_row),
        })
        .collect();

    rows.push(subtotal(selector, key, &selected)?);

    log::debug!("drill {selector}={key}: {} row(s)", selected.len());

    Ok(Drilldown::Rows(DetailTable {
        selector,
        key: key.to_string(),
        rows,
    }))
}

fn subtotal(
    selector: Selector,
    key: &str,
    selected: &[&InvoiceRecord],
) -> Result<DetailRow, AgingError> {
    let amount_local = checked_sum(selected.iter().map(|r| r.amount_local), key)?;
    let amount_foreign = match selector {
        Selector::Currency => None,
        Selector::Bucket | Selector::Customer => {
            Some(checked_sum(selected.iter().map(|r| r.amount_foreign), key)?)
        }
    };
    let currency_code = match selector {
        Selector::Currency => key.to_string(),
        _ => String::new(),
    };

    Ok(DetailRow {
        kind: RowKind::Subtotal,
        invoice_date: None,
        age_bucket: None,
        customer_name: SUBTOTAL_LABEL.to_string(),
        currency_code,
        amount_foreign,
        amount_local,
        memo: String::new(),
        source_row: None,
    })
}

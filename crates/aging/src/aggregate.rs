//! Grouping, ranking and filtering over an immutable record slice.
//!
//! Every aggregate comes back in a deterministic order: buckets in canonical
//! order, everything else by descending local amount with first-seen order
//! breaking ties. Sums are checked; a total outside the decimal range is a
//! computation error.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::classify::classify_age;
use crate::config::{AliasConfig, AliasMode};
use crate::error::AgingError;
use crate::model::{checked_sum, AgeBucket, Aggregate, AggregateRow, InvoiceRecord, Selector};
use crate::reporting::months_before;

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

pub fn total_local<'a>(
    records: impl IntoIterator<Item = &'a InvoiceRecord>,
) -> Result<Decimal, AgingError> {
    checked_sum(records.into_iter().map(|r| r.amount_local), "total")
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Group rows by `key_of`, keeping first-seen order.
fn group_by<'a, I, F>(selector: Selector, records: I, key_of: F) -> Result<Aggregate, AgingError>
where
    I: IntoIterator<Item = &'a InvoiceRecord>,
    F: Fn(&'a InvoiceRecord) -> &'a str,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<AggregateRow> = Vec::new();

    for record in records {
        let key = key_of(record);
        let at = *index.entry(key).or_insert_with(|| {
            rows.push(AggregateRow::new(key));
            rows.len() - 1
        });
        rows[at].add(record)?;
    }

    Ok(Aggregate { selector, rows })
}

/// Stable: equal amounts keep their current relative order.
fn sort_descending(aggregate: &mut Aggregate) {
    aggregate
        .rows
        .sort_by(|a, b| b.amount_local.cmp(&a.amount_local));
}

/// Sum per currency code, largest first.
pub fn sum_by_currency<'a>(
    records: impl IntoIterator<Item = &'a InvoiceRecord>,
) -> Result<Aggregate, AgingError> {
    let mut aggregate = group_by(Selector::Currency, records, |r| r.currency_code.as_str())?;
    sort_descending(&mut aggregate);
    Ok(aggregate)
}

/// Sum per age bucket. Always five rows in canonical order; empty buckets are zero.
pub fn sum_by_age_bucket<'a>(
    records: impl IntoIterator<Item = &'a InvoiceRecord>,
    cutoff: NaiveDate,
) -> Result<Aggregate, AgingError> {
    let mut rows: Vec<AggregateRow> = AgeBucket::ALL
        .iter()
        .map(|b| AggregateRow::new(b.label()))
        .collect();

    for record in records {
        let bucket = classify_age(record.invoice_date, cutoff);
        // ALL is in discriminant order
        rows[bucket as usize].add(record)?;
    }

    Ok(Aggregate {
        selector: Selector::Bucket,
        rows,
    })
}

/// Grouping key of a record's customer under the configured alias mode.
pub fn customer_key<'a>(record: &'a InvoiceRecord, aliases: &'a AliasConfig) -> &'a str {
    match aliases.mode {
        AliasMode::Display => record.customer_name.as_str(),
        AliasMode::Merge => aliases.alias_for(&record.customer_name),
    }
}

/// Sum per customer, largest first. Filter the input iterator to restrict rows.
pub fn sum_by_customer<'a>(
    records: impl IntoIterator<Item = &'a InvoiceRecord>,
    aliases: &'a AliasConfig,
) -> Result<Aggregate, AgingError> {
    let mut aggregate = group_by(Selector::Customer, records, |r| customer_key(r, aliases))?;
    sort_descending(&mut aggregate);
    Ok(aggregate)
}

/// Distinct customer keys shown under `label` in display mode, first-seen order.
///
/// Empty in merge mode, where keys already are the labels.
pub fn keys_for_label<'a>(
    records: impl IntoIterator<Item = &'a InvoiceRecord>,
    aliases: &AliasConfig,
    label: &str,
) -> Vec<&'a str> {
    if aliases.mode != AliasMode::Display {
        return Vec::new();
    }
    let mut seen = HashSet::new();
    records
        .into_iter()
        .map(|r| r.customer_name.as_str())
        .filter(|name| *name != label && aliases.alias_for(name) == label)
        .filter(|name| seen.insert(*name))
        .collect()
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Keep the `n` largest rows and merge the remainder into one rollup row.
///
/// The rollup is labelled `other_label`. Its key is `other_label` too unless a
/// real row already uses that key, in which case a count suffix keeps the two
/// apart. No rollup row when the aggregate has `n` rows or fewer. The local
/// total is unchanged either way.
pub fn top_n_with_other(
    aggregate: &Aggregate,
    n: usize,
    other_label: &str,
) -> Result<Aggregate, AgingError> {
    let mut sorted = aggregate.clone();
    sort_descending(&mut sorted);

    if sorted.rows.len() <= n {
        return Ok(sorted);
    }

    let rest = sorted.rows.split_off(n);
    let mut other = AggregateRow::new(rollup_key(aggregate, other_label, rest.len()));
    other.label = other_label.to_string();
    other.is_other = true;
    for row in &rest {
        other.absorb(row.amount_local, row.amount_foreign, row.record_count)?;
    }
    sorted.rows.push(other);
    Ok(sorted)
}

fn rollup_key(aggregate: &Aggregate, other_label: &str, merged: usize) -> String {
    let mut key = other_label.to_string();
    if aggregate.get(&key).is_none() {
        return key;
    }
    key = format!("{other_label} ({merged} merged)");
    while aggregate.get(&key).is_some() {
        key.push('+');
    }
    key
}

/// Keys that [`top_n_with_other`] folds into its rollup row.
pub fn merged_keys(aggregate: &Aggregate, n: usize) -> Vec<String> {
    let mut sorted = aggregate.clone();
    sort_descending(&mut sorted);
    sorted.rows.into_iter().skip(n).map(|r| r.key).collect()
}

// ---------------------------------------------------------------------------
// Filtering + decoration
// ---------------------------------------------------------------------------

/// Records dated on or before `months` calendar months ahead of the cutoff.
pub fn overdue_beyond(
    records: &[InvoiceRecord],
    cutoff: NaiveDate,
    months: u32,
) -> Vec<&InvoiceRecord> {
    let threshold = months_before(cutoff, months);
    records
        .iter()
        .filter(|r| r.invoice_date <= threshold)
        .collect()
}

/// Fill `share_pct` with each row's percentage of the total, one decimal place.
/// Left empty when the total is zero.
pub fn with_shares(mut aggregate: Aggregate) -> Result<Aggregate, AgingError> {
    let total = aggregate.total_local()?;
    if total.is_zero() {
        return Ok(aggregate);
    }
    for row in &mut aggregate.rows {
        // share = amount / total * 100; dividing first keeps large amounts in range
        let ratio = row.amount_local.checked_div(total).ok_or_else(|| {
            AgingError::Computation(format!("cannot compute share of '{}'", row.key))
        })?;
        row.share_pct = ratio
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|pct| pct.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero));
    }
    Ok(aggregate)
}

/// Replace customer labels with their configured aliases.
///
/// Only meaningful in display mode; merged keys already are aliases.
pub fn apply_display_labels(aggregate: &mut Aggregate, aliases: &AliasConfig) {
    if aggregate.selector != Selector::Customer || aliases.mode != AliasMode::Display {
        return;
    }
    for row in aggregate.rows.iter_mut().filter(|r| !r.is_other) {
        row.label = aliases.alias_for(&row.key).to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn rec(date: &str, local: i64, currency: &str, customer: &str) -> InvoiceRecord {
        InvoiceRecord {
            invoice_date: d(date),
            amount_local: Decimal::from(local),
            currency_code: currency.into(),
            amount_foreign: Decimal::from(local / 1000),
            customer_name: customer.into(),
            memo: String::new(),
            source_row: 0,
        }
    }

    fn sample() -> Vec<InvoiceRecord> {
        vec![
            rec("2024-09-10", 100, "KRW", "Acme"),
            rec("2024-08-01", 500, "USD", "Globex"),
            rec("2024-03-31", 300, "KRW", "Acme"),
            rec("2024-04-01", 200, "EUR", "Initech"),
            rec("2023-01-15", 700, "USD", "Umbrella"),
        ]
    }

    fn aliases(mode: AliasMode, pairs: &[(&str, &str)]) -> AliasConfig {
        AliasConfig {
            mode,
            names: pairs
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn currency_sums_descending() {
        let agg = sum_by_currency(&sample()).unwrap();
        assert_eq!(agg.selector, Selector::Currency);
        assert_eq!(agg.keys().collect::<Vec<_>>(), vec!["USD", "KRW", "EUR"]);
        assert_eq!(agg.get("USD").unwrap().amount_local, Decimal::from(1200));
        assert_eq!(agg.get("USD").unwrap().record_count, 2);
        assert_eq!(agg.total_local().unwrap(), Decimal::from(1800));
    }

    #[test]
    fn equal_amounts_keep_first_seen_order() {
        let records = vec![
            rec("2024-01-01", 10, "JPY", "B"),
            rec("2024-01-01", 10, "CNY", "A"),
            rec("2024-01-01", 10, "GBP", "C"),
        ];
        let agg = sum_by_currency(&records).unwrap();
        assert_eq!(agg.keys().collect::<Vec<_>>(), vec!["JPY", "CNY", "GBP"]);
    }

    #[test]
    fn bucket_sums_zero_filled_in_order() {
        let agg = sum_by_age_bucket(&sample(), d("2024-09-30")).unwrap();
        assert_eq!(
            agg.keys().collect::<Vec<_>>(),
            vec!["<1mo", "1-3mo", "3-6mo", "6-12mo", ">1yr"]
        );
        // 2024-09-10: 20 days; 2024-08-01: 60; 2024-04-01: 182; 2024-03-31: 183
        assert_eq!(agg.rows[0].amount_local, Decimal::from(100));
        assert_eq!(agg.rows[1].amount_local, Decimal::from(500));
        assert_eq!(agg.rows[2].amount_local, Decimal::ZERO);
        assert_eq!(agg.rows[2].record_count, 0);
        assert_eq!(agg.rows[3].amount_local, Decimal::from(500));
        assert_eq!(agg.rows[4].amount_local, Decimal::from(700));
    }

    #[test]
    fn bucket_sums_of_nothing() {
        let agg = sum_by_age_bucket(&[], d("2024-09-30")).unwrap();
        assert_eq!(agg.rows.len(), 5);
        assert!(agg.total_local().unwrap().is_zero());
    }

    #[test]
    fn customer_sums_with_filter() {
        let records = sample();
        let cfg = AliasConfig::default();
        let agg = sum_by_customer(records.iter().filter(|r| r.currency_code == "KRW"), &cfg).unwrap();
        assert_eq!(agg.rows.len(), 1);
        assert_eq!(agg.rows[0].key, "Acme");
        assert_eq!(agg.rows[0].amount_local, Decimal::from(400));
    }

    #[test]
    fn merge_mode_groups_by_alias() {
        let records = vec![
            rec("2024-01-01", 100, "KRW", "Samsung Electronics Co., Ltd."),
            rec("2024-01-01", 250, "USD", "Samsung Electronics America, Inc."),
            rec("2024-01-01", 300, "KRW", "LG"),
        ];
        let cfg = aliases(
            AliasMode::Merge,
            &[
                ("Samsung Electronics Co., Ltd.", "Samsung"),
                ("Samsung Electronics America, Inc.", "Samsung"),
            ],
        );
        let agg = sum_by_customer(&records, &cfg).unwrap();
        assert_eq!(agg.keys().collect::<Vec<_>>(), vec!["Samsung", "LG"]);
        assert_eq!(agg.rows[0].amount_local, Decimal::from(350));
        assert_eq!(agg.rows[0].record_count, 2);
    }

    #[test]
    fn display_mode_aliases_labels_only() {
        let records = vec![
            rec("2024-01-01", 100, "KRW", "Samsung Electronics Co., Ltd."),
            rec("2024-01-01", 250, "USD", "Samsung Electronics America, Inc."),
        ];
        let cfg = aliases(
            AliasMode::Display,
            &[
                ("Samsung Electronics Co., Ltd.", "Samsung"),
                ("Samsung Electronics America, Inc.", "Samsung"),
            ],
        );
        let mut agg = sum_by_customer(&records, &cfg).unwrap();
        assert_eq!(agg.rows.len(), 2);
        apply_display_labels(&mut agg, &cfg);
        assert_eq!(agg.rows[0].key, "Samsung Electronics America, Inc.");
        assert_eq!(agg.rows[0].label, "Samsung");
        assert_eq!(agg.rows[1].label, "Samsung");
    }

    #[test]
    fn top_n_rolls_up_remainder() {
        let records: Vec<InvoiceRecord> = (1..=8)
            .map(|i| rec("2024-01-01", i * 100, "KRW", &format!("C{i}")))
            .collect();
        let agg = sum_by_customer(&records, &AliasConfig::default()).unwrap();
        let top = top_n_with_other(&agg, 5, "Other").unwrap();

        assert_eq!(top.rows.len(), 6);
        assert_eq!(
            top.keys().collect::<Vec<_>>(),
            vec!["C8", "C7", "C6", "C5", "C4", "Other"]
        );
        let other = top.rows.last().unwrap();
        assert!(other.is_other);
        assert_eq!(other.amount_local, Decimal::from(600));
        assert_eq!(other.record_count, 3);
        assert_eq!(top.total_local().unwrap(), agg.total_local().unwrap());
        assert_eq!(merged_keys(&agg, 5), vec!["C3", "C2", "C1"]);
    }

    #[test]
    fn top_n_without_remainder_has_no_other() {
        let agg = sum_by_currency(&sample()).unwrap();
        let top = top_n_with_other(&agg, 3, "Other").unwrap();
        assert_eq!(top.rows.len(), 3);
        assert!(top.rows.iter().all(|r| !r.is_other));
        assert!(merged_keys(&agg, 3).is_empty());
    }

    #[test]
    fn overdue_threshold_is_inclusive() {
        let records = sample();
        let overdue = overdue_beyond(&records, d("2024-09-30"), 6);
        let dates: Vec<NaiveDate> = overdue.iter().map(|r| r.invoice_date).collect();
        assert!(dates.contains(&d("2024-03-31")));
        assert!(!dates.contains(&d("2024-04-01")));
        assert!(dates.contains(&d("2023-01-15")));
        assert_eq!(overdue.len(), 2);
    }

    #[test]
    fn shares_one_decimal() {
        let records = vec![
            rec("2024-01-01", 1, "KRW", "A"),
            rec("2024-01-01", 2, "USD", "A"),
        ];
        let agg = with_shares(sum_by_currency(&records).unwrap()).unwrap();
        assert_eq!(agg.get("USD").unwrap().share_pct, Some(Decimal::new(667, 1)));
        assert_eq!(agg.get("KRW").unwrap().share_pct, Some(Decimal::new(333, 1)));
    }

    #[test]
    fn shares_of_zero_total_stay_empty() {
        let records = vec![rec("2024-01-01", 0, "KRW", "A")];
        let agg = with_shares(sum_by_currency(&records).unwrap()).unwrap();
        assert_eq!(agg.rows[0].share_pct, None);
    }

    #[test]
    fn total_of_records() {
        assert_eq!(total_local(&sample()).unwrap(), Decimal::from(1800));
    }

    fn huge(customer: &str, currency: &str) -> InvoiceRecord {
        InvoiceRecord {
            amount_local: Decimal::from_str_exact("60000000000000000000000000000").unwrap(),
            ..rec("2024-01-01", 0, currency, customer)
        }
    }

    #[test]
    fn overflowing_sums_are_computation_errors() {
        let records = vec![huge("A", "KRW"), huge("B", "KRW")];

        assert!(matches!(total_local(&records), Err(AgingError::Computation(_))));
        assert!(matches!(sum_by_currency(&records), Err(AgingError::Computation(_))));
        assert!(matches!(
            sum_by_age_bucket(&records, d("2024-09-30")),
            Err(AgingError::Computation(_))
        ));

        // each customer fits on its own; the rollup of both does not
        let agg = sum_by_customer(&records, &AliasConfig::default()).unwrap();
        assert!(matches!(agg.total_local(), Err(AgingError::Computation(_))));
        let mut three = records.clone();
        three.insert(0, huge("C", "USD"));
        let agg = sum_by_customer(&three, &AliasConfig::default()).unwrap();
        assert!(top_n_with_other(&agg, 1, "Other").is_err());
    }

    #[test]
    fn shares_of_amounts_near_the_decimal_limit() {
        let big = Decimal::from_str_exact("1000000000000000000000000000").unwrap();
        let records = vec![
            InvoiceRecord { amount_local: big, ..rec("2024-01-01", 0, "KRW", "A") },
            InvoiceRecord { amount_local: big, ..rec("2024-01-01", 0, "USD", "A") },
        ];
        let agg = with_shares(sum_by_currency(&records).unwrap()).unwrap();
        assert_eq!(agg.rows[0].share_pct, Some(Decimal::new(500, 1)));
        assert_eq!(agg.rows[1].share_pct, Some(Decimal::new(500, 1)));
    }

    #[test]
    fn label_resolves_to_display_keys() {
        let records = vec![
            rec("2024-01-01", 100, "KRW", "Samsung Electronics Co., Ltd."),
            rec("2024-01-01", 100, "KRW", "Samsung Electronics Co., Ltd."),
            rec("2024-01-01", 250, "USD", "Samsung Electronics America, Inc."),
            rec("2024-01-01", 300, "KRW", "LG Chem Ltd."),
        ];
        let cfg = aliases(
            AliasMode::Display,
            &[
                ("Samsung Electronics Co., Ltd.", "Samsung"),
                ("Samsung Electronics America, Inc.", "Samsung"),
                ("LG Chem Ltd.", "LG"),
            ],
        );
        assert_eq!(keys_for_label(&records, &cfg, "LG"), vec!["LG Chem Ltd."]);
        assert_eq!(
            keys_for_label(&records, &cfg, "Samsung"),
            vec!["Samsung Electronics Co., Ltd.", "Samsung Electronics America, Inc."]
        );
        assert!(keys_for_label(&records, &cfg, "LG Chem Ltd.").is_empty());

        let merge = AliasConfig { mode: AliasMode::Merge, ..cfg };
        assert!(keys_for_label(&records, &merge, "LG").is_empty());
    }

    #[test]
    fn rollup_key_avoids_real_customer_named_other() {
        let records = vec![
            rec("2024-01-01", 900, "KRW", "Acme"),
            rec("2024-01-01", 800, "KRW", "Other"),
            rec("2024-01-01", 100, "KRW", "Globex"),
            rec("2024-01-01", 50, "KRW", "Initech"),
        ];
        let agg = sum_by_customer(&records, &AliasConfig::default()).unwrap();
        let top = top_n_with_other(&agg, 2, "Other").unwrap();

        assert_eq!(
            top.keys().collect::<Vec<_>>(),
            vec!["Acme", "Other", "Other (2 merged)"]
        );
        let rollup = top.rows.last().unwrap();
        assert!(rollup.is_other);
        assert_eq!(rollup.label, "Other");
        assert_eq!(rollup.amount_local, Decimal::from(150));
        assert!(!top.get("Other").unwrap().is_other);
    }
}

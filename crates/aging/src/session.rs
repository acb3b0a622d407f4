//! One loaded dataset and the selections made against it.

use ar_aging_io::LoadedTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{customer_key, keys_for_label, merged_keys, overdue_beyond};
use crate::config::{AgingConfig, AliasConfig};
use crate::drilldown::{drill_down, drill_down_matching};
use crate::error::AgingError;
use crate::model::{AgingReport, Drilldown, InvoiceRecord, Normalized, Selector};
use crate::normalize::normalize;
use crate::report::{build_report, SourceInfo};

/// A selectable view of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Currency,
    Bucket,
    Customer,
    /// Customers of the overdue subset; the rollup key selects every merged customer.
    OverdueCustomer,
}

impl View {
    pub fn selector(self) -> Selector {
        match self {
            View::Currency => Selector::Currency,
            View::Bucket => Selector::Bucket,
            View::Customer | View::OverdueCustomer => Selector::Customer,
        }
    }
}

#[derive(Debug)]
struct Loaded {
    fingerprint: String,
    normalized: Normalized,
    report: AgingReport,
}

#[derive(Debug)]
pub struct Session {
    config: AgingConfig,
    as_of: Option<NaiveDate>,
    current: Option<Loaded>,
}

impl Session {
    pub fn new(config: AgingConfig) -> Self {
        Self {
            config,
            as_of: None,
            current: None,
        }
    }

    /// Use a fixed cutoff instead of deriving it from the data.
    pub fn with_as_of(mut self, as_of: Option<NaiveDate>) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn config(&self) -> &AgingConfig {
        &self.config
    }

    /// Normalize `table` and build its report.
    ///
    /// A table with the fingerprint of the loaded one reuses the cached
    /// report. Any failure leaves the session empty.
    pub fn load(&mut self, table: &LoadedTable) -> Result<&AgingReport, AgingError> {
        let cached = matches!(&self.current, Some(c) if c.fingerprint == table.fingerprint);

        if cached {
            log::debug!("reusing report for {}", table.fingerprint);
        } else {
            self.current = None;
            let normalized = normalize(&table.table, &self.config.columns)?;
            let report = build_report(
                &normalized,
                &self.config,
                SourceInfo {
                    name: &table.source,
                    fingerprint: &table.fingerprint,
                },
                self.as_of,
            )?;
            self.current = Some(Loaded {
                fingerprint: table.fingerprint.clone(),
                normalized,
                report,
            });
        }

        self.report().ok_or(AgingError::NoDataset)
    }

    pub fn report(&self) -> Option<&AgingReport> {
        self.current.as_ref().map(|c| &c.report)
    }

    pub fn records(&self) -> &[InvoiceRecord] {
        self.current
            .as_ref()
            .map(|c| c.normalized.records.as_slice())
            .unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Detail rows behind one key of a view.
    ///
    /// Customer views also accept a display alias when it stands for exactly
    /// one customer key in that view.
    pub fn select(&self, view: View, key: &str) -> Result<Drilldown, AgingError> {
        let loaded = self.current.as_ref().ok_or(AgingError::NoDataset)?;
        let records = &loaded.normalized.records;
        let ctx = &loaded.report.meta.context;
        let aliases = &self.config.aliases;
        let key = key.trim();

        match view {
            View::Currency | View::Bucket => drill_down(records, ctx, view.selector(), key, aliases),
            View::Customer => {
                let key = resolve_customer_key(records, aliases, key);
                drill_down(records, ctx, Selector::Customer, &key, aliases)
            }
            View::OverdueCustomer => {
                let overdue =
                    overdue_beyond(records, ctx.cutoff_date, self.config.report.overdue_months);
                let top = &loaded.report.overdue.top_customers;
                let is_rollup = top.rows.iter().any(|r| r.is_other && r.key == key);

                if is_rollup {
                    let merged = merged_keys(&loaded.report.overdue.customers, self.config.report.top_n);
                    drill_down_matching(overdue, ctx, Selector::Customer, key, |r| {
                        merged.iter().any(|k| k == customer_key(r, aliases))
                    })
                } else {
                    let key = resolve_customer_key(overdue.iter().copied(), aliases, key);
                    drill_down(overdue, ctx, Selector::Customer, &key, aliases)
                }
            }
        }
    }

    /// Customer keys displayed as `label` in a customer view.
    pub fn keys_for_label(&self, view: View, label: &str) -> Vec<String> {
        let Some(loaded) = self.current.as_ref() else {
            return Vec::new();
        };
        let records = &loaded.normalized.records;
        let aliases = &self.config.aliases;
        let label = label.trim();
        let keys = match view {
            View::Customer => keys_for_label(records, aliases, label),
            View::OverdueCustomer => {
                let cutoff = loaded.report.meta.context.cutoff_date;
                let overdue = overdue_beyond(records, cutoff, self.config.report.overdue_months);
                keys_for_label(overdue, aliases, label)
            }
            View::Currency | View::Bucket => Vec::new(),
        };
        keys.into_iter().map(str::to_string).collect()
    }
}

/// `key` itself when some record is grouped under it, else the single
/// customer key displayed as `key`.
fn resolve_customer_key<'a>(
    records: impl IntoIterator<Item = &'a InvoiceRecord> + Clone,
    aliases: &AliasConfig,
    key: &str,
) -> String {
    if records.clone().into_iter().any(|r| customer_key(r, aliases) == key) {
        return key.to_string();
    }
    match keys_for_label(records, aliases, key).as_slice() {
        [only] => {
            log::debug!("label '{key}' selects customer '{only}'");
            only.to_string()
        }
        _ => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RowKind;
    use ar_aging_io::{Cell, Table};
    use rust_decimal::Decimal;

    fn t(s: &str) -> Cell {
        Cell::Text(s.into())
    }

    fn loaded(rows: &[(&str, &str, &str)], fingerprint: &str) -> LoadedTable {
        let headers = crate::config::ColumnMapping::default()
            .required()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut body: Vec<Vec<Cell>> = rows
            .iter()
            .map(|(date, amount, customer)| {
                vec![t(date), t(amount), t("KRW"), Cell::Empty, t(customer), t("")]
            })
            .collect();
        body.push(vec![t("합계")]);
        LoadedTable {
            table: Table::new(headers, body),
            source: "test.csv".into(),
            fingerprint: fingerprint.into(),
        }
    }

    fn ledger() -> LoadedTable {
        loaded(
            &[
                ("2024-09-15", "100", "Fresh"),
                ("2023-01-01", "700", "C1"),
                ("2023-01-01", "600", "C2"),
                ("2023-01-01", "500", "C3"),
                ("2023-01-01", "400", "C4"),
                ("2023-01-01", "300", "C5"),
                ("2023-01-01", "200", "C6"),
                ("2023-02-01", "150", "C7"),
                ("2023-03-01", "50", "C6"),
            ],
            "sha256:aa",
        )
    }

    #[test]
    fn select_before_load_fails() {
        let session = Session::new(AgingConfig::default());
        assert!(matches!(
            session.select(View::Bucket, "<1mo"),
            Err(AgingError::NoDataset)
        ));
        assert!(session.report().is_none());
        assert!(session.records().is_empty());
    }

    #[test]
    fn load_then_select() {
        let mut session = Session::new(AgingConfig::default());
        let report = session.load(&ledger()).unwrap();
        assert_eq!(report.meta.record_count, 9);

        let drill = session.select(View::Bucket, "<1mo").unwrap();
        match drill {
            Drilldown::Rows(t) => {
                assert_eq!(t.details().len(), 1);
                assert_eq!(t.details()[0].customer_name, "Fresh");
            }
            Drilldown::Empty { .. } => panic!("expected rows"),
        }

        assert!(session.select(View::Currency, "USD").unwrap().is_empty());
    }

    #[test]
    fn overdue_customer_excludes_recent_rows() {
        let mut session = Session::new(AgingConfig::default());
        session.load(&ledger()).unwrap();
        assert!(!session.select(View::Customer, "Fresh").unwrap().is_empty());
        assert!(session.select(View::OverdueCustomer, "Fresh").unwrap().is_empty());
    }

    #[test]
    fn other_key_selects_merged_customers() {
        let mut session = Session::new(AgingConfig::default());
        let report = session.load(&ledger()).unwrap();
        // C6 = 250 and C7 = 150 fall past the top 5
        assert_eq!(report.overdue.top_customers.rows.len(), 6);

        let drill = session.select(View::OverdueCustomer, "Other").unwrap();
        let Drilldown::Rows(t) = drill else {
            panic!("expected rows")
        };
        let names: Vec<&str> = t.details().iter().map(|r| r.customer_name.as_str()).collect();
        assert_eq!(names, vec!["C6", "C7", "C6"]);
        let sub = t.subtotal().unwrap();
        assert_eq!(sub.kind, RowKind::Subtotal);
        assert_eq!(sub.amount_local, Decimal::from(400));
    }

    #[test]
    fn same_fingerprint_reuses_report() {
        let mut session = Session::new(AgingConfig::default());
        let first = session.load(&ledger()).unwrap().meta.generated_at.clone();

        // Different contents but same identity: cached report wins
        let mut same_id = loaded(&[("2020-01-01", "1", "X")], "sha256:aa");
        same_id.source = "renamed.csv".into();
        let again = session.load(&same_id).unwrap();
        assert_eq!(again.meta.generated_at, first);
        assert_eq!(again.meta.record_count, 9);

        let other = session.load(&loaded(&[("2020-01-01", "1", "X")], "sha256:bb")).unwrap();
        assert_eq!(other.meta.record_count, 1);
    }

    #[test]
    fn failed_load_clears_and_recovers() {
        let mut session = Session::new(AgingConfig::default());
        session.load(&ledger()).unwrap();

        let mut broken = ledger();
        broken.fingerprint = "sha256:broken".into();
        broken.table.headers[0] = "date".into();
        assert!(matches!(session.load(&broken), Err(AgingError::Schema { .. })));
        assert!(session.report().is_none());
        assert!(matches!(
            session.select(View::Bucket, "<1mo"),
            Err(AgingError::NoDataset)
        ));

        session.load(&ledger()).unwrap();
        assert!(session.report().is_some());
    }

    #[test]
    fn as_of_is_applied() {
        let as_of = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let mut session = Session::new(AgingConfig::default()).with_as_of(Some(as_of));
        let report = session.load(&ledger()).unwrap();
        assert_eq!(report.meta.context.cutoff_date, as_of);
        assert!(report.meta.context.overridden);
    }

    #[test]
    fn view_names() {
        let v: View = serde_json::from_str("\"overdue-customer\"").unwrap();
        assert_eq!(v, View::OverdueCustomer);
        assert_eq!(View::OverdueCustomer.selector(), Selector::Customer);
    }

    #[test]
    fn display_alias_selects_its_single_customer() {
        let mut config = AgingConfig::default();
        config.aliases.names = [("C1", "Gamma"), ("C2", "Dup"), ("C3", "Dup")]
            .into_iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();
        let mut session = Session::new(config);
        session.load(&ledger()).unwrap();

        for view in [View::OverdueCustomer, View::Customer] {
            let Drilldown::Rows(t) = session.select(view, "Gamma").unwrap() else {
                panic!("expected rows for {view:?}")
            };
            assert_eq!(t.key, "C1");
            assert_eq!(t.details()[0].customer_name, "C1");
        }

        // one label, two customers: stays empty, caller lists the keys
        assert!(session.select(View::OverdueCustomer, "Dup").unwrap().is_empty());
        assert_eq!(session.keys_for_label(View::OverdueCustomer, "Dup"), vec!["C2", "C3"]);
        assert!(session.keys_for_label(View::Currency, "Dup").is_empty());

        // raw keys keep working
        assert!(!session.select(View::OverdueCustomer, "C2").unwrap().is_empty());
    }

    #[test]
    fn customer_named_like_the_rollup() {
        let mut session = Session::new(AgingConfig::default());
        let report = session
            .load(&loaded(
                &[
                    ("2023-01-01", "700", "C1"),
                    ("2023-01-01", "600", "C2"),
                    ("2023-01-01", "500", "C3"),
                    ("2023-01-01", "400", "C4"),
                    ("2023-01-01", "300", "C5"),
                    ("2023-01-01", "200", "Other"),
                    ("2023-01-01", "150", "C7"),
                ],
                "sha256:cc",
            ))
            .unwrap();
        let rollup = report.overdue.top_customers.rows.last().unwrap();
        assert!(rollup.is_other);
        assert_eq!(rollup.key, "Other (2 merged)");
        assert_eq!(rollup.label, "Other");

        let Drilldown::Rows(t) = session.select(View::OverdueCustomer, "Other").unwrap() else {
            panic!("expected rows")
        };
        assert_eq!(t.details().len(), 1);
        assert_eq!(t.details()[0].amount_local, Decimal::from(200));

        let Drilldown::Rows(t) = session.select(View::OverdueCustomer, "Other (2 merged)").unwrap()
        else {
            panic!("expected rows")
        };
        assert_eq!(t.details().len(), 2);
        assert_eq!(t.subtotal().unwrap().amount_local, Decimal::from(350));
    }

    #[test]
    fn oversized_amounts_fail_the_load() {
        let mut session = Session::new(AgingConfig::default());
        let big = "1000000000000000000000000000";
        session
            .load(&loaded(&[("2024-01-01", big, "A"), ("2024-02-01", "5", "B")], "sha256:dd"))
            .unwrap();

        let rows: Vec<(&str, &str, &str)> = (0..80).map(|_| ("2024-01-01", big, "A")).collect();
        let err = session.load(&loaded(&rows, "sha256:ee")).unwrap_err();
        assert!(matches!(err, AgingError::Computation(_)), "{err}");
        assert!(session.report().is_none());
    }
}

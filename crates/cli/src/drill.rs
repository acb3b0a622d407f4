//! `ar-aging drill` - detail rows behind one aggregate key.

use std::path::{Path, PathBuf};

use ar_aging::model::{AgeBucket, DetailTable, Drilldown};
use ar_aging::{Session, View};
use clap::ValueEnum;

use crate::exit_codes::EXIT_IO;
use crate::report::{open_dataset, warn_dropped, write_json, Dataset};
use crate::{render, CliError, InputArgs};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ViewArg {
    /// Age bucket label (<1mo, 1-3mo, 3-6mo, 6-12mo, >1yr)
    Bucket,
    /// Currency code
    Currency,
    /// Customer, across the whole ledger
    Customer,
    /// Customer within the overdue subset; the rollup key (usually "Other") selects the rolled-up tail
    OverdueCustomer,
}

impl From<ViewArg> for View {
    fn from(v: ViewArg) -> Self {
        match v {
            ViewArg::Bucket => View::Bucket,
            ViewArg::Currency => View::Currency,
            ViewArg::Customer => View::Customer,
            ViewArg::OverdueCustomer => View::OverdueCustomer,
        }
    }
}

pub(crate) fn cmd_drill(
    input: InputArgs,
    view: ViewArg,
    key: String,
    json: bool,
    csv_out: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    if key.trim().is_empty() {
        return Err(CliError::usage("--key must not be empty"));
    }
    let Dataset { config, table } = open_dataset(&input)?;
    let columns = config.columns.clone();

    let mut session = Session::new(config).with_as_of(input.as_of);
    let dropped = session
        .load(&table)
        .map_err(|e| CliError::aging(e, &columns))?
        .meta
        .dropped_count;
    warn_dropped(dropped, &columns.invoice_date, quiet);

    let drill = session
        .select(view.into(), &key)
        .map_err(|e| CliError::aging(e, &columns))?;

    if drill.is_empty() && !quiet {
        match view {
            ViewArg::Bucket if AgeBucket::from_label(&key).is_none() => {
                let labels: Vec<&str> = AgeBucket::ALL.iter().map(|b| b.label()).collect();
                eprintln!("note: '{key}' is not a bucket label; expected one of {}", labels.join(", "));
            }
            ViewArg::Customer | ViewArg::OverdueCustomer => {
                let keys = session.keys_for_label(view.into(), &key);
                if keys.len() > 1 {
                    eprintln!(
                        "note: '{}' is shown for several customers; use one of: {}",
                        key.trim(),
                        keys.join(", ")
                    );
                }
            }
            _ => {}
        }
    }

    if let Some(path) = &csv_out {
        write_csv(path, &drill)?;
        eprintln!("wrote {}", path.display());
    }

    if json {
        write_json(&drill, None, true)?;
    } else {
        print!("{}", render::drilldown(&drill));
    }
    Ok(())
}

const CSV_HEADERS: [&str; 9] = [
    "kind",
    "invoice_date",
    "age_bucket",
    "customer_name",
    "currency_code",
    "amount_foreign",
    "amount_local",
    "memo",
    "source_row",
];

/// Detail rows plus the subtotal row; header only when nothing matched.
fn write_csv(path: &Path, drill: &Drilldown) -> Result<(), CliError> {
    let io_err = |e: csv::Error| CliError {
        code: EXIT_IO,
        message: format!("cannot write {}: {e}", path.display()),
        hint: None,
    };

    let mut writer = csv::Writer::from_path(path).map_err(io_err)?;
    writer.write_record(CSV_HEADERS).map_err(io_err)?;
    if let Drilldown::Rows(t) = drill {
        for record in csv_records(t) {
            writer.write_record(&record).map_err(io_err)?;
        }
    }
    writer.flush().map_err(|e| io_err(e.into()))?;
    Ok(())
}

fn csv_records(t: &DetailTable) -> Vec<[String; 9]> {
    t.rows
        .iter()
        .map(|r| {
            [
                match r.kind {
                    ar_aging::model::RowKind::Detail => "detail".to_string(),
                    ar_aging::model::RowKind::Subtotal => "subtotal".to_string(),
                },
                r.invoice_date.map(|d| d.to_string()).unwrap_or_default(),
                r.age_bucket.map(|b| b.label().to_string()).unwrap_or_default(),
                r.customer_name.clone(),
                r.currency_code.clone(),
                r.amount_foreign.map(|a| a.to_string()).unwrap_or_default(),
                r.amount_local.to_string(),
                r.memo.clone(),
                r.source_row.map(|n| n.to_string()).unwrap_or_default(),
            ]
        })
        .collect()
}

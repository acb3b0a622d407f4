//! `ar-aging report` and `ar-aging validate`.

use std::path::PathBuf;

use ar_aging::model::ReportingContext;
use ar_aging::{AgingConfig, Session};
use ar_aging_io::{LoadOptions, LoadedTable};

use crate::exit_codes::EXIT_IO;
use crate::{render, CliError, InputArgs};

/// Config + raw table for one invocation.
pub(crate) struct Dataset {
    pub config: AgingConfig,
    pub table: LoadedTable,
}

pub(crate) fn open_dataset(input: &InputArgs) -> Result<Dataset, CliError> {
    let (config, _origin) = crate::config::load(input.config.as_deref())?;
    let options = LoadOptions {
        format: None,
        sheet: input.sheet.clone(),
    };
    let table = ar_aging_io::load(&input.file, &options).map_err(CliError::from)?;
    Ok(Dataset { config, table })
}

/// Stderr note for rows excluded over an unparsable invoice date.
pub(crate) fn warn_dropped(count: usize, column: &str, quiet: bool) {
    if count > 0 && !quiet {
        eprintln!("warning: dropped {count} row(s) with invalid '{column}' values");
    }
}

pub(crate) fn write_json<T: serde::Serialize>(
    value: &T,
    output: Option<&PathBuf>,
    to_stdout: bool,
) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;

    if let Some(path) = output {
        std::fs::write(path, &json).map_err(|e| CliError {
            code: EXIT_IO,
            message: format!("cannot write {}: {e}", path.display()),
            hint: None,
        })?;
        eprintln!("wrote {}", path.display());
    }
    if to_stdout {
        println!("{json}");
    }
    Ok(())
}

pub(crate) fn cmd_report(
    input: InputArgs,
    json: bool,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let Dataset { config, table } = open_dataset(&input)?;
    let columns = config.columns.clone();

    let mut session = Session::new(config).with_as_of(input.as_of);
    let report = session
        .load(&table)
        .map_err(|e| CliError::aging(e, &columns))?;

    warn_dropped(report.meta.dropped_count, &columns.invoice_date, quiet);

    write_json(report, output.as_ref(), json)?;
    if !json {
        print!("{}", render::report(report));
    }
    Ok(())
}

pub(crate) fn cmd_validate(input: InputArgs, quiet: bool) -> Result<(), CliError> {
    let Dataset { config, table } = open_dataset(&input)?;

    let normalized = ar_aging::normalize(&table.table, &config.columns)
        .map_err(|e| CliError::aging(e, &config.columns))?;
    let ctx = ReportingContext::with_as_of(&normalized.records, input.as_of)
        .ok_or_else(|| CliError::aging(ar_aging::AgingError::EmptyDataset { dropped: 0 }, &config.columns))?;

    warn_dropped(normalized.dropped_count(), &config.columns.invoice_date, quiet);
    if !quiet {
        for row in &normalized.dropped {
            eprintln!("  row {}: '{}'", row.source_row, row.value);
        }
    }

    println!(
        "ok: {} ({} records, {} dropped, cutoff {})",
        table.source,
        normalized.records.len(),
        normalized.dropped_count(),
        ctx.cutoff_date
    );
    Ok(())
}

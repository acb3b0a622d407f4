// ar-aging CLI - accounts-receivable aging reports from ledger exports

mod config;
mod drill;
mod exit_codes;
mod render;
mod report;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use ar_aging::config::ColumnMapping;
use ar_aging::AgingError;
use ar_aging_io::IoError;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{
    EXIT_COMPUTATION, EXIT_CONFIG, EXIT_EMPTY_DATASET, EXIT_ERROR, EXIT_IO, EXIT_SCHEMA,
    EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "ar-aging")]
#[command(about = "Accounts-receivable aging analysis (cutoff, age buckets, overdue customers)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Ledger file plus everything that changes how it is read.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Ledger file (.csv, .tsv, .txt, .xlsx, .xlsm, .xls, .xlsb, .ods)
    pub file: PathBuf,

    /// Worksheet name for workbooks (default: first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Config file (default: per-user config, else built-in)
    #[arg(long, env = config::CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Fixed cutoff date instead of the month-end of the latest invoice
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the aging report: total, currency shares, age buckets, overdue customers
    #[command(after_help = "\
Examples:
  ar-aging report ledger.xlsx
  ar-aging report ledger.xlsx --sheet 2024-09
  ar-aging report ledger.csv --json
  ar-aging report ledger.csv --output report.json
  ar-aging report ledger.csv --as-of 2024-12-31 --config team.toml")]
    Report {
        #[command(flatten)]
        input: InputArgs,

        /// Print the report as one JSON document on stdout
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Suppress stderr notes (e.g. dropped-row counts)
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// List the records behind one key of a view, with a subtotal row
    #[command(after_help = "\
Examples:
  ar-aging drill ledger.xlsx --view bucket --key 1-3mo
  ar-aging drill ledger.xlsx --view currency --key USD --json
  ar-aging drill ledger.xlsx --view overdue-customer --key Other
  ar-aging drill ledger.xlsx --view customer --key '(주)엘지화학' --csv lg.csv")]
    Drill {
        #[command(flatten)]
        input: InputArgs,

        /// View to select from
        #[arg(long, value_enum)]
        view: drill::ViewArg,

        /// Key as shown in the report (bucket label, currency code, customer)
        #[arg(long)]
        key: String,

        /// Print the detail table as one JSON document on stdout
        #[arg(long)]
        json: bool,

        /// Also write the detail table to a CSV file
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,

        /// Suppress stderr notes
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Check that a ledger loads: columns present, dates parse, amounts numeric
    #[command(after_help = "\
Examples:
  ar-aging validate ledger.xlsx
  ar-aging validate export.csv --config team.toml")]
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Suppress the list of dropped rows
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Inspect configuration
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  ar-aging ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

/// Logs go to stderr so `--json` stdout stays a single document.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Report { input, json, output, quiet } => {
            report::cmd_report(input, json, output, quiet)
        }
        Commands::Drill { input, view, key, json, csv, quiet } => {
            drill::cmd_drill(input, view, key, json, csv, quiet)
        }
        Commands::Validate { input, quiet } => report::cmd_validate(input, quiet),
        Commands::Config(cmd) => config::cmd_config(cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    /// Map an engine error, naming the configured columns where that helps.
    pub fn aging(err: AgingError, columns: &ColumnMapping) -> Self {
        let required = columns.required().join(", ");
        match err {
            AgingError::Schema { .. } => Self {
                code: EXIT_SCHEMA,
                message: err.to_string(),
                hint: Some(format!(
                    "required columns: {required}; map other header names under [columns] in the config"
                )),
            },
            AgingError::EmptyDataset { .. } => Self {
                code: EXIT_EMPTY_DATASET,
                message: err.to_string(),
                hint: Some(format!(
                    "check that '{}' holds dates (YYYY-MM-DD or Excel dates)",
                    columns.invoice_date
                )),
            },
            AgingError::Computation(_) => Self {
                code: EXIT_COMPUTATION,
                message: err.to_string(),
                hint: Some(format!(
                    "amount columns '{}' and '{}' must be numeric (required columns: {required})",
                    columns.amount_local, columns.amount_foreign
                )),
            },
            AgingError::Config(_) => Self::config(err.to_string()),
            AgingError::NoDataset => Self::general(err.to_string()),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let hint = match &err {
            IoError::UnsupportedFormat(_) => {
                Some("supported: csv, tsv, txt, xlsx, xlsm, xls, xlsb, ods".to_string())
            }
            IoError::NoSheet { available, .. } => Some(format!("available sheets: {available}")),
            _ => None,
        };
        let error = Self { code: EXIT_IO, message: err.to_string(), hint: None };
        match hint {
            Some(h) => error.with_hint(h),
            None => error,
        }
    }
}

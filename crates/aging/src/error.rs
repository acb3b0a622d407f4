use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgingError {
    /// Required columns absent from the header row.
    #[error("missing required column(s): {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// No valid record left after dropping rows.
    #[error("no valid records ({dropped} row(s) dropped for unparsable dates)")]
    EmptyDataset { dropped: usize },

    /// Unexpected failure while normalizing or aggregating.
    #[error("computation error: {0}")]
    Computation(String),

    /// TOML parse or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Selection made before any dataset was loaded.
    #[error("no dataset loaded")]
    NoDataset,
}

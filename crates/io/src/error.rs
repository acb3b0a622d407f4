use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    /// File could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed delimited text.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Workbook could not be opened or a sheet could not be read.
    #[error("workbook error: {0}")]
    Workbook(String),

    /// Extension not recognized as CSV or workbook.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Requested sheet is not in the workbook.
    #[error("sheet '{name}' not found (available: {available})")]
    NoSheet { name: String, available: String },

    /// No header row at all.
    #[error("{0}: file contains no data")]
    Empty(String),
}

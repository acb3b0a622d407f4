//! `ar-aging-io` - loads ledger files into untyped tables.
//!
//! The loader only knows about headers, rows and cells. Column meaning,
//! trailer rows and date coercion belong to the engine crate.

pub mod csv;
pub mod error;
pub mod table;
pub mod xlsx;

use std::path::Path;

pub use error::IoError;
pub use table::{fingerprint, Cell, LoadedTable, Table};

/// Input file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Delimited text (delimiter is sniffed).
    Delimited,
    /// Excel / OpenDocument workbook.
    Workbook,
}

impl Format {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("csv") | Some("tsv") | Some("txt") => Ok(Format::Delimited),
            Some("xlsx") | Some("xlsm") | Some("xls") | Some("xlsb") | Some("ods") => {
                Ok(Format::Workbook)
            }
            other => Err(IoError::UnsupportedFormat(
                other.unwrap_or("(none)").to_string(),
            )),
        }
    }
}

/// Options for [`load`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Force a format instead of inferring it from the extension.
    pub format: Option<Format>,
    /// Workbook sheet name. First sheet when `None`. Ignored for CSV.
    pub sheet: Option<String>,
}

/// Load a ledger file into a [`LoadedTable`].
pub fn load(path: &Path, options: &LoadOptions) -> Result<LoadedTable, IoError> {
    let format = match options.format {
        Some(f) => f,
        None => Format::from_path(path)?,
    };

    let bytes = std::fs::read(path).map_err(|e| IoError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let fingerprint = table::fingerprint(&bytes);

    let table = match format {
        Format::Delimited => csv::parse_bytes(&bytes)?,
        Format::Workbook => xlsx::parse_bytes(bytes, options.sheet.as_deref())?,
    };

    if table.headers.is_empty() {
        return Err(IoError::Empty(path.display().to_string()));
    }

    log::debug!(
        "loaded {} ({} columns, {} rows, {})",
        path.display(),
        table.headers.len(),
        table.rows.len(),
        fingerprint
    );

    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(LoadedTable {
        table,
        source,
        fingerprint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn infer_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.csv")).unwrap(), Format::Delimited);
        assert_eq!(Format::from_path(Path::new("a.TSV")).unwrap(), Format::Delimited);
        assert_eq!(Format::from_path(Path::new("a.xlsx")).unwrap(), Format::Workbook);
        assert_eq!(Format::from_path(Path::new("a.ods")).unwrap(), Format::Workbook);
        assert!(matches!(
            Format::from_path(Path::new("a.pdf")),
            Err(IoError::UnsupportedFormat(ext)) if ext == "pdf"
        ));
        assert!(Format::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn load_csv_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "a,b\n1,2\n3,4\n").unwrap();

        let loaded = load(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(loaded.table.headers, vec!["a", "b"]);
        assert_eq!(loaded.table.rows.len(), 2);
        assert!(loaded.fingerprint.starts_with("sha256:"));
        assert!(loaded.source.ends_with(".csv"));
    }

    #[test]
    fn load_empty_file_is_error() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let err = load(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, IoError::Empty(_)));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load(Path::new("/definitely/not/here.csv"), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, IoError::Io { .. }));
    }
}

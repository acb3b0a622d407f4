// Delimited text import

use crate::error::IoError;
use crate::table::{Cell, Table};

/// Parse delimited bytes into a table. The first non-blank record is the header.
pub fn parse_bytes(bytes: &[u8]) -> Result<Table, IoError> {
    let content = decode(bytes);
    let delimiter = sniff_delimiter(&content);
    parse_str(&content, delimiter)
}

/// Parse already-decoded text with a known delimiter.
pub fn parse_str(content: &str, delimiter: u8) -> Result<Table, IoError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        if headers.is_none() {
            headers = Some(record.iter().map(|h| h.trim().to_string()).collect());
            continue;
        }

        let row = record
            .iter()
            .map(|field| {
                let field = field.trim();
                if field.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(Table::new(headers.unwrap_or_default(), rows))
}

/// Decode file bytes to UTF-8.
///
/// Strips a UTF-8 BOM. Non-UTF-8 input is decoded as EUC-KR (CP949), which is
/// what Korean spreadsheet exports use.
pub fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, had_errors) = encoding_rs::EUC_KR.decode(bytes);
            if had_errors {
                log::warn!("input is neither UTF-8 nor clean EUC-KR; some characters were replaced");
            }
            decoded.into_owned()
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                ::csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // lines agreeing with the header's field count, weighted by that count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

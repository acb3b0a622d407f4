//! CLI Exit Code Registry
//!
//! Single source of truth for `ar-aging` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad arguments)                          |
//! | 3    | Input file unreadable, unsupported, or sheet missing |
//! | 4    | Required ledger columns missing                      |
//! | 5    | No valid records after dropping bad dates            |
//! | 6    | Computation failed (e.g. non-numeric amount)         |
//! | 7    | Invalid configuration                                |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in `CliError`

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse failures.
pub const EXIT_USAGE: u8 = 2;

/// File could not be read, has an unsupported extension, or names a missing sheet.
pub const EXIT_IO: u8 = 3;

/// One or more required columns are absent from the header row.
pub const EXIT_SCHEMA: u8 = 4;

/// Every row was dropped (or there were none).
pub const EXIT_EMPTY_DATASET: u8 = 5;

/// Normalization or aggregation failed.
pub const EXIT_COMPUTATION: u8 = 6;

/// Config file unreadable, malformed, or invalid.
pub const EXIT_CONFIG: u8 = 7;

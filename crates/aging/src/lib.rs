//! `ar-aging` - accounts-receivable aging engine.
//!
//! Pure engine crate: receives a loaded table, returns normalized records,
//! aggregates and drill-downs. No CLI dependencies; file access lives in
//! `ar-aging-io`.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod drilldown;
pub mod error;
pub mod model;
pub mod normalize;
pub mod report;
pub mod reporting;
pub mod session;

pub use config::{AgingConfig, AliasMode};
pub use error::AgingError;
pub use model::{AgeBucket, Aggregate, AgingReport, Drilldown, InvoiceRecord, Selector};
pub use normalize::normalize;
pub use report::{build_report, SourceInfo};
pub use session::{Session, View};

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AgingError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgingConfig {
    pub columns: ColumnMapping,
    pub report: ReportConfig,
    pub aliases: AliasConfig,
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Header names of the six required ledger columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnMapping {
    pub invoice_date: String,
    pub amount_local: String,
    pub currency_code: String,
    pub amount_foreign: String,
    pub customer_name: String,
    pub memo: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            invoice_date: "매출일자".into(),
            amount_local: "채권금액(원화)".into(),
            currency_code: "환종".into(),
            amount_foreign: "채권금액(외화)".into(),
            customer_name: "거래처명".into(),
            memo: "적요".into(),
        }
    }
}

impl ColumnMapping {
    /// Header names in ledger order.
    pub fn required(&self) -> [&str; 6] {
        [
            self.invoice_date.as_str(),
            self.amount_local.as_str(),
            self.currency_code.as_str(),
            self.amount_foreign.as_str(),
            self.customer_name.as_str(),
            self.memo.as_str(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Customers kept individually in the overdue view.
    pub top_n: usize,
    /// Calendar months past the cutoff before a receivable counts as overdue.
    pub overdue_months: u32,
    /// Divisor for the displayed scalar total.
    pub unit: Decimal,
    pub unit_label: String,
    /// Key of the synthetic Top-N rollup row.
    pub other_label: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            overdue_months: 6,
            unit: Decimal::from(1_000_000),
            unit_label: "백만원".into(),
            other_label: "Other".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Customer aliases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasMode {
    /// Group by raw name; alias only the labels of aggregated keys.
    #[default]
    Display,
    /// Group by alias, merging customers that share one.
    Merge,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AliasConfig {
    pub mode: AliasMode,
    /// Long legal name → short display label.
    pub names: BTreeMap<String, String>,
}

impl AliasConfig {
    pub fn alias_for<'a>(&'a self, name: &'a str) -> &'a str {
        self.names.get(name).map(String::as_str).unwrap_or(name)
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl AgingConfig {
    pub fn from_toml(input: &str) -> Result<Self, AgingError> {
        let config: AgingConfig =
            toml::from_str(input).map_err(|e| AgingError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, AgingError> {
        toml::to_string_pretty(self).map_err(|e| AgingError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), AgingError> {
        if self.report.top_n == 0 {
            return Err(AgingError::Config("report.top_n must be at least 1".into()));
        }
        if self.report.overdue_months == 0 {
            return Err(AgingError::Config(
                "report.overdue_months must be at least 1".into(),
            ));
        }
        if self.report.unit <= Decimal::ZERO {
            return Err(AgingError::Config(format!(
                "report.unit must be positive, got {}",
                self.report.unit
            )));
        }
        if self.report.other_label.trim().is_empty() {
            return Err(AgingError::Config("report.other_label must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for name in self.columns.required() {
            if name.trim().is_empty() {
                return Err(AgingError::Config("column names must not be empty".into()));
            }
            if !seen.insert(name.trim()) {
                return Err(AgingError::Config(format!(
                    "column '{name}' is mapped more than once"
                )));
            }
        }

        for (from, to) in &self.aliases.names {
            if to.trim().is_empty() {
                return Err(AgingError::Config(format!(
                    "alias for '{from}' must not be empty"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

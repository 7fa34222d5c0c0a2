//! Weight map sources.
//!
//! The engine treats holdings storage as opaque: anything implementing
//! [`WeightMapProvider`] can back a run, as long as it returns a deterministic
//! snapshot for a given symbol and field.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::BlendError;
use crate::types::WeightVector;
use crate::BlendResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which stored weight column to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightField {
    /// Weight as published in the fund's holdings filing.
    #[default]
    Weight,
    /// Weight recomputed from market values.
    ActualWeight,
}

impl fmt::Display for WeightField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightField::Weight => write!(f, "weight"),
            WeightField::ActualWeight => write!(f, "actual_weight"),
        }
    }
}

/// Source of per-fund weight maps.
pub trait WeightMapProvider: Send + Sync {
    /// Ticker -> weight for `etf_symbol` using the given column.
    ///
    /// A fund with no holdings yields an empty map rather than an error.
    fn weight_map(&self, etf_symbol: &str, field: WeightField) -> BlendResult<WeightVector>;
}

/// A persisted holdings row: one security inside one fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRow {
    pub etf_symbol: String,
    pub stock_symbol: String,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_weight: Option<f64>,
}

/// In-memory holdings snapshot keyed by upper-cased ETF symbol.
#[derive(Debug, Clone, Default)]
pub struct HoldingsTable {
    funds: BTreeMap<String, Vec<HoldingRow>>,
}

// ---------------------------------------------------------------------------
// HoldingsTable
// ---------------------------------------------------------------------------

impl HoldingsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = HoldingRow>) -> Self {
        let mut table = Self::new();
        for row in rows {
            table.insert(row);
        }
        table
    }

    pub fn insert(&mut self, row: HoldingRow) {
        let key = normalize_ticker(&row.etf_symbol);
        self.funds.entry(key).or_default().push(row);
    }

    /// Convenience for fixtures: add a whole fund from `(ticker, weight)` pairs.
    pub fn with_fund(mut self, etf_symbol: &str, holdings: &[(&str, f64)]) -> Self {
        for (ticker, weight) in holdings {
            self.insert(HoldingRow {
                etf_symbol: etf_symbol.to_string(),
                stock_symbol: ticker.to_string(),
                weight: *weight,
                actual_weight: None,
            });
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.funds.is_empty()
    }
}

impl WeightMapProvider for HoldingsTable {
    fn weight_map(&self, etf_symbol: &str, field: WeightField) -> BlendResult<WeightVector> {
        let key = normalize_ticker(etf_symbol);
        let Some(rows) = self.funds.get(&key) else {
            return Ok(WeightVector::new());
        };

        let raw = rows.iter().filter_map(|row| {
            let value = match field {
                WeightField::Weight => Some(row.weight),
                WeightField::ActualWeight => row.actual_weight,
            };
            value.map(|w| (row.stock_symbol.as_str(), w))
        });
        canonicalize(&key, raw)
    }
}

// ---------------------------------------------------------------------------
// Canonicalization
// ---------------------------------------------------------------------------

/// Trimmed, upper-cased ticker.
pub fn normalize_ticker(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Build a clean weight vector from raw `(ticker, weight)` pairs.
///
/// Tickers are case-normalized and duplicates (share classes listed twice,
/// mixed-case spellings) are summed. Blank tickers are skipped. A negative or
/// non-finite weight is a data error naming the fund and ticker.
pub fn canonicalize<'a>(
    fund: &str,
    raw: impl IntoIterator<Item = (&'a str, f64)>,
) -> BlendResult<WeightVector> {
    let mut out = WeightVector::new();
    for (ticker, weight) in raw {
        let ticker = normalize_ticker(ticker);
        if ticker.is_empty() {
            continue;
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(BlendError::data(
                format!("weight map for {}", fund),
                format!("{} has invalid weight {}", ticker, weight),
            ));
        }
        *out.entry(ticker).or_insert(0.0) += weight;
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(etf: &str, stock: &str, weight: f64, actual: Option<f64>) -> HoldingRow {
        HoldingRow {
            etf_symbol: etf.into(),
            stock_symbol: stock.into(),
            weight,
            actual_weight: actual,
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = HoldingsTable::from_rows(vec![row("vti", "aapl", 0.06, None)]);
        let map = table.weight_map("VTI", WeightField::Weight).unwrap();
        assert_eq!(map.get("AAPL"), Some(&0.06));
    }

    #[test]
    fn test_unknown_fund_is_empty() {
        let table = HoldingsTable::new();
        let map = table.weight_map("NOPE", WeightField::Weight).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_actual_weight_column_skips_missing() {
        let table = HoldingsTable::from_rows(vec![
            row("EBI", "AAA", 0.5, Some(0.48)),
            row("EBI", "BBB", 0.5, None),
        ]);
        let map = table.weight_map("EBI", WeightField::ActualWeight).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("AAA"), Some(&0.48));
    }

    #[test]
    fn test_duplicate_tickers_are_summed() {
        let table = HoldingsTable::from_rows(vec![
            row("IWN", "brk.b", 0.01, None),
            row("IWN", " BRK.B ", 0.02, None),
        ]);
        let map = table.weight_map("iwn", WeightField::Weight).unwrap();
        assert!((map["BRK.B"] - 0.03).abs() < 1e-15);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let table = HoldingsTable::from_rows(vec![row("VTV", "XOM", -0.1, None)]);
        let err = table.weight_map("VTV", WeightField::Weight).unwrap_err();
        assert!(matches!(err, BlendError::Data { .. }));
        assert!(err.to_string().contains("XOM"));
    }

    #[test]
    fn test_non_finite_weight_rejected() {
        assert!(canonicalize("VTV", vec![("XOM", f64::NAN)]).is_err());
        assert!(canonicalize("VTV", vec![("XOM", f64::INFINITY)]).is_err());
    }

    #[test]
    fn test_blank_tickers_skipped() {
        let map = canonicalize("VTV", vec![("  ", 0.2), ("XOM", 0.8)]).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_row_serde_omits_missing_actual_weight() {
        let json = serde_json::to_value(row("VTI", "AAPL", 0.06, None)).unwrap();
        assert!(json.get("actual_weight").is_none());
        let back: HoldingRow = serde_json::from_value(json).unwrap();
        assert_eq!(back.actual_weight, None);
    }
}

//! Symbol universe resolution.
//!
//! Fetches the target and baseline weight maps, takes the union of their
//! tickers, drops reserved fixture tickers, and sorts the result so the matrix
//! axis is reproducible.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::diagnostics::{Diagnostics, ValidationWarning};
use crate::error::BlendError;
use crate::holdings::provider::{canonicalize, normalize_ticker, WeightField, WeightMapProvider};
use crate::types::{Ticker, WeightVector};
use crate::BlendResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One fund's weight map as returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundHoldings {
    /// Upper-cased ETF symbol.
    pub symbol: String,
    pub weights: WeightVector,
}

/// Lexicographically sorted, de-duplicated tickers for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolUniverse(Vec<Ticker>);

impl SymbolUniverse {
    /// Build from any ticker collection; sorts and de-duplicates.
    pub fn from_symbols(symbols: impl IntoIterator<Item = Ticker>) -> Self {
        let set: BTreeSet<Ticker> = symbols.into_iter().collect();
        SymbolUniverse(set.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.index_of(ticker).is_some()
    }

    /// Row index of `ticker` on the matrix axis.
    pub fn index_of(&self, ticker: &str) -> Option<usize> {
        self.0.binary_search_by(|s| s.as_str().cmp(ticker)).ok()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Ticker> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Ticker] {
        &self.0
    }
}

/// Everything the numeric phase needs from storage, fetched up front.
#[derive(Debug, Clone)]
pub struct ResolvedUniverse {
    pub universe: SymbolUniverse,
    pub target: FundHoldings,
    /// In caller-supplied order.
    pub baselines: Vec<FundHoldings>,
    pub diagnostics: Diagnostics,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Fetch every weight map and resolve the symbol universe.
///
/// All provider calls complete before anything else happens; the provider is
/// only borrowed for the duration of this call.
pub fn resolve_universe(
    target_symbol: &str,
    baseline_symbols: &[String],
    provider: &dyn WeightMapProvider,
    field: WeightField,
    reserved: &BTreeSet<String>,
) -> BlendResult<ResolvedUniverse> {
    validate_symbols(target_symbol, baseline_symbols)?;

    let target = fetch_fund(provider, target_symbol, field)?;
    let baselines = baseline_symbols
        .iter()
        .map(|s| fetch_fund(provider, s, field))
        .collect::<BlendResult<Vec<_>>>()?;

    let (universe, diagnostics) = build_universe(&target, &baselines, reserved)?;

    tracing::debug!(
        target = %target.symbol,
        baselines = baselines.len(),
        symbols = universe.len(),
        "resolved symbol universe"
    );

    Ok(ResolvedUniverse {
        universe,
        target,
        baselines,
        diagnostics,
    })
}

/// Union of all tickers minus the reserved set.
///
/// Fails with a data error when nothing is left after filtering.
pub fn build_universe(
    target: &FundHoldings,
    baselines: &[FundHoldings],
    reserved: &BTreeSet<String>,
) -> BlendResult<(SymbolUniverse, Diagnostics)> {
    let reserved: BTreeSet<String> = reserved.iter().map(|s| normalize_ticker(s)).collect();

    let mut all: BTreeSet<&str> = BTreeSet::new();
    for fund in std::iter::once(target).chain(baselines.iter()) {
        all.extend(fund.weights.keys().map(|k| k.as_str()));
    }

    let (filtered, kept): (Vec<&str>, Vec<&str>) =
        all.into_iter().partition(|t| reserved.contains(*t));

    let mut diagnostics = Diagnostics::new();
    if !filtered.is_empty() {
        diagnostics.push(ValidationWarning::ReservedSymbolsFiltered {
            count: filtered.len(),
            symbols: filtered.iter().map(|s| s.to_string()).collect(),
        });
    }

    if kept.is_empty() {
        let funds: Vec<&str> = std::iter::once(target.symbol.as_str())
            .chain(baselines.iter().map(|b| b.symbol.as_str()))
            .collect();
        return Err(BlendError::data(
            "symbol universe",
            format!("no holdings found for {}", funds.join(", ")),
        ));
    }

    let universe = SymbolUniverse::from_symbols(kept.into_iter().map(String::from));
    Ok((universe, diagnostics))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_symbols(target_symbol: &str, baseline_symbols: &[String]) -> BlendResult<()> {
    if normalize_ticker(target_symbol).is_empty() {
        return Err(BlendError::configuration(
            "targetEtf",
            "target ETF symbol is empty",
        ));
    }
    if baseline_symbols.is_empty() {
        return Err(BlendError::configuration(
            "baselineEtfs",
            "at least one baseline ETF is required",
        ));
    }
    for (i, s) in baseline_symbols.iter().enumerate() {
        if normalize_ticker(s).is_empty() {
            return Err(BlendError::configuration(
                format!("baselineEtfs[{}]", i),
                "baseline ETF symbol is empty",
            ));
        }
    }
    Ok(())
}

fn fetch_fund(
    provider: &dyn WeightMapProvider,
    symbol: &str,
    field: WeightField,
) -> BlendResult<FundHoldings> {
    let symbol = normalize_ticker(symbol);
    let raw = provider.weight_map(&symbol, field)?;
    let weights = canonicalize(&symbol, raw.iter().map(|(t, w)| (t.as_str(), *w)))?;
    tracing::debug!(fund = %symbol, %field, holdings = weights.len(), "fetched weight map");
    Ok(FundHoldings { symbol, weights })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

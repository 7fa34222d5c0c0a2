use napi::Result as NapiResult;
use napi_derive::napi;

use etf_blend_core::approximation::engine::{
    approximate_request, universe_request, ApproximationRequest,
};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_request(input_json: &str) -> NapiResult<ApproximationRequest> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

/// Solve one approximation request; returns the JSON output envelope.
#[napi]
pub fn approximate_etf(request_json: String) -> NapiResult<String> {
    let request = parse_request(&request_json)?;
    let output = approximate_request(&request).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Resolve the symbol universe for a request without solving.
#[napi]
pub fn resolve_symbol_universe(request_json: String) -> NapiResult<String> {
    let request = parse_request(&request_json)?;
    let output = universe_request(&request).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

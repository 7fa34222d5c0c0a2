use serde_json::Value;

use etf_blend_core::approximation::engine::universe_request;

use super::approximate::{build_request, ApproximateArgs};

pub fn run_universe(args: ApproximateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = build_request(&args)?;
    let output = universe_request(&request)?;
    Ok(serde_json::to_value(output)?)
}

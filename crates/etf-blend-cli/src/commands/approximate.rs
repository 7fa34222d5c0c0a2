use clap::{Args, ValueEnum};
use serde_json::Value;

use etf_blend_core::approximation::engine::{approximate_request, ApproximationRequest};
use etf_blend_core::{EngineConfig, SolverMethod, WeightField};

use crate::input;

/// Where the request comes from, plus overrides applied on top of it.
#[derive(Args)]
pub struct ApproximateArgs {
    /// Path to a JSON request ({targetEtf, baselineEtfs, holdings, config})
    #[arg(long, conflicts_with = "holdings")]
    pub input: Option<String>,

    /// Holdings file (.csv or .json rows of etf_symbol, stock_symbol, weight, actual_weight)
    #[arg(long)]
    pub holdings: Option<String>,

    /// Target ETF symbol (with --holdings)
    #[arg(long)]
    pub target: Option<String>,

    /// Baseline ETF symbol; repeat or comma-separate (with --holdings)
    #[arg(long = "baseline", value_delimiter = ',')]
    pub baselines: Vec<String>,

    /// Engine config file (.yaml, .yml or .json)
    #[arg(long)]
    pub config: Option<String>,

    /// Holdings column to read weights from
    #[arg(long)]
    pub weight_field: Option<WeightFieldArg>,

    /// Solver iteration budget
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Starting weights, one per baseline (e.g. "0.5,0.3,0.2")
    #[arg(long, value_delimiter = ',')]
    pub initial_guess: Option<Vec<f64>>,

    /// Solver algorithm
    #[arg(long)]
    pub method: Option<MethodArg>,

    /// Fixture tickers to drop from the universe; repeat or comma-separate
    #[arg(long = "reserved", value_delimiter = ',')]
    pub reserved: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WeightFieldArg {
    Weight,
    ActualWeight,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MethodArg {
    ActiveSet,
    ProjectedGradient,
}

impl From<WeightFieldArg> for WeightField {
    fn from(arg: WeightFieldArg) -> Self {
        match arg {
            WeightFieldArg::Weight => WeightField::Weight,
            WeightFieldArg::ActualWeight => WeightField::ActualWeight,
        }
    }
}

impl From<MethodArg> for SolverMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::ActiveSet => SolverMethod::ActiveSet,
            MethodArg::ProjectedGradient => SolverMethod::ProjectedGradient,
        }
    }
}

pub fn run_approximate(args: ApproximateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = build_request(&args)?;
    let output = approximate_request(&request)?;
    Ok(serde_json::to_value(output)?)
}

/// Assemble the request from `--input`, `--holdings` or stdin, in that order.
pub fn build_request(args: &ApproximateArgs) -> Result<ApproximationRequest, Box<dyn std::error::Error>> {
    let mut request: ApproximationRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(ref path) = args.holdings {
        let target = args
            .target
            .clone()
            .ok_or("--target is required with --holdings")?;
        if args.baselines.is_empty() {
            return Err("at least one --baseline is required with --holdings".into());
        }
        ApproximationRequest {
            target_etf: target,
            baseline_etfs: args.baselines.clone(),
            holdings: input::holdings::read_holdings(path)?,
            config: EngineConfig::default(),
        }
    } else if let Some(request) = input::stdin::read_stdin()? {
        request
    } else {
        return Err("provide --input, --holdings with --target/--baseline, or a request on stdin".into());
    };

    if let Some(ref path) = args.config {
        request.config = input::config::read_config(path)?;
    }
    apply_overrides(&mut request.config, args);
    Ok(request)
}

fn apply_overrides(config: &mut EngineConfig, args: &ApproximateArgs) {
    if let Some(field) = args.weight_field {
        config.weight_field = field.into();
    }
    if let Some(max) = args.max_iterations {
        config.solver.max_iterations = max;
    }
    if let Some(ref guess) = args.initial_guess {
        config.initial_guess = Some(guess.clone());
    }
    if let Some(method) = args.method {
        config.solver.method = method.into();
    }
    if !args.reserved.is_empty() {
        config
            .reserved_symbols
            .extend(args.reserved.iter().map(|s| s.trim().to_uppercase()));
    }
}

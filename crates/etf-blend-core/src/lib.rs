pub mod approximation;
pub mod diagnostics;
pub mod error;
pub mod holdings;
pub mod types;

pub use approximation::config::{EngineConfig, SolverMethod, SolverOptions, Tolerance};
pub use approximation::engine::{
    approximate, approximate_request, universe_request, ApproximationRequest, UniverseReport,
};
pub use approximation::result::ApproximationResult;
pub use diagnostics::{Diagnostics, ValidationWarning};
pub use error::BlendError;
pub use holdings::provider::{HoldingRow, HoldingsTable, WeightField, WeightMapProvider};
pub use types::*;

/// Standard result type for all etf-blend operations
pub type BlendResult<T> = Result<T, BlendError>;

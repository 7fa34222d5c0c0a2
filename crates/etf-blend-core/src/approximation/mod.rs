pub mod config;
pub mod engine;
pub mod linalg;
pub mod matrix;
pub mod metrics;
pub mod polish;
pub mod problem;
pub mod result;
pub mod solver;

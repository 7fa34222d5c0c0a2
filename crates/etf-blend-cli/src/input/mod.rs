pub mod config;
pub mod file;
pub mod holdings;
pub mod stdin;

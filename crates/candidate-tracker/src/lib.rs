pub mod candidates;
pub mod config;
pub mod error;
pub mod export;
pub mod telemetry;

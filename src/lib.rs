pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod logging;
pub mod pipeline;

// Application use cases and the ports they depend on
pub mod app;
// Adapters for SQLite, CSV and the markdown changelog
pub mod infra;

pub mod observability;

// Observability: metrics and the tracing-backed diagnostic sink

pub mod metrics;
pub mod sink;

pub use sink::TracingSink;

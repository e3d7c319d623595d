//! HTTP middleware: request metrics and tracing spans.

pub mod metrics;
pub mod tracing_layer;

//! Observability for the Malim storefront: tracing subscriber setup with
//! optional OpenTelemetry export.

pub mod tracing_setup;

//! airmon: a six-stage air-quality monitoring pipeline.
//!
//! The root package hosts the cross-service integration suites under
//! `tests/integration/`.  The pipeline itself lives in the workspace
//! members:
//!
//! - `crates/aq-protocol` -- the uniform RPC surface every stage speaks
//! - `crates/aq-model` -- observation and enriched-record shapes
//! - `crates/aq-metrics` -- the labeled metric aggregator
//! - `services/{collector,ingestor,local-store,processor,aggregated-store,dashboard}`
//!
//! Data flows collector -> ingestor -> local store <- processor ->
//! aggregated store <- dashboard, where the processor pulls from the
//! local store and the dashboard pulls from the aggregated store.

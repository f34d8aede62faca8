//! Live telemetry ingestion and alert-log client.
//!
//! One [`TelemetryClient`] owns one logical streaming subscription for the
//! lifetime of the owning view. It decodes inbound frames, replaces the
//! current snapshot wholesale, maintains a bounded deduplicated alert feed,
//! and rides out link drops with exponential backoff while keeping the last
//! good snapshot visible as stale data.

pub mod backoff;
pub mod log;

mod client;
mod ingest;

pub use client::{validate_endpoint, TelemetryClient};
pub use ingest::{ClientEvent, LinkState};

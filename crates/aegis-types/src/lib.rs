//! Shared domain types for the AEGIS ground console.

pub mod alert;
pub mod config;
pub mod dispatch;
pub mod telemetry;

mod errors;

pub use errors::{AegisError, Result};

//! Command, scenario, and manual-control dispatch.
//!
//! Fire-and-forget request/response exchanges outside the streaming channel.
//! Dispatch failures never touch the telemetry link; callers surface them to
//! the operator's alert log instead of propagating them upward.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;

use aegis_types::{
    dispatch::{CommandAck, ControlAxes},
    AegisError, Result,
};

pub mod http;
pub mod manual;

pub use http::HttpDispatcher;
pub use manual::ManualControl;

/// Seam between the console and the command endpoints. Commands and
/// scenarios are open-ended by name; retries are safe because the backend
/// treats them idempotently.
#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    async fn issue_command(&self, name: &str) -> Result<CommandAck>;
    async fn inject_scenario(&self, name: &str) -> Result<CommandAck>;
    async fn send_axes(&self, axes: ControlAxes) -> Result<()>;
}

/// Generate an error aligned with dispatch semantics.
pub fn dispatch_error(message: impl Into<String>) -> AegisError {
    AegisError::Dispatch(message.into())
}

/// Helper to reject blank command/scenario names before any network call.
pub fn ensure_name_present(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        Err(dispatch_error("command name must not be empty"))
    } else {
        Ok(())
    }
}

/// Recording dispatcher used for integration and UI testing.
pub struct MockDispatcher {
    calls: Arc<Mutex<Vec<String>>>,
    failing: AtomicBool,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if self.failing.load(Ordering::SeqCst) {
            Err(dispatch_error("mock dispatcher configured to fail"))
        } else {
            Ok(())
        }
    }
}

impl Default for MockDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandDispatcher for MockDispatcher {
    async fn issue_command(&self, name: &str) -> Result<CommandAck> {
        ensure_name_present(name)?;
        self.record(format!("command:{name}"))?;
        Ok(CommandAck {
            status: "success".into(),
            command: name.into(),
            drone_state: None,
        })
    }

    async fn inject_scenario(&self, name: &str) -> Result<CommandAck> {
        ensure_name_present(name)?;
        self.record(format!("scenario:{name}"))?;
        Ok(CommandAck {
            status: "success".into(),
            command: name.into(),
            drone_state: None,
        })
    }

    async fn send_axes(&self, axes: ControlAxes) -> Result<()> {
        self.record(format!(
            "axes:{:.2},{:.2},{:.2},{:.2}",
            axes.left_vertical, axes.left_horizontal, axes.right_vertical, axes.right_horizontal
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        assert!(ensure_name_present("takeoff").is_ok());
        assert!(matches!(
            ensure_name_present("  "),
            Err(AegisError::Dispatch(_))
        ));
    }

    #[tokio::test]
    async fn mock_records_calls_in_order() {
        let mock = MockDispatcher::new();
        mock.issue_command("takeoff").await.expect("command");
        mock.inject_scenario("rescue").await.expect("scenario");
        assert_eq!(
            mock.recorded_calls(),
            vec!["command:takeoff".to_string(), "scenario:rescue".to_string()]
        );
    }

    #[tokio::test]
    async fn mock_failure_yields_dispatch_error() {
        let mock = MockDispatcher::new();
        mock.set_failing(true);
        let err = mock.issue_command("land").await.unwrap_err();
        assert!(matches!(err, AegisError::Dispatch(_)));
    }
}

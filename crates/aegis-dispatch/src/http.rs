use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use aegis_types::{
    config::DispatchConfig,
    dispatch::{CommandAck, ControlAxes},
    Result,
};

use crate::{dispatch_error, ensure_name_present, CommandDispatcher};

/// HTTP dispatcher for the backend's command, scenario, and manual-control
/// endpoints. Each call is one short-lived POST scoped to a single
/// request/response exchange.
pub struct HttpDispatcher {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDispatcher {
    pub fn new(config: &DispatchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|err| dispatch_error(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn post_ack(&self, path: &str) -> Result<CommandAck> {
        let url = format!("{}{}", self.base_url, path);
        debug!("dispatch POST {url}");
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|err| dispatch_error(format!("POST {url} failed: {err}")))?;

        if !response.status().is_success() {
            return Err(dispatch_error(format!(
                "POST {url} returned {}",
                response.status()
            )));
        }
        response
            .json::<CommandAck>()
            .await
            .map_err(|err| dispatch_error(format!("invalid acknowledgement from {url}: {err}")))
    }
}

#[async_trait]
impl CommandDispatcher for HttpDispatcher {
    async fn issue_command(&self, name: &str) -> Result<CommandAck> {
        ensure_name_present(name)?;
        self.post_ack(&format!("/command/{name}")).await
    }

    async fn inject_scenario(&self, name: &str) -> Result<CommandAck> {
        ensure_name_present(name)?;
        self.post_ack(&format!("/scenario/{name}")).await
    }

    async fn send_axes(&self, axes: ControlAxes) -> Result<()> {
        let url = format!("{}/control", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&axes.clamped())
            .send()
            .await
            .map_err(|err| dispatch_error(format!("POST {url} failed: {err}")))?;

        if !response.status().is_success() {
            return Err(dispatch_error(format!(
                "POST {url} returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_types::AegisError;

    fn config(base_url: &str) -> DispatchConfig {
        DispatchConfig {
            base_url: base_url.into(),
            request_timeout_ms: 200,
            manual_cadence_hz: 10.0,
        }
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let dispatcher = HttpDispatcher::new(&config("http://localhost:8000/")).expect("build");
        assert_eq!(dispatcher.base_url, "http://localhost:8000");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_dispatch_error() {
        // Port 1 is never listening; the failure must stay a local Dispatch
        // error, not a panic or a transport-state change.
        let dispatcher = HttpDispatcher::new(&config("http://127.0.0.1:1")).expect("build");
        let err = dispatcher.issue_command("takeoff").await.unwrap_err();
        assert!(matches!(err, AegisError::Dispatch(_)));

        let err = dispatcher.send_axes(ControlAxes::NEUTRAL).await.unwrap_err();
        assert!(matches!(err, AegisError::Dispatch(_)));
    }
}

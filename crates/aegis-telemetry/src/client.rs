use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use aegis_types::{
    alert::{AlertEntry, AlertSource},
    config::LinkConfig,
    telemetry::TelemetrySnapshot,
    AegisError, Result,
};
use futures::{stream::BoxStream, StreamExt};
use tokio::{sync::broadcast, task::JoinHandle};
use tokio_stream::wrappers::BroadcastStream;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{info, warn};

use crate::{
    backoff::Backoff,
    ingest::{ClientCore, ClientEvent, LinkState},
};

const ALERT_LINK_UP: &str = "Telemetry link established.";
const ALERT_LINK_ERROR: &str = "Telemetry link error. Attempting to re-establish.";
const ALERT_LINK_CLOSED: &str = "Telemetry link closed by remote. Re-establishing.";
const ALERT_LINK_UNREACHABLE: &str = "Telemetry link unreachable. Retrying.";
const ALERT_INITIALIZED: &str = "System initialized. Awaiting telemetry.";
const ALERT_REINITIALIZED: &str = "System reinitialized. Awaiting telemetry.";

const EVENT_CHANNEL_CAPACITY: usize = 256;

struct Session {
    handle: Option<JoinHandle<()>>,
    started_once: bool,
}

/// Owns one logical streaming subscription to the telemetry source.
///
/// At most one live transport exists per instance: a single tokio task drives
/// connect, read, and reconnect-with-backoff, and every reconnection attempt
/// supersedes the previous one inside that task. All state lives behind one
/// lock, so each frame's full update sequence is applied atomically and
/// nothing mutates state after [`TelemetryClient::stop`].
pub struct TelemetryClient {
    core: Arc<Mutex<ClientCore>>,
    events: broadcast::Sender<ClientEvent>,
    config: LinkConfig,
    session: Mutex<Session>,
}

impl TelemetryClient {
    pub fn new(config: LinkConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            core: Arc::new(Mutex::new(ClientCore::new(
                config.alert_log_capacity,
                events.clone(),
            ))),
            events,
            config,
            session: Mutex::new(Session {
                handle: None,
                started_once: false,
            }),
        }
    }

    /// Establishes the streaming connection. Idempotent per instance: a call
    /// while already connecting or connected is a no-op. A malformed endpoint
    /// fails fast with a configuration error and does not touch link state.
    pub fn start(&self, endpoint: &str) -> Result<()> {
        validate_endpoint(endpoint)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| AegisError::Ops("telemetry session lock poisoned".into()))?;

        let already_live = session.handle.is_some()
            && self
                .core
                .lock()
                .map(|core| !core.is_closed())
                .unwrap_or(false);
        if already_live {
            return Ok(());
        }

        let notice = if session.started_once {
            ALERT_REINITIALIZED
        } else {
            ALERT_INITIALIZED
        };
        if let Ok(mut core) = self.core.lock() {
            core.reopen();
            core.push_alert(AlertSource::System, notice);
        }

        info!("starting telemetry link to {endpoint}");
        let core = self.core.clone();
        let endpoint = endpoint.to_string();
        let initial = Duration::from_millis(self.config.backoff_initial_ms);
        let max = Duration::from_millis(self.config.backoff_max_ms);
        session.handle = Some(tokio::spawn(run_link(core, endpoint, initial, max)));
        session.started_once = true;
        Ok(())
    }

    /// Tears the connection down. Safe to call repeatedly and before any
    /// `start`; the core is marked closed before the transport task is
    /// aborted, so a late in-flight event cannot mutate state.
    pub fn stop(&self) {
        let handle = self
            .session
            .lock()
            .ok()
            .and_then(|mut session| session.handle.take());

        if let Ok(mut core) = self.core.lock() {
            core.close(self.config.clear_log_on_stop);
        }
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// Registers an observer invoked synchronously for every valid inbound
    /// frame, in arrival order, after the snapshot has been replaced.
    pub fn on_snapshot(&self, observer: impl Fn(&TelemetrySnapshot) + Send + 'static) {
        if let Ok(mut core) = self.core.lock() {
            core.add_snapshot_observer(Box::new(observer));
        }
    }

    /// Registers an observer invoked only when the alert log's contents
    /// actually change, receiving the full newest-first contents.
    pub fn on_alert_log_changed(&self, observer: impl Fn(&[AlertEntry]) + Send + 'static) {
        if let Ok(mut core) = self.core.lock() {
            core.add_log_observer(Box::new(observer));
        }
    }

    /// Registers an observer for dropped undecodable frames.
    pub fn on_decode_error(&self, observer: impl Fn(&str) + Send + 'static) {
        if let Ok(mut core) = self.core.lock() {
            core.add_decode_observer(Box::new(observer));
        }
    }

    /// Event stream for the rendering layer, backed by a broadcast channel.
    pub fn subscribe(&self) -> BoxStream<'static, ClientEvent> {
        BroadcastStream::new(self.events.subscribe())
            .filter_map(|event| async move { event.ok() })
            .boxed()
    }

    /// Latest decoded snapshot. `None` only before the first valid frame or
    /// after teardown; transient disconnects keep the stale value visible.
    pub fn snapshot(&self) -> Option<TelemetrySnapshot> {
        self.core.lock().map(|core| core.snapshot()).unwrap_or(None)
    }

    /// Newest-first contents of the alert log.
    pub fn alert_log(&self) -> Vec<AlertEntry> {
        self.core
            .lock()
            .map(|core| core.alert_log())
            .unwrap_or_default()
    }

    pub fn link_state(&self) -> LinkState {
        self.core
            .lock()
            .map(|core| core.link())
            .unwrap_or(LinkState::Disconnected)
    }

    /// Local alert synthesis for collaborators: dispatch failures and
    /// operator notices join the same deduplicated, bounded feed.
    pub fn push_local_alert(&self, message: &str) {
        if let Ok(mut core) = self.core.lock() {
            core.push_alert(AlertSource::System, message);
        }
    }
}

impl Drop for TelemetryClient {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Checks that an endpoint is a plausible streaming-transport address
/// (`ws://` or `wss://` with a host). Used by `start()` and by the console's
/// `check` subcommand.
pub fn validate_endpoint(endpoint: &str) -> Result<()> {
    let rest = endpoint
        .strip_prefix("ws://")
        .or_else(|| endpoint.strip_prefix("wss://"))
        .ok_or_else(|| {
            AegisError::Configuration(format!(
                "telemetry endpoint must use ws:// or wss://, got '{endpoint}'"
            ))
        })?;
    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(AegisError::Configuration(format!(
            "telemetry endpoint '{endpoint}' is missing a host"
        )));
    }
    Ok(())
}

async fn run_link(
    core: Arc<Mutex<ClientCore>>,
    endpoint: String,
    backoff_initial: Duration,
    backoff_max: Duration,
) {
    let mut backoff = Backoff::new(backoff_initial, backoff_max);

    loop {
        match connect_async(endpoint.as_str()).await {
            Ok((mut stream, _)) => {
                backoff.reset();
                if let Ok(mut core) = core.lock() {
                    core.transition(LinkState::Connected, Some(ALERT_LINK_UP));
                }

                loop {
                    match stream.next().await {
                        Some(Ok(Message::Text(text))) => {
                            if let Ok(mut core) = core.lock() {
                                core.ingest_frame(text.as_bytes());
                            }
                        }
                        Some(Ok(Message::Binary(bytes))) => {
                            if let Ok(mut core) = core.lock() {
                                core.ingest_frame(&bytes);
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            warn!("telemetry stream closed by remote");
                            if let Ok(mut core) = core.lock() {
                                core.transition(LinkState::Reconnecting, Some(ALERT_LINK_CLOSED));
                            }
                            break;
                        }
                        // Keepalive frames carry no telemetry.
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            warn!("telemetry stream error: {err}");
                            if let Ok(mut core) = core.lock() {
                                core.transition(LinkState::Reconnecting, Some(ALERT_LINK_ERROR));
                            }
                            break;
                        }
                    }
                }
            }
            Err(err) => {
                warn!("telemetry connect to {endpoint} failed: {err}");
                if let Ok(mut core) = core.lock() {
                    core.transition(LinkState::Reconnecting, Some(ALERT_LINK_UNREACHABLE));
                }
            }
        }

        if core.lock().map(|core| core.is_closed()).unwrap_or(true) {
            return;
        }
        tokio::time::sleep(backoff.next_delay()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link_config() -> LinkConfig {
        LinkConfig {
            telemetry_url: "ws://127.0.0.1:1/ws/telemetry".into(),
            alert_log_capacity: 15,
            clear_log_on_stop: false,
            backoff_initial_ms: 50,
            backoff_max_ms: 200,
        }
    }

    #[test]
    fn endpoint_validation_requires_websocket_scheme_and_host() {
        assert!(validate_endpoint("ws://localhost:8000/ws/telemetry").is_ok());
        assert!(validate_endpoint("wss://console.example/ws").is_ok());
        assert!(matches!(
            validate_endpoint("http://localhost:8000/ws"),
            Err(AegisError::Configuration(_))
        ));
        assert!(matches!(
            validate_endpoint("ws:///ws/telemetry"),
            Err(AegisError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn malformed_endpoint_fails_fast_without_state_change() {
        let client = TelemetryClient::new(link_config());
        let err = client.start("http://not-a-stream").unwrap_err();
        assert!(matches!(err, AegisError::Configuration(_)));
        assert_eq!(client.link_state(), LinkState::Disconnected);
        assert!(client.alert_log().is_empty());
    }

    #[tokio::test]
    async fn start_is_idempotent_while_live() {
        let client = TelemetryClient::new(link_config());
        client.start("ws://127.0.0.1:1/ws/telemetry").expect("start");
        client
            .start("ws://127.0.0.1:1/ws/telemetry")
            .expect("second start is a no-op");

        // Only one initialization notice despite two start calls.
        let notices = client
            .alert_log()
            .iter()
            .filter(|e| e.message.contains("initialized"))
            .count();
        assert_eq!(notices, 1);
        client.stop();
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_safe_before_start() {
        let client = TelemetryClient::new(link_config());
        client.stop();
        client.stop();
        assert_eq!(client.link_state(), LinkState::Disconnected);

        client.start("ws://127.0.0.1:1/ws/telemetry").expect("start");
        client.stop();
        client.stop();
        assert_eq!(client.link_state(), LinkState::Disconnected);
        assert!(client.snapshot().is_none());
    }

    #[tokio::test]
    async fn restart_synthesizes_a_reinitialized_notice() {
        let client = TelemetryClient::new(link_config());
        client.start("ws://127.0.0.1:1/ws/telemetry").expect("start");
        client.stop();
        client
            .start("ws://127.0.0.1:1/ws/telemetry")
            .expect("restart");

        let log = client.alert_log();
        assert_eq!(log[0].message, ALERT_REINITIALIZED);
        // History from before the restart is retained by default.
        assert!(log.iter().any(|e| e.message == ALERT_INITIALIZED));
        client.stop();
    }

    #[tokio::test]
    async fn clear_log_on_stop_erases_history() {
        let mut config = link_config();
        config.clear_log_on_stop = true;
        let client = TelemetryClient::new(config);
        client.start("ws://127.0.0.1:1/ws/telemetry").expect("start");
        client.push_local_alert("Command not transmitted: takeoff");
        client.stop();
        assert!(client.alert_log().is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_log_changes_as_events() {
        let client = TelemetryClient::new(link_config());
        let mut events = client.subscribe();
        client.push_local_alert("Scenario rescue armed.");

        match events.next().await {
            Some(ClientEvent::AlertLog(entries)) => {
                assert_eq!(entries[0].message, "Scenario rescue armed.");
            }
            other => panic!("expected an alert-log event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn local_alerts_share_the_dedupe_pipeline() {
        let client = TelemetryClient::new(link_config());
        client.start("ws://127.0.0.1:1/ws/telemetry").expect("start");
        client.push_local_alert("Command not transmitted: takeoff");
        client.push_local_alert("Command not transmitted: takeoff");

        let repeats = client
            .alert_log()
            .iter()
            .filter(|e| e.message.starts_with("Command not transmitted"))
            .count();
        assert_eq!(repeats, 1);
        client.stop();
    }
}

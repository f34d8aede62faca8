use aegis_types::{
    alert::{AlertEntry, AlertSource},
    telemetry::TelemetrySnapshot,
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::log::AlertLog;

/// Connection-health states of the telemetry link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Events published to stream subscribers (the rendering layer).
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A valid frame arrived and the snapshot was replaced.
    Snapshot(TelemetrySnapshot),
    /// The alert log's contents changed (new entry admitted or log reset).
    AlertLog(Vec<AlertEntry>),
    /// The link transitioned between health states.
    Link(LinkState),
    /// An inbound frame failed to decode and was dropped; the link stays up.
    DecodeFailed(String),
}

pub(crate) type SnapshotObserver = Box<dyn Fn(&TelemetrySnapshot) + Send>;
pub(crate) type AlertLogObserver = Box<dyn Fn(&[AlertEntry]) + Send>;
pub(crate) type DecodeErrorObserver = Box<dyn Fn(&str) + Send>;

/// Owned client state. Every mutation happens under the client's single lock,
/// so one frame's decode -> replace -> log -> notify sequence is atomic with
/// respect to other frame arrivals and to teardown.
pub(crate) struct ClientCore {
    snapshot: Option<TelemetrySnapshot>,
    log: AlertLog,
    link: LinkState,
    closed: bool,
    snapshot_observers: Vec<SnapshotObserver>,
    log_observers: Vec<AlertLogObserver>,
    decode_observers: Vec<DecodeErrorObserver>,
    events: broadcast::Sender<ClientEvent>,
}

impl ClientCore {
    pub(crate) fn new(capacity: usize, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            snapshot: None,
            log: AlertLog::new(capacity),
            link: LinkState::Disconnected,
            closed: false,
            snapshot_observers: Vec::new(),
            log_observers: Vec::new(),
            decode_observers: Vec::new(),
            events,
        }
    }

    pub(crate) fn snapshot(&self) -> Option<TelemetrySnapshot> {
        self.snapshot.clone()
    }

    pub(crate) fn alert_log(&self) -> Vec<AlertEntry> {
        self.log.to_vec()
    }

    pub(crate) fn link(&self) -> LinkState {
        self.link
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn add_snapshot_observer(&mut self, observer: SnapshotObserver) {
        self.snapshot_observers.push(observer);
    }

    pub(crate) fn add_log_observer(&mut self, observer: AlertLogObserver) {
        self.log_observers.push(observer);
    }

    pub(crate) fn add_decode_observer(&mut self, observer: DecodeErrorObserver) {
        self.decode_observers.push(observer);
    }

    /// Applies one inbound frame. Malformed payloads are dropped without
    /// touching snapshot, log, or link state; they only surface a transient
    /// decode-error event.
    pub(crate) fn ingest_frame(&mut self, payload: &[u8]) {
        if self.closed {
            return;
        }
        let frame: TelemetrySnapshot = match serde_json::from_slice(payload) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("dropping undecodable telemetry frame: {err}");
                let message = err.to_string();
                for observer in &self.decode_observers {
                    observer(&message);
                }
                let _ = self.events.send(ClientEvent::DecodeFailed(message));
                return;
            }
        };

        let alert = frame
            .status
            .ai_alert
            .clone()
            .filter(|message| !message.is_empty());

        self.snapshot = Some(frame);

        let mut log_changed = false;
        if let Some(message) = alert {
            log_changed = self.log.push(AlertSource::Ai, message);
        }

        if let Some(current) = self.snapshot.as_ref() {
            for observer in &self.snapshot_observers {
                observer(current);
            }
            let _ = self.events.send(ClientEvent::Snapshot(current.clone()));
        }
        if log_changed {
            self.notify_log_changed();
        }
    }

    fn notify_log_changed(&self) {
        let entries = self.log.to_vec();
        for observer in &self.log_observers {
            observer(&entries);
        }
        let _ = self.events.send(ClientEvent::AlertLog(entries));
    }

    /// Synthesizes a local alert entry (link transitions, dispatch failures,
    /// operator notices). Shares the dedupe and bounding pipeline with AI
    /// alerts. Returns whether the log changed.
    pub(crate) fn push_alert(&mut self, source: AlertSource, message: &str) -> bool {
        if self.closed {
            return false;
        }
        if self.log.push(source, message) {
            self.notify_log_changed();
            true
        } else {
            false
        }
    }

    /// Moves the link state machine, optionally synthesizing an alert for
    /// the operator. The stale snapshot is deliberately retained across
    /// Reconnecting so the console keeps showing the last known data.
    pub(crate) fn transition(&mut self, link: LinkState, alert: Option<&str>) {
        if self.closed {
            return;
        }
        if self.link != link {
            debug!("telemetry link: {:?} -> {:?}", self.link, link);
            self.link = link;
            let _ = self.events.send(ClientEvent::Link(link));
        }
        if let Some(message) = alert {
            self.push_alert(AlertSource::System, message);
        }
    }

    /// Re-arms a previously stopped core for a fresh `start()`.
    pub(crate) fn reopen(&mut self) {
        self.closed = false;
        self.transition(LinkState::Connecting, None);
    }

    /// Terminal teardown: after this, any late transport event is a no-op.
    /// The snapshot is cleared; the alert log survives unless configured
    /// otherwise.
    pub(crate) fn close(&mut self, clear_log: bool) {
        if self.closed && self.link == LinkState::Disconnected {
            return;
        }
        self.closed = true;
        self.snapshot = None;
        if clear_log {
            self.log.clear();
        }
        if self.link != LinkState::Disconnected {
            self.link = LinkState::Disconnected;
            let _ = self.events.send(ClientEvent::Link(LinkState::Disconnected));
        }
    }
}

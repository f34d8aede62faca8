use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One frame of the telemetry stream. Always replaced wholesale; a snapshot
/// is never patched field-by-field from an earlier frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub position: Position,
    #[serde(default)]
    pub targets: Vec<Target>,
    pub status: DroneStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneStatus {
    pub battery: f64,
    pub signal: f64,
    #[serde(default)]
    pub altitude: f64,
    pub velocity: f64,
    #[serde(default)]
    pub mission_time: f64,
    pub state: DroneState,
    #[serde(default)]
    pub health: HashMap<String, String>,
    #[serde(default)]
    pub ai_alert: Option<String>,
}

/// Discrete flight-state tag reported by the vehicle. Unrecognized tags map
/// to `Unknown` so a newer backend never breaks frame decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DroneState {
    Idle,
    Flying,
    Landed,
    Returning,
    Emergency,
    #[serde(other)]
    Unknown,
}

/// A detection reported by the vehicle's sensor suite. Target ids are stable
/// across frames for a given physical detection; y is ground-relative and
/// omitted on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: i64,
    pub x: f64,
    pub z: f64,
    pub detected: bool,
    #[serde(default)]
    pub priority: TargetPriority,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetPriority {
    #[default]
    Normal,
    Critical,
}

use serde::{Deserialize, Serialize};

/// Four-axis manual control vector, each axis in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlAxes {
    pub left_vertical: f64,
    pub left_horizontal: f64,
    pub right_vertical: f64,
    pub right_horizontal: f64,
}

impl ControlAxes {
    pub const NEUTRAL: ControlAxes = ControlAxes {
        left_vertical: 0.0,
        left_horizontal: 0.0,
        right_vertical: 0.0,
        right_horizontal: 0.0,
    };

    /// Returns a copy with every axis clamped into [-1, 1]. NaN collapses to
    /// neutral rather than poisoning the control stream.
    pub fn clamped(self) -> Self {
        fn clamp(v: f64) -> f64 {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(-1.0, 1.0)
            }
        }
        Self {
            left_vertical: clamp(self.left_vertical),
            left_horizontal: clamp(self.left_horizontal),
            right_vertical: clamp(self.right_vertical),
            right_horizontal: clamp(self.right_horizontal),
        }
    }
}

/// Acknowledgement returned by the command and scenario endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandAck {
    pub status: String,
    pub command: String,
    #[serde(default)]
    pub drone_state: Option<String>,
}

/// Discrete commands the console knows keybindings for. The dispatch
/// interface itself is open-ended by name.
pub const KNOWN_COMMANDS: [&str; 6] = ["takeoff", "land", "rtl", "scan", "mission", "emergency"];

/// Scenario injections understood by the simulation backend.
pub const KNOWN_SCENARIOS: [&str; 4] = ["rescue", "emergency", "mapping", "reset"];

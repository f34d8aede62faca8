use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{AegisError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub telemetry_url: String,
    #[serde(default = "default_alert_log_capacity")]
    pub alert_log_capacity: usize,
    #[serde(default)]
    pub clear_log_on_stop: bool,
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_manual_cadence_hz")]
    pub manual_cadence_hz: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AegisConfig {
    pub link: LinkConfig,
    pub dispatch: DispatchConfig,
    pub ops: OpsConfig,
}

fn default_alert_log_capacity() -> usize {
    15
}

fn default_backoff_initial_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    15_000
}

fn default_request_timeout_ms() -> u64 {
    3_000
}

fn default_manual_cadence_hz() -> f64 {
    10.0
}

impl AegisConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            AegisError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            AegisError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.link.telemetry_url.is_empty() {
            return Err(AegisError::Configuration(
                "link.telemetry_url must not be empty".into(),
            ));
        }
        if self.link.alert_log_capacity == 0 {
            return Err(AegisError::Configuration(
                "link.alert_log_capacity must be greater than zero".into(),
            ));
        }
        if self.link.backoff_initial_ms == 0 {
            return Err(AegisError::Configuration(
                "link.backoff_initial_ms must be greater than zero".into(),
            ));
        }
        if self.link.backoff_max_ms < self.link.backoff_initial_ms {
            return Err(AegisError::Configuration(
                "link.backoff_max_ms must not be below link.backoff_initial_ms".into(),
            ));
        }
        if self.dispatch.base_url.is_empty() {
            return Err(AegisError::Configuration(
                "dispatch.base_url must not be empty".into(),
            ));
        }
        if !(self.dispatch.manual_cadence_hz > 0.0 && self.dispatch.manual_cadence_hz <= 60.0) {
            return Err(AegisError::Configuration(
                "dispatch.manual_cadence_hz must be within (0, 60]".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample_config() -> AegisConfig {
        AegisConfig {
            link: LinkConfig {
                telemetry_url: "ws://127.0.0.1:8000/ws/telemetry".into(),
                alert_log_capacity: 15,
                clear_log_on_stop: false,
                backoff_initial_ms: 500,
                backoff_max_ms: 15_000,
            },
            dispatch: DispatchConfig {
                base_url: "http://127.0.0.1:8000".into(),
                request_timeout_ms: 3_000,
                manual_cadence_hz: 10.0,
            },
            ops: OpsConfig {
                log_level: "debug".into(),
            },
        }
    }

    #[test]
    fn load_aegis_config_from_file() {
        let temp_path = std::env::temp_dir().join("aegis-config-test.toml");
        let config = sample_config();

        let doc = toml::to_string(&config).expect("serialize config");
        fs::write(&temp_path, doc).expect("write temp config");

        let loaded = AegisConfig::from_file(&temp_path).expect("load config");
        assert_eq!(loaded.link.telemetry_url, config.link.telemetry_url);
        assert_eq!(loaded.link.alert_log_capacity, 15);
        assert_eq!(loaded.dispatch.manual_cadence_hz, 10.0);
        fs::remove_file(&temp_path).expect("cleanup temp config");
    }

    #[test]
    fn defaults_fill_omitted_fields() {
        let doc = r#"
            [link]
            telemetry_url = "ws://localhost:8000/ws/telemetry"

            [dispatch]
            base_url = "http://localhost:8000"

            [ops]
            log_level = "info"
        "#;
        let config: AegisConfig = toml::from_str(doc).expect("parse config");
        assert_eq!(config.link.alert_log_capacity, 15);
        assert!(!config.link.clear_log_on_stop);
        assert_eq!(config.link.backoff_initial_ms, 500);
        assert_eq!(config.link.backoff_max_ms, 15_000);
        assert_eq!(config.dispatch.request_timeout_ms, 3_000);
    }

    #[test]
    fn validate_configuration_rules() {
        let mut config = sample_config();
        assert!(config.validate().is_ok());

        config.link.telemetry_url.clear();
        assert!(config.validate().is_err());
        config.link.telemetry_url = "ws://localhost:8000/ws/telemetry".into();

        config.link.alert_log_capacity = 0;
        assert!(config.validate().is_err());
        config.link.alert_log_capacity = 15;

        config.link.backoff_max_ms = 100;
        assert!(config.validate().is_err());
        config.link.backoff_max_ms = 15_000;

        config.dispatch.manual_cadence_hz = 0.0;
        assert!(config.validate().is_err());
        config.dispatch.manual_cadence_hz = 120.0;
        assert!(config.validate().is_err());
        config.dispatch.manual_cadence_hz = 10.0;

        assert!(config.validate().is_ok());
    }
}

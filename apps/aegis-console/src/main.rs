mod ui;

use std::sync::{mpsc, Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing::info;

use aegis_dispatch::{CommandDispatcher, HttpDispatcher, ManualControl};
use aegis_telemetry::TelemetryClient;
use aegis_types::{
    config::{AegisConfig, DispatchConfig, LinkConfig, OpsConfig},
    dispatch::{KNOWN_COMMANDS, KNOWN_SCENARIOS},
};

use crate::ui::{ConsoleActions, UiMessage};

#[derive(Debug, Parser)]
#[command(name = "aegis-console", version, about = "AEGIS UAV ground console")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "configs/dev.toml")]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the operator HUD.
    Run,
    /// Issue one named command and print the acknowledgement.
    Command { name: String },
    /// Inject one named scenario into the telemetry source.
    Scenario { name: String },
    /// Validate the configuration and endpoint shapes.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config);
    aegis_ops::init_tracing(&config.ops)?;

    match cli.cmd {
        Command::Run => run(&config).await,
        Command::Command { name } => one_shot(&config, OneShot::Command, &name).await,
        Command::Scenario { name } => one_shot(&config, OneShot::Scenario, &name).await,
        Command::Check => check(&config),
    }
}

async fn run(config: &AegisConfig) -> Result<()> {
    config.validate()?;

    let client = Arc::new(TelemetryClient::new(config.link.clone()));
    let dispatcher: Arc<dyn CommandDispatcher> = Arc::new(HttpDispatcher::new(&config.dispatch)?);
    let manual = {
        let alerts = client.clone();
        Arc::new(ManualControl::new(
            dispatcher.clone(),
            config.dispatch.manual_cadence_hz,
            move |message| alerts.push_local_alert(message),
        ))
    };

    client.start(&config.link.telemetry_url)?;

    // Bridge the async event stream into the blocking TUI loop.
    let (tx, rx) = mpsc::channel();
    let mut events = client.subscribe();
    let bridge = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if tx.send(UiMessage::Event(event)).is_err() {
                return;
            }
        }
        let _ = tx.send(UiMessage::Shutdown);
    });

    let actions = ConsoleActions::new(
        tokio::runtime::Handle::current(),
        client.clone(),
        dispatcher,
        manual.clone(),
    );
    let summary = format!(
        "{} | {}",
        config.link.telemetry_url, config.dispatch.base_url
    );
    let result = tokio::task::spawn_blocking(move || ui::run(rx, actions, summary)).await?;

    bridge.abort();
    manual.disengage();
    client.stop();
    info!("console shut down");
    result
}

enum OneShot {
    Command,
    Scenario,
}

async fn one_shot(config: &AegisConfig, kind: OneShot, name: &str) -> Result<()> {
    config.validate()?;
    let known: &[&str] = match kind {
        OneShot::Command => &KNOWN_COMMANDS,
        OneShot::Scenario => &KNOWN_SCENARIOS,
    };
    if !known.contains(&name) {
        // The endpoints are open-ended by name; unknown names still go out.
        info!("'{name}' is not in the known set {known:?}; dispatching anyway");
    }
    let dispatcher = HttpDispatcher::new(&config.dispatch)?;
    let ack = match kind {
        OneShot::Command => dispatcher.issue_command(name).await?,
        OneShot::Scenario => dispatcher.inject_scenario(name).await?,
    };
    println!(
        "{} -> {} (vehicle state: {})",
        ack.command,
        ack.status,
        ack.drone_state.unwrap_or_else(|| "n/a".into())
    );
    Ok(())
}

fn check(config: &AegisConfig) -> Result<()> {
    config.validate()?;
    aegis_telemetry::validate_endpoint(&config.link.telemetry_url)?;
    anyhow::ensure!(
        config.dispatch.base_url.starts_with("http://")
            || config.dispatch.base_url.starts_with("https://"),
        "dispatch.base_url must use http:// or https://"
    );
    info!("check: OK");
    Ok(())
}

fn load_config(path: &str) -> AegisConfig {
    match AegisConfig::from_file(path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!("Invalid config in '{path}': {err}. Falling back to internal defaults.");
                default_config()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!("Failed to load config from '{path}': {err}. Falling back to internal defaults.");
            default_config()
        }
    }
}

fn default_config() -> AegisConfig {
    let config = AegisConfig {
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
            log_level: "info".into(),
        },
    };
    debug_assert!(config.validate().is_ok());
    config
}

use std::{
    sync::{
        mpsc::{Receiver, TryRecvError},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;
use crossterm::{
    event::{self, Event as CEvent, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Terminal,
};

use aegis_dispatch::{CommandDispatcher, ManualControl};
use aegis_telemetry::{ClientEvent, LinkState, TelemetryClient};
use aegis_types::{
    alert::{AlertEntry, AlertSource},
    dispatch::ControlAxes,
    telemetry::{DroneState, TargetPriority, TelemetrySnapshot},
};

pub enum UiMessage {
    Event(ClientEvent),
    Shutdown,
}

/// Bridges operator gestures back into the async world. Command and scenario
/// dispatch is fire-and-forget: acknowledgements and failures both land in
/// the alert feed, never in the render loop.
pub struct ConsoleActions {
    handle: tokio::runtime::Handle,
    client: Arc<TelemetryClient>,
    dispatcher: Arc<dyn CommandDispatcher>,
    manual: Arc<ManualControl>,
}

impl ConsoleActions {
    pub fn new(
        handle: tokio::runtime::Handle,
        client: Arc<TelemetryClient>,
        dispatcher: Arc<dyn CommandDispatcher>,
        manual: Arc<ManualControl>,
    ) -> Self {
        Self {
            handle,
            client,
            dispatcher,
            manual,
        }
    }

    fn issue_command(&self, name: &'static str) {
        let dispatcher = self.dispatcher.clone();
        let client = self.client.clone();
        self.handle.spawn(async move {
            match dispatcher.issue_command(name).await {
                Ok(ack) => {
                    client.push_local_alert(&format!("Command {} acknowledged.", ack.command))
                }
                Err(err) => client.push_local_alert(&format!("Command not transmitted: {err}")),
            }
        });
    }

    fn inject_scenario(&self, name: &'static str) {
        let dispatcher = self.dispatcher.clone();
        let client = self.client.clone();
        self.handle.spawn(async move {
            match dispatcher.inject_scenario(name).await {
                Ok(ack) => client.push_local_alert(&format!("Scenario {} injected.", ack.command)),
                Err(err) => client.push_local_alert(&format!("Scenario not transmitted: {err}")),
            }
        });
    }

    /// Returns whether manual mode is engaged after the toggle.
    fn toggle_manual(&self) -> bool {
        if self.manual.is_engaged() {
            self.manual.disengage();
            self.manual.set_axes(ControlAxes::NEUTRAL);
            self.client.push_local_alert("Manual control disengaged.");
            false
        } else {
            self.manual.engage();
            self.client.push_local_alert("Manual control engaged.");
            true
        }
    }

    fn set_axes(&self, axes: ControlAxes) {
        self.manual.set_axes(axes);
    }

    fn seed(&self) -> (Option<TelemetrySnapshot>, Vec<AlertEntry>, LinkState) {
        (
            self.client.snapshot(),
            self.client.alert_log(),
            self.client.link_state(),
        )
    }
}

pub fn run(receiver: Receiver<UiMessage>, actions: ConsoleActions, summary: String) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let res = run_loop(&mut terminal, receiver, &actions, summary.as_str());

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    res
}

const AXIS_STEP: f64 = 0.1;

fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    receiver: Receiver<UiMessage>,
    actions: &ConsoleActions,
    summary: &str,
) -> Result<()> {
    // The broadcast stream does not replay, so seed from the accessors.
    let (mut snapshot, mut alerts, mut link) = actions.seed();
    let mut manual_engaged = false;
    let mut axes = ControlAxes::NEUTRAL;
    let mut decode_failures: u64 = 0;
    let mut should_close = false;

    loop {
        loop {
            match receiver.try_recv() {
                Ok(UiMessage::Event(event)) => match event {
                    ClientEvent::Snapshot(snap) => snapshot = Some(snap),
                    ClientEvent::AlertLog(entries) => alerts = entries,
                    ClientEvent::Link(state) => link = state,
                    ClientEvent::DecodeFailed(_) => decode_failures += 1,
                },
                Ok(UiMessage::Shutdown) => should_close = true,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    should_close = true;
                    break;
                }
            }
        }

        terminal.draw(|f| {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Min(0),
                        Constraint::Length(3),
                    ]
                    .as_ref(),
                )
                .split(f.size());

            let (link_label, link_color) = link_style(link);
            let header = Paragraph::new(Line::from(vec![
                Span::styled(
                    "AEGIS UAV CONSOLE",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  link: "),
                Span::styled(link_label, Style::default().fg(link_color)),
                Span::raw("  "),
                Span::raw(summary),
            ]))
            .block(Block::default().borders(Borders::ALL).title("Mission"));
            f.render_widget(header, rows[0]);

            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(42), Constraint::Percentage(58)].as_ref())
                .split(rows[1]);

            let left = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(11), Constraint::Min(0)].as_ref())
                .split(columns[0]);

            let status = Paragraph::new(status_lines(snapshot.as_ref(), manual_engaged, axes))
                .block(Block::default().borders(Borders::ALL).title("Telemetry"));
            f.render_widget(status, left[0]);

            let targets: Vec<ListItem> = snapshot
                .as_ref()
                .map(|snap| snap.targets.iter().map(target_item).collect())
                .unwrap_or_default();
            let target_list = List::new(targets)
                .block(Block::default().borders(Borders::ALL).title("Targets"));
            f.render_widget(target_list, left[1]);

            let feed: Vec<ListItem> = alerts.iter().map(alert_item).collect();
            let feed_list = List::new(feed)
                .block(Block::default().borders(Borders::ALL).title("Alert Feed"));
            f.render_widget(feed_list, columns[1]);

            let footer = Paragraph::new(Line::from(vec![
                Span::raw("t takeoff  l land  r rtl  s scan  m mission  e emergency  "),
                Span::raw("1-4 scenarios  x manual  q quit"),
                Span::raw("   dropped frames: "),
                Span::styled(
                    decode_failures.to_string(),
                    Style::default().fg(if decode_failures == 0 {
                        Color::DarkGray
                    } else {
                        Color::Yellow
                    }),
                ),
            ]))
            .block(Block::default().borders(Borders::ALL).title("Controls"));
            f.render_widget(footer, rows[2]);
        })?;

        if should_close {
            break;
        }

        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('t') => actions.issue_command("takeoff"),
                    KeyCode::Char('l') => actions.issue_command("land"),
                    KeyCode::Char('r') => actions.issue_command("rtl"),
                    KeyCode::Char('s') => actions.issue_command("scan"),
                    KeyCode::Char('m') => actions.issue_command("mission"),
                    KeyCode::Char('e') => actions.issue_command("emergency"),
                    KeyCode::Char('1') => actions.inject_scenario("rescue"),
                    KeyCode::Char('2') => actions.inject_scenario("emergency"),
                    KeyCode::Char('3') => actions.inject_scenario("mapping"),
                    KeyCode::Char('4') => actions.inject_scenario("reset"),
                    KeyCode::Char('x') => {
                        manual_engaged = actions.toggle_manual();
                        axes = ControlAxes::NEUTRAL;
                    }
                    KeyCode::Char('w') if manual_engaged => {
                        axes.left_vertical += AXIS_STEP;
                        axes = axes.clamped();
                        actions.set_axes(axes);
                    }
                    KeyCode::Char('z') if manual_engaged => {
                        axes.left_vertical -= AXIS_STEP;
                        axes = axes.clamped();
                        actions.set_axes(axes);
                    }
                    KeyCode::Char('a') if manual_engaged => {
                        axes.left_horizontal -= AXIS_STEP;
                        axes = axes.clamped();
                        actions.set_axes(axes);
                    }
                    KeyCode::Char('d') if manual_engaged => {
                        axes.left_horizontal += AXIS_STEP;
                        axes = axes.clamped();
                        actions.set_axes(axes);
                    }
                    KeyCode::Up if manual_engaged => {
                        axes.right_vertical += AXIS_STEP;
                        axes = axes.clamped();
                        actions.set_axes(axes);
                    }
                    KeyCode::Down if manual_engaged => {
                        axes.right_vertical -= AXIS_STEP;
                        axes = axes.clamped();
                        actions.set_axes(axes);
                    }
                    KeyCode::Left if manual_engaged => {
                        axes.right_horizontal -= AXIS_STEP;
                        axes = axes.clamped();
                        actions.set_axes(axes);
                    }
                    KeyCode::Right if manual_engaged => {
                        axes.right_horizontal += AXIS_STEP;
                        axes = axes.clamped();
                        actions.set_axes(axes);
                    }
                    KeyCode::Char(' ') if manual_engaged => {
                        axes = ControlAxes::NEUTRAL;
                        actions.set_axes(axes);
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}

fn status_lines(
    snapshot: Option<&TelemetrySnapshot>,
    manual_engaged: bool,
    axes: ControlAxes,
) -> Vec<Line<'static>> {
    let Some(snap) = snapshot else {
        return vec![Line::from(Span::styled(
            "awaiting first frame...",
            Style::default().fg(Color::DarkGray),
        ))];
    };

    let battery_color = if snap.status.battery < 20.0 {
        Color::Red
    } else {
        Color::Green
    };
    let mut lines = vec![
        Line::from(vec![
            Span::raw("state    "),
            Span::styled(
                format!("{:?}", snap.status.state).to_uppercase(),
                Style::default()
                    .fg(state_color(snap.status.state))
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::raw("battery  "),
            Span::styled(
                format!("{:.1}%", snap.status.battery),
                Style::default().fg(battery_color),
            ),
        ]),
        Line::from(format!("signal   {:.0} dBm", snap.status.signal)),
        Line::from(format!("altitude {:.1} m", snap.status.altitude)),
        Line::from(format!("velocity {:.1} km/h", snap.status.velocity)),
        Line::from(format!(
            "mission  {}",
            format_mission_time(snap.status.mission_time)
        )),
        Line::from(format!(
            "position {:.2} / {:.2} / {:.2}",
            snap.position.x, snap.position.y, snap.position.z
        )),
    ];
    if manual_engaged {
        lines.push(Line::from(Span::styled(
            format!(
                "manual   L {:+.1}/{:+.1}  R {:+.1}/{:+.1}",
                axes.left_vertical, axes.left_horizontal, axes.right_vertical,
                axes.right_horizontal
            ),
            Style::default().fg(Color::Magenta),
        )));
    }
    lines
}

fn target_item(target: &aegis_types::telemetry::Target) -> ListItem<'static> {
    let style = match (target.priority, target.detected) {
        (TargetPriority::Critical, _) => Style::default().fg(Color::Red),
        (TargetPriority::Normal, true) => Style::default().fg(Color::Green),
        (TargetPriority::Normal, false) => Style::default().fg(Color::DarkGray),
    };
    let marker = if target.detected { "*" } else { " " };
    ListItem::new(Span::styled(
        format!(
            "{marker} #{} {} @ ({:.1}, {:.1})",
            target.id, target.kind, target.x, target.z
        ),
        style,
    ))
}

fn alert_item(entry: &AlertEntry) -> ListItem<'static> {
    let color = match entry.source {
        AlertSource::Ai => Color::Cyan,
        AlertSource::System => Color::Yellow,
    };
    ListItem::new(Line::from(vec![
        Span::styled(
            format!("[{}] ", entry.at.format("%H:%M:%S")),
            Style::default().fg(color),
        ),
        Span::raw(entry.message.clone()),
    ]))
}

fn link_style(link: LinkState) -> (&'static str, Color) {
    match link {
        LinkState::Disconnected => ("DISCONNECTED", Color::DarkGray),
        LinkState::Connecting => ("CONNECTING", Color::Yellow),
        LinkState::Connected => ("CONNECTED", Color::Green),
        LinkState::Reconnecting => ("RECONNECTING", Color::Red),
    }
}

fn state_color(state: DroneState) -> Color {
    match state {
        DroneState::Idle | DroneState::Landed => Color::Gray,
        DroneState::Flying => Color::Green,
        DroneState::Returning => Color::Yellow,
        DroneState::Emergency => Color::Red,
        DroneState::Unknown => Color::DarkGray,
    }
}

fn format_mission_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mission_time_formats_as_minutes_and_seconds() {
        assert_eq!(format_mission_time(0.0), "00:00");
        assert_eq!(format_mission_time(75.4), "01:15");
        assert_eq!(format_mission_time(-3.0), "00:00");
    }
}

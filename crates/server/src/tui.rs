use std::collections::VecDeque;

use chrono::{DateTime, Local};
use fgms::net::MAX_CHAT_MSG_LEN;
use fgms::{AdminSnapshot, BlacklistSelector};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Tabs};

use crate::events::Severity;

const MAX_LOG_LINES: usize = 500;
const PAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Sessions,
    Relays,
    Blacklist,
    Log,
}

impl Tab {
    const ALL: [Tab; 4] = [Tab::Sessions, Tab::Relays, Tab::Blacklist, Tab::Log];

    fn title(self) -> &'static str {
        match self {
            Tab::Sessions => "Sessions",
            Tab::Relays => "Relays",
            Tab::Blacklist => "Blacklist",
            Tab::Log => "Log",
        }
    }

    fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: DateTime<Local>,
    pub severity: Severity,
    pub message: String,
}

pub struct TuiState {
    tab: Tab,
    log: VecDeque<LogEntry>,
    scroll: usize,
    follow: bool,
    selected: usize,
    pending_delete: Option<BlacklistSelector>,
    message: Option<String>,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            tab: Tab::Sessions,
            log: VecDeque::new(),
            scroll: 0,
            follow: true,
            selected: 0,
            pending_delete: None,
            message: None,
        }
    }

    pub fn active_tab(&self) -> Tab {
        self.tab
    }

    pub fn next_tab(&mut self) {
        self.tab = Tab::ALL[(self.tab.index() + 1) % Tab::ALL.len()];
        self.selected = 0;
    }

    pub fn prev_tab(&mut self) {
        self.tab = Tab::ALL[(self.tab.index() + Tab::ALL.len() - 1) % Tab::ALL.len()];
        self.selected = 0;
    }

    pub fn log(&mut self, severity: Severity, message: impl Into<String>) {
        if self.log.len() == MAX_LOG_LINES {
            self.log.pop_front();
            self.scroll = self.scroll.saturating_sub(1);
        }
        self.log.push_back(LogEntry {
            time: Local::now(),
            severity,
            message: message.into(),
        });
        if self.follow {
            self.scroll = self.log.len().saturating_sub(1);
        }
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.log(Severity::Info, message);
    }

    pub fn log_warn(&mut self, message: impl Into<String>) {
        self.log(Severity::Warn, message);
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.log(Severity::Error, message);
    }

    pub fn scroll_up(&mut self) {
        self.follow = false;
        self.scroll = self.scroll.saturating_sub(PAGE);
    }

    pub fn scroll_down(&mut self) {
        let last = self.log.len().saturating_sub(1);
        self.scroll = (self.scroll + PAGE).min(last);
        self.follow = self.scroll == last;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow = true;
        self.scroll = self.log.len().saturating_sub(1);
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self, count: usize) {
        if count > 0 {
            self.selected = (self.selected + 1).min(count - 1);
        }
    }

    /// Marks the highlighted blacklist entry for removal.
    pub fn request_delete(&mut self, snapshot: &AdminSnapshot) {
        if self.tab != Tab::Blacklist {
            return;
        }
        if let Some(entry) = snapshot.blacklist.get(self.selected) {
            self.pending_delete = Some(BlacklistSelector::Id(entry.id));
        }
    }

    pub fn take_pending_delete(&mut self) -> Option<BlacklistSelector> {
        self.pending_delete.take()
    }

    pub fn is_typing(&self) -> bool {
        self.message.is_some()
    }

    pub fn open_message(&mut self) {
        self.message = Some(String::new());
    }

    pub fn cancel_message(&mut self) {
        self.message = None;
    }

    pub fn type_char(&mut self, c: char) {
        if let Some(message) = &mut self.message {
            if message.len() < MAX_CHAT_MSG_LEN - 1 {
                message.push(c);
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(message) = &mut self.message {
            message.pop();
        }
    }

    /// Closes the prompt and hands back the text, if any was typed.
    pub fn submit_message(&mut self) -> Option<String> {
        self.message.take().filter(|m| !m.trim().is_empty())
    }

    /// Keeps the selection inside a list that may have shrunk.
    pub fn clamp_selection(&mut self, snapshot: &AdminSnapshot) {
        let count = match self.tab {
            Tab::Sessions => snapshot.sessions.len(),
            Tab::Relays => snapshot.relays.len(),
            Tab::Blacklist => snapshot.blacklist.len(),
            Tab::Log => 0,
        };
        self.selected = self.selected.min(count.saturating_sub(1));
    }

    pub fn list_len(&self, snapshot: &AdminSnapshot) -> usize {
        match self.tab {
            Tab::Sessions => snapshot.sessions.len(),
            Tab::Relays => snapshot.relays.len(),
            Tab::Blacklist => snapshot.blacklist.len(),
            Tab::Log => self.log.len(),
        }
    }
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render(frame: &mut Frame, state: &TuiState, name: &str, snapshot: &AdminSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], name, snapshot);
    render_clients(frame, chunks[1], snapshot);
    render_traffic(frame, chunks[2], snapshot);
    render_tabs(frame, chunks[3], state);
    match state.tab {
        Tab::Sessions => render_sessions(frame, chunks[4], state, snapshot),
        Tab::Relays => render_relays(frame, chunks[4], state, snapshot),
        Tab::Blacklist => render_blacklist(frame, chunks[4], state, snapshot),
        Tab::Log => render_log(frame, chunks[4], state),
    }
    render_help(frame, chunks[5], state);
}

fn render_header(frame: &mut Frame, area: Rect, name: &str, snapshot: &AdminSnapshot) {
    let title = format!(
        " {} - Uptime: {} ",
        name,
        format_duration(snapshot.uptime.as_secs())
    );

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = format!(
        "Pilots: {} ({} local)  |  Relays: {}/{} active  |  Crossfeeds: {}  |  {}",
        snapshot.current_clients,
        snapshot.local_clients,
        snapshot.active_relays(),
        snapshot.relays.len(),
        snapshot.crossfeeds.len(),
        if snapshot.hub { "HUB" } else { "leaf" }
    );

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, area);
}

fn render_clients(frame: &mut Frame, area: Rect, snapshot: &AdminSnapshot) {
    let block = Block::default()
        .title(" Clients ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let max = snapshot.max_clients.max(1);
    let ratio = snapshot.current_clients as f64 / max as f64;
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio.min(1.0))
        .label(format!(
            "{} now / {} peak",
            snapshot.current_clients, snapshot.max_clients
        ));

    frame.render_widget(gauge, area);
}

fn render_traffic(frame: &mut Frame, area: Rect, snapshot: &AdminSnapshot) {
    let block = Block::default()
        .title(" Traffic ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let stats = &snapshot.stats;
    let net = &stats.net;
    let lines = vec![
        Line::from(vec![
            Span::styled("Packets: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} sent / {} recv", net.packets_sent, net.packets_received),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Bytes: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} sent / {} recv",
                    format_bytes(net.bytes_sent),
                    format_bytes(net.bytes_received)
                ),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Delivered: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} local / {} relay / {} crossfeed",
                    stats.local_deliveries, stats.relay_deliveries, stats.crossfeed_deliveries
                ),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Rejected: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} invalid / {} blacklisted / {} unknown relay / {} send errors",
                    stats.invalid, stats.blacklisted, stats.unknown_relay, net.send_errors
                ),
                Style::default().fg(if stats.invalid + net.send_errors > 0 {
                    Color::Red
                } else {
                    Color::White
                }),
            ),
        ]),
    ];

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_tabs(frame: &mut Frame, area: Rect, state: &TuiState) {
    let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL))
        .select(state.tab.index())
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn list_block(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue))
}

fn row_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

fn render_sessions(frame: &mut Frame, area: Rect, state: &TuiState, snapshot: &AdminSnapshot) {
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "{:>4}  {:<8} {:<14} {:>9} {:>10} {:>8} {:>8} {:>8}  {}",
            "id", "callsign", "origin", "lat", "lon", "alt ft", "pkts in", "fwd", "model"
        ),
        Style::default().fg(Color::Gray),
    ))];

    for (i, s) in snapshot.sessions.iter().enumerate() {
        let style = if s.error.is_some() {
            Style::default().fg(Color::Red)
        } else {
            row_style(i == state.selected)
        };
        lines.push(Line::from(Span::styled(
            format!(
                "{:>4}  {:<8} {:<14} {:>9.4} {:>10.4} {:>8.0} {:>8} {:>8}  {}",
                s.client_id,
                s.callsign,
                s.origin,
                s.geod.lat,
                s.geod.lon,
                s.geod.alt_ft,
                s.pkts_in,
                s.pkts_forwarded,
                s.error.as_deref().unwrap_or(&s.model)
            ),
            style,
        )));
    }

    let paragraph = Paragraph::new(lines).block(list_block(" Sessions "));
    frame.render_widget(paragraph, area);
}

fn render_relays(frame: &mut Frame, area: Rect, state: &TuiState, snapshot: &AdminSnapshot) {
    let mut lines = Vec::new();
    for (i, r) in snapshot.relays.iter().enumerate() {
        let status = if r.active {
            Span::styled("active  ", Style::default().fg(Color::Green))
        } else {
            Span::styled("inactive", Style::default().fg(Color::DarkGray))
        };
        let seen = r
            .last_seen
            .map(|d| format!("{} ago", format_duration(d.as_secs())))
            .unwrap_or_else(|| String::from("never"));
        lines.push(Line::from(vec![
            status,
            Span::styled(
                format!(
                    "  {:<32} {:<22} in {:>8}  out {:>8}  seen {}",
                    r.name, r.addr, r.pkts_in, r.pkts_out, seen
                ),
                row_style(i == state.selected),
            ),
        ]));
    }
    for c in &snapshot.crossfeeds {
        lines.push(Line::from(vec![
            Span::styled("feed    ", Style::default().fg(Color::Magenta)),
            Span::styled(
                format!("  {:<32} {:<22} out {:>8}", c.name, c.addr, c.pkts_out),
                Style::default().fg(Color::White),
            ),
        ]));
    }

    let paragraph = Paragraph::new(lines).block(list_block(" Relays & Crossfeeds "));
    frame.render_widget(paragraph, area);
}

fn render_blacklist(frame: &mut Frame, area: Rect, state: &TuiState, snapshot: &AdminSnapshot) {
    let lines: Vec<Line> = snapshot
        .blacklist
        .iter()
        .enumerate()
        .map(|(i, b)| {
            Line::from(Span::styled(
                format!(
                    "{:>4}  {:<40} {:>8} rejected  {}",
                    b.id, b.addr, b.rejected, b.reason
                ),
                row_style(i == state.selected),
            ))
        })
        .collect();

    let paragraph = Paragraph::new(lines).block(list_block(" Blacklist "));
    frame.render_widget(paragraph, area);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let height = area.height.saturating_sub(2) as usize;
    let end = (state.scroll + 1).min(state.log.len());
    let start = end.saturating_sub(height);

    let lines: Vec<Line> = state
        .log
        .range(start..end)
        .map(|entry| {
            let color = match entry.severity {
                Severity::Info => Color::White,
                Severity::Warn => Color::Yellow,
                Severity::Error => Color::Red,
            };
            Line::from(vec![
                Span::styled(
                    format!("{} ", entry.time.format("%H:%M:%S")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(entry.message.clone(), Style::default().fg(color)),
            ])
        })
        .collect();

    let title = if state.follow { " Log " } else { " Log (paused) " };
    let paragraph = Paragraph::new(lines).block(list_block(title));
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame, area: Rect, state: &TuiState) {
    if let Some(message) = &state.message {
        let block = Block::default()
            .title(" Broadcast (Enter send, ESC cancel) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        let text = Paragraph::new(format!("{}_", message))
            .block(block)
            .style(Style::default().fg(Color::White));
        frame.render_widget(text, area);
        return;
    }

    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new(
        "q/ESC quit  Tab switch view  Up/Down select  d delete blacklist entry  m broadcast  PgUp/PgDn/End scroll log",
    )
    .block(block)
    .style(
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    );

    frame.render_widget(text, area);
}

pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1}GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fgms::{BlacklistView, EngineStats};

    use super::*;

    fn snapshot_with_blacklist() -> AdminSnapshot {
        AdminSnapshot {
            uptime: Duration::from_secs(3723),
            hub: false,
            sessions: Vec::new(),
            current_clients: 0,
            local_clients: 0,
            max_clients: 0,
            relays: Vec::new(),
            crossfeeds: Vec::new(),
            blacklist: vec![
                BlacklistView {
                    id: 1,
                    addr: "192.0.2.1".parse().unwrap(),
                    reason: "static config entry".into(),
                    rejected: 0,
                },
                BlacklistView {
                    id: 7,
                    addr: "192.0.2.7".parse().unwrap(),
                    reason: "flooding".into(),
                    rejected: 12,
                },
            ],
            stats: EngineStats::default(),
        }
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_duration(3723), "01:02:03");
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.0KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0MB");
    }

    #[test]
    fn test_tab_cycle() {
        let mut state = TuiState::new();
        assert_eq!(state.active_tab(), Tab::Sessions);
        state.prev_tab();
        assert_eq!(state.active_tab(), Tab::Log);
        state.next_tab();
        state.next_tab();
        assert_eq!(state.active_tab(), Tab::Relays);
    }

    #[test]
    fn test_delete_only_from_blacklist_tab() {
        let snapshot = snapshot_with_blacklist();
        let mut state = TuiState::new();
        state.request_delete(&snapshot);
        assert_eq!(state.take_pending_delete(), None);

        state.next_tab();
        state.next_tab();
        state.select_next(snapshot.blacklist.len());
        state.select_next(snapshot.blacklist.len());
        state.request_delete(&snapshot);
        assert_eq!(state.take_pending_delete(), Some(BlacklistSelector::Id(7)));
        assert_eq!(state.take_pending_delete(), None);
    }

    #[test]
    fn test_broadcast_prompt() {
        let mut state = TuiState::new();
        state.type_char('x');
        assert!(!state.is_typing());

        state.open_message();
        for c in "hi all".chars() {
            state.type_char(c);
        }
        state.backspace();
        state.type_char('l');
        assert_eq!(state.submit_message(), Some("hi all".to_string()));
        assert!(!state.is_typing());

        state.open_message();
        state.type_char(' ');
        assert_eq!(state.submit_message(), None);
    }

    #[test]
    fn test_log_is_bounded_and_follows() {
        let mut state = TuiState::new();
        for i in 0..MAX_LOG_LINES + 5 {
            state.log_info(format!("line {}", i));
        }
        assert_eq!(state.log.len(), MAX_LOG_LINES);
        assert_eq!(state.scroll, MAX_LOG_LINES - 1);

        state.scroll_up();
        assert_eq!(state.scroll, MAX_LOG_LINES - 1 - PAGE);
        state.log_warn("late");
        assert_eq!(state.scroll, MAX_LOG_LINES - 2 - PAGE);
        state.scroll_to_bottom();
        assert_eq!(state.scroll, MAX_LOG_LINES - 1);
    }
}

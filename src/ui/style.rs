use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders};

use gatewayctl::engine::{ContainerStatus, DesktopStatus, ImageStatus};

use crate::app::LineKind;

// ── Colour constants ──────────────────────────────────────────────────
pub const COLOR_OK: Color = Color::Green;
pub const COLOR_FAIL: Color = Color::Red;
pub const COLOR_WARN: Color = Color::Yellow;
pub const COLOR_UNKNOWN: Color = Color::DarkGray;

// ── Icon constants ────────────────────────────────────────────────────
pub const ICON_OK: &str = "✓";
pub const ICON_FAIL: &str = "✗";
pub const ICON_WARN: &str = "◉";
pub const ICON_UNKNOWN: &str = "─";

/// Traffic-light level shared by the three status enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Ok,
    Warn,
    Fail,
    Unknown,
}

pub fn desktop_level(status: DesktopStatus) -> Level {
    match status {
        DesktopStatus::Open => Level::Ok,
        DesktopStatus::Closed => Level::Warn,
        DesktopStatus::NotInstalled => Level::Fail,
        DesktopStatus::Unknown => Level::Unknown,
    }
}

pub fn image_level(status: ImageStatus) -> Level {
    match status {
        ImageStatus::Available => Level::Ok,
        ImageStatus::None => Level::Warn,
        ImageStatus::Unknown => Level::Unknown,
    }
}

pub fn container_level(status: ContainerStatus) -> Level {
    match status {
        ContainerStatus::Running => Level::Ok,
        ContainerStatus::Exited | ContainerStatus::NotFound => Level::Warn,
        ContainerStatus::Unknown | ContainerStatus::Offline => Level::Unknown,
    }
}

pub fn level_color(level: Level) -> Color {
    match level {
        Level::Ok => COLOR_OK,
        Level::Warn => COLOR_WARN,
        Level::Fail => COLOR_FAIL,
        Level::Unknown => COLOR_UNKNOWN,
    }
}

pub fn level_icon(level: Level) -> &'static str {
    match level {
        Level::Ok => ICON_OK,
        Level::Warn => ICON_WARN,
        Level::Fail => ICON_FAIL,
        Level::Unknown => ICON_UNKNOWN,
    }
}

pub fn line_style(kind: LineKind) -> Style {
    match kind {
        LineKind::Info => Style::default().fg(Color::Cyan),
        LineKind::Error => Style::default().fg(COLOR_FAIL).add_modifier(Modifier::BOLD),
        LineKind::Stdout => Style::default(),
        LineKind::Stderr => Style::default().fg(COLOR_WARN),
        LineKind::Tail => Style::default().fg(Color::Gray),
        LineKind::TailErr => Style::default().fg(COLOR_FAIL),
    }
}

pub fn make_block(title: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(style)
}

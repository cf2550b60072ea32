use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::{App, InputMode};
use crate::ui::overlay::draw_help_overlay;
use crate::ui::panels::{draw_output, draw_status};

pub fn draw(frame: &mut Frame, app: &App) {
    let size = frame.area();

    // Status bar, output pane, one-line footer.
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(size);

    draw_status(frame, app, rows[0]);
    draw_output(frame, app, rows[1]);
    draw_footer(frame, app, rows[2]);

    if app.show_help {
        draw_help_overlay(frame, size);
    }
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let key = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    let line = match &app.mode {
        InputMode::Exec => Line::from(vec![
            Span::styled(format!(" exec ({}) $ ", app.service), key),
            Span::raw(app.input.as_str()),
            Span::styled("█", Style::default().fg(Color::Gray)),
        ]),
        InputMode::Confirm(op) => Line::from(vec![Span::styled(
            format!(" {op} is destructive. Press y to continue, any other key to abort "),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )]),
        InputMode::Normal => {
            let mut spans = Vec::new();
            for (k, label) in [
                ("s", "start"),
                ("x", "stop"),
                ("b", "build"),
                ("r", "rebuild"),
                ("e", "exec"),
                ("l", "logs"),
                ("?", "help"),
                ("q", "quit"),
            ] {
                spans.push(Span::styled(format!(" {k}"), key));
                spans.push(Span::styled(
                    format!(" {label} "),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            Line::from(spans)
        }
    };

    frame.render_widget(Paragraph::new(line), area);
}

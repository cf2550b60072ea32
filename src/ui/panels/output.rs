use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::App;
use crate::ui::style::{line_style, make_block};

pub fn draw_output(frame: &mut Frame, app: &App, area: Rect) {
    let mut title = String::from(" Output ");
    if let Some(op) = &app.busy {
        title.push_str(&format!("· {op} running (Esc cancels) "));
    }
    if app.scroll > 0 {
        title.push_str(&format!("· ↑{} ", app.scroll));
    }
    let block = make_block(&title, true);

    if app.log.is_empty() {
        let hint = Line::from(Span::styled(
            "No output yet. Press ? for keybindings.",
            Style::default().fg(Color::DarkGray),
        ));
        frame.render_widget(Paragraph::new(hint).block(block), area);
        return;
    }

    let height = area.height.saturating_sub(2) as usize;
    let end = app.log.len().saturating_sub(app.scroll);
    let start = end.saturating_sub(height);

    let lines: Vec<Line> = app
        .log
        .range(start..end)
        .map(|l| Line::from(Span::styled(l.text.as_str(), line_style(l.kind))))
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

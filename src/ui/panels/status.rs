use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::App;
use crate::ui::style::{
    Level, container_level, desktop_level, image_level, level_color, level_icon, make_block,
};

pub fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!(" {} ", app.service);
    let block = make_block(&title, app.busy.is_some());

    let Some(status) = app.status else {
        let line = Line::from(Span::styled(
            "Probing engine…",
            Style::default().fg(Color::DarkGray),
        ));
        frame.render_widget(Paragraph::new(line).block(block), area);
        return;
    };

    let mut spans = Vec::new();
    push_item(&mut spans, "Engine", &status.desktop.to_string(), desktop_level(status.desktop));
    push_item(&mut spans, "Image", &status.image.to_string(), image_level(status.image));
    push_item(
        &mut spans,
        "Container",
        &status.container.to_string(),
        container_level(status.container),
    );
    if app.following {
        spans.push(Span::styled("  ● following logs", Style::default().fg(Color::Cyan)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn push_item(spans: &mut Vec<Span<'static>>, label: &str, value: &str, level: Level) {
    let color = level_color(level);
    spans.push(Span::raw(format!(" {label}: ")));
    spans.push(Span::styled(
        format!("{} {value}  ", level_icon(level)),
        Style::default().fg(color),
    ));
}

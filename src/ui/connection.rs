use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, ConnectionField};

pub fn render_connection(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    // Title
    let title = Paragraph::new(format!("Connect {}", app.editing_side.label()))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::NONE));
    f.render_widget(title, chunks[0]);

    render_input_field(
        f,
        "Name",
        &app.name,
        app.connection_field == ConnectionField::Name,
        chunks[1],
    );

    render_input_field(
        f,
        "URL (postgres://user@host:port/db)",
        &app.url,
        app.connection_field == ConnectionField::Url,
        chunks[2],
    );

    let masked_key = "*".repeat(app.key.chars().count());
    render_input_field(
        f,
        "Access key",
        &masked_key,
        app.connection_field == ConnectionField::Key,
        chunks[3],
    );

    // Instructions
    let instructions = Paragraph::new(vec![
        Line::from("Tab/Shift+Tab: Next/Previous field | Enter: Fetch schema | Esc: Back"),
        Line::from(Span::styled(
            "Note: name and URL are saved; the access key is never written to disk",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[4]);
}

fn render_input_field(
    f: &mut Frame,
    label: &str,
    value: &str,
    is_selected: bool,
    area: Rect,
) {
    let style = if is_selected {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    let border_style = if is_selected {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Gray)
    };

    let input = Paragraph::new(value)
        .style(style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(label),
        );

    f.render_widget(input, area);
}

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::App;
use crate::compare::Side;

pub fn render_connection_selector(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(4),
        ])
        .split(area);

    // Title
    let title = Paragraph::new("VibeOps Schema Compare")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::NONE));
    f.render_widget(title, chunks[0]);

    render_sides(f, app, chunks[1]);

    // Connection list
    if app.config.connections.is_empty() {
        let empty = Paragraph::new("No saved connections.\nPress 'n' (source) or 'N' (target) to add one.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Saved Connections")
                    .border_style(Style::default().fg(Color::Cyan)),
            );
        f.render_widget(empty, chunks[2]);
    } else {
        let items: Vec<ListItem> = app
            .config
            .connections
            .iter()
            .enumerate()
            .map(|(i, profile)| {
                let content = format!("{} - {}", profile.name, profile.url);

                let style = if i == app.selected_profile {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                ListItem::new(content).style(style)
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Saved Connections")
                .border_style(Style::default().fg(Color::Cyan)),
        );

        f.render_widget(list, chunks[2]);
    }

    // Instructions
    let instructions = Paragraph::new(vec![
        Line::from("↑/↓: Navigate | s: Use as Source | t: Use as Target | n/N: New Source/Target"),
        Line::from("d: Delete Selected | c: Compare | Tab: Diff View | q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[3]);
}

fn render_sides(f: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = [Side::Source, Side::Target]
        .into_iter()
        .map(|side| {
            let (state, color) = if app.compare.is_loading(side) {
                ("loading…".to_string(), Color::Yellow)
            } else if let Some(snapshot) = app.compare.snapshot(side) {
                (
                    format!(
                        "{} tables, captured {}",
                        snapshot.table_count(),
                        snapshot.captured_at().format("%H:%M:%S UTC")
                    ),
                    Color::Green,
                )
            } else {
                ("not loaded".to_string(), Color::DarkGray)
            };

            Line::from(vec![
                Span::styled(
                    format!("{:<18}", side.label()),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("{}  ", app.url_for(side).unwrap_or("-"))),
                Span::styled(state, Style::default().fg(color)),
            ])
        })
        .collect();

    let sides = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Schemas")
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(sides, area);
}

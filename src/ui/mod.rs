use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, AppMode};

mod compare;
mod connection;
mod connection_selector;
mod migration;

pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    // Main content area
    match app.mode {
        AppMode::ConnectionSelector => connection_selector::render_connection_selector(f, app, chunks[0]),
        AppMode::ConnectionEdit => connection::render_connection(f, app, chunks[0]),
        AppMode::Compare => {
            let main_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
                .split(chunks[0]);

            compare::render_diff_list(f, app, main_chunks[0]);
            compare::render_details(f, app, main_chunks[1]);
        }
        AppMode::Migration => migration::render_migration(f, app, chunks[0]),
    }

    // Status bar
    render_status_bar(f, app, chunks[1]);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let mode_text = match app.mode {
        AppMode::ConnectionSelector => "CONNECTIONS",
        AppMode::ConnectionEdit => "EDIT CONNECTION",
        AppMode::Compare => "COMPARE",
        AppMode::Migration => "MIGRATION",
    };
    let loading = if app.compare.loading() { " | loading…" } else { "" };

    let status_text = if let Some(err) = app.current_error() {
        format!(" {}{} | ERROR: {} ", mode_text, loading, err)
    } else if let Some(msg) = &app.status_message {
        format!(" {}{} | {} ", mode_text, loading, msg)
    } else {
        let hints = match app.mode {
            AppMode::ConnectionSelector => {
                if app.config.connections.is_empty() {
                    "n/N:new source/target | c:compare | q:quit"
                } else {
                    "↑↓:navigate | s/t:use as source/target | n/N:new | d:delete | c:compare | q:quit"
                }
            }
            AppMode::ConnectionEdit => "Tab:next field | Enter:fetch schema | Esc:back",
            AppMode::Compare => "↑↓:navigate | g:generate SQL | r:re-compare | Tab/Esc:connections | q:quit",
            AppMode::Migration => "↑↓/PgUp/PgDn:scroll | w:export | Esc:back | q:quit",
        };
        format!(" {}{} | {} ", mode_text, loading, hints)
    };

    let status_style = if app.current_error().is_some() {
        Style::default().fg(Color::Red).bg(Color::Black)
    } else {
        Style::default().fg(Color::Cyan).bg(Color::Black)
    };

    let status = Paragraph::new(status_text)
        .style(status_style)
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(status, area);
}

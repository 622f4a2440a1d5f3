use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::syntax::SqlHighlighter;

pub fn render_migration(f: &mut Frame, app: &App, area: Rect) {
    let Some(sql) = app.migration_sql.as_deref() else {
        let help = Paragraph::new("-- Run a comparison first, then press 'g' to generate the migration.")
            .style(Style::default().fg(Color::DarkGray))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Migration SQL")
                    .border_style(Style::default().fg(Color::Cyan)),
            );
        f.render_widget(help, area);
        return;
    };

    let highlighter = SqlHighlighter::new();
    let lines: Vec<Line> = sql.lines().map(|line| highlighter.highlight_line(line)).collect();

    let title = format!(
        "Migration SQL (line {}/{}) - review before running, never applied automatically",
        app.migration_scroll as usize + 1,
        lines.len()
    );

    let script = Paragraph::new(lines)
        .scroll((app.migration_scroll, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Cyan)),
        );

    f.render_widget(script, area);
}

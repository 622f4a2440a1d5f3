use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, DiffItem};
use crate::db::{RlsPolicy, TableInfo};
use crate::diff::{SchemaDiff, TableChanges};

pub fn render_diff_list(f: &mut Frame, app: &mut App, area: Rect) {
    let Some(diff) = app.compare.diff() else {
        let help = Paragraph::new("No comparison yet.\n\nLoad both schemas, then press 'c' in the connection view or 'r' here.")
            .style(Style::default().fg(Color::DarkGray))
            .block(bordered("Changes"));
        f.render_widget(help, area);
        return;
    };
    let title = format!("Changes ({})", diff.change_count());

    if diff.is_empty() {
        let same = Paragraph::new("Schemas are identical.")
            .style(Style::default().fg(Color::Green))
            .block(bordered(&title));
        f.render_widget(same, area);
        return;
    }

    let visible_height = area.height.saturating_sub(2) as usize;
    app.adjust_scroll(visible_height);

    let Some(diff) = app.compare.diff() else {
        return;
    };
    let items: Vec<ListItem> = app
        .diff_items
        .iter()
        .enumerate()
        .skip(app.diff_scroll_offset)
        .take(visible_height)
        .map(|(idx, item)| {
            let (marker, label, color) = describe(diff, item);
            let style = if idx == app.diff_selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(color)
            };
            ListItem::new(format!("{} {}", marker, label)).style(style)
        })
        .collect();

    f.render_widget(List::new(items).block(bordered(&title)), area);
}

fn describe(diff: &SchemaDiff, item: &DiffItem) -> (&'static str, String, Color) {
    match item {
        DiffItem::NewTable(name) => ("+", format!("table {}", name), Color::Green),
        DiffItem::RemovedTable(name) => ("-", format!("table {}", name), Color::Red),
        DiffItem::ModifiedTable(i) => match diff.modified_tables.get(*i) {
            Some(t) => ("~", format!("table {}", t.table), Color::Yellow),
            None => ("?", String::new(), Color::DarkGray),
        },
        DiffItem::AddedPolicy(i) => match diff.added_policies.get(*i) {
            Some(p) => ("+", format!("policy {}", p.key()), Color::Green),
            None => ("?", String::new(), Color::DarkGray),
        },
        DiffItem::RemovedPolicy(i) => match diff.removed_policies.get(*i) {
            Some(p) => ("-", format!("policy {}", p.key()), Color::Red),
            None => ("?", String::new(), Color::DarkGray),
        },
    }
}

pub fn render_details(f: &mut Frame, app: &App, area: Rect) {
    let (Some(diff), Some(item)) = (app.compare.diff(), app.selected_diff_item()) else {
        let help = Paragraph::new("Select a change to view its details\n\nKeyboard shortcuts:\n  ↑/↓ - Navigate\n  g - Generate migration SQL\n  r - Re-run comparison\n  Tab/Esc - Back to connections\n  q - Quit")
            .block(bordered("Details"));
        f.render_widget(help, area);
        return;
    };

    match item {
        DiffItem::NewTable(name) => {
            if let Some(table) = app.compare.source().and_then(|s| s.table(name)) {
                render_columns(f, table, "New table (only in source)", area);
            }
        }
        DiffItem::RemovedTable(name) => {
            if let Some(table) = app.compare.target().and_then(|s| s.table(name)) {
                render_columns(f, table, "Removed table (only in target)", area);
            }
        }
        DiffItem::ModifiedTable(i) => {
            if let Some(changes) = diff.modified_tables.get(*i) {
                render_table_changes(f, changes, area);
            }
        }
        DiffItem::AddedPolicy(i) => {
            if let Some(policy) = diff.added_policies.get(*i) {
                render_policy(f, policy, "Policy only in source", area);
            }
        }
        DiffItem::RemovedPolicy(i) => {
            if let Some(policy) = diff.removed_policies.get(*i) {
                render_policy(f, policy, "Policy only in target", area);
            }
        }
    }
}

fn render_columns(f: &mut Frame, table: &TableInfo, title: &str, area: Rect) {
    let header = Row::new(vec!["Column", "Type", "Nullable", "Default"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let rows: Vec<Row> = table
        .columns
        .iter()
        .map(|col| {
            Row::new(vec![
                col.column_name.clone(),
                col.data_type.clone(),
                if col.is_nullable { "YES" } else { "NO" }.to_string(),
                col.column_default.clone().unwrap_or_else(|| "-".to_string()),
            ])
        })
        .collect();

    let widget = Table::new(
        rows,
        [
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(15),
            Constraint::Percentage(35),
        ],
    )
    .header(header)
    .block(bordered(&format!("{}: {}", title, table.name)));

    f.render_widget(widget, area);
}

fn render_table_changes(f: &mut Frame, changes: &TableChanges, area: Rect) {
    let header = Row::new(vec!["", "Column", "Target (deployed)", "Source (desired)"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let mut rows: Vec<Row> = Vec::new();
    for col in &changes.new_columns {
        rows.push(
            Row::new(vec![
                "+".to_string(),
                col.column_name.clone(),
                "-".to_string(),
                column_summary(&col.data_type, col.is_nullable),
            ])
            .style(Style::default().fg(Color::Green)),
        );
    }
    for name in &changes.removed_columns {
        rows.push(
            Row::new(vec!["-".to_string(), name.clone(), "present".to_string(), "-".to_string()])
                .style(Style::default().fg(Color::Red)),
        );
    }
    for change in &changes.modified_columns {
        rows.push(
            Row::new(vec![
                "~".to_string(),
                change.column.clone(),
                column_summary(&change.target.data_type, change.target.is_nullable),
                column_summary(&change.source.data_type, change.source.is_nullable),
            ])
            .style(Style::default().fg(Color::Yellow)),
        );
    }

    let widget = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Percentage(30),
            Constraint::Percentage(34),
            Constraint::Percentage(34),
        ],
    )
    .header(header)
    .block(bordered(&format!("Modified table: {}", changes.table)));

    f.render_widget(widget, area);
}

fn column_summary(data_type: &str, is_nullable: bool) -> String {
    if is_nullable {
        data_type.to_string()
    } else {
        format!("{} NOT NULL", data_type)
    }
}

fn render_policy(f: &mut Frame, policy: &RlsPolicy, title: &str, area: Rect) {
    let text = format!(
        "Table:    {}.{}\nPolicy:   {}\nMode:     {}\nCommand:  {}\nRoles:    {}\nUsing:    {}\nCheck:    {}",
        policy.schema_name,
        policy.table_name,
        policy.policy_name,
        policy.permissive,
        policy.command.as_str(),
        policy.roles.join(", "),
        policy.qual.as_deref().unwrap_or("-"),
        policy.with_check.as_deref().unwrap_or("-"),
    );

    let widget = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(bordered(title));
    f.render_widget(widget, area);
}

fn bordered(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .border_style(Style::default().fg(Color::Cyan))
}

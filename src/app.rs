use anyhow::{Context, Result};
use chrono::Local;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

use crate::compare::{FetchOutcome, SchemaCompare, Side};
use crate::config::{Config, ConnectionProfile};
use crate::diff::SchemaDiff;

mod connection_selector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    ConnectionSelector,
    ConnectionEdit,
    Compare,
    Migration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionField {
    Name,
    Url,
    Key,
}

/// One selectable line of the diff list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffItem {
    NewTable(String),
    RemovedTable(String),
    ModifiedTable(usize),
    AddedPolicy(usize),
    RemovedPolicy(usize),
}

impl DiffItem {
    pub fn from_diff(diff: &SchemaDiff) -> Vec<Self> {
        let mut items: Vec<Self> = diff.new_tables.iter().cloned().map(Self::NewTable).collect();
        items.extend(diff.removed_tables.iter().cloned().map(Self::RemovedTable));
        items.extend((0..diff.modified_tables.len()).map(Self::ModifiedTable));
        items.extend((0..diff.added_policies.len()).map(Self::AddedPolicy));
        items.extend((0..diff.removed_policies.len()).map(Self::RemovedPolicy));
        items
    }
}

pub struct App {
    pub mode: AppMode,
    pub connection_field: ConnectionField,

    // Connection selector
    pub config: Config,
    pub selected_profile: usize,

    // Connection fields
    pub editing_side: Side,
    pub name: String,
    pub url: String,
    pub key: String,

    // Endpoint URLs last fetched for each side
    pub source_url: Option<String>,
    pub target_url: Option<String>,

    pub compare: SchemaCompare,

    // Compare state
    pub diff_items: Vec<DiffItem>,
    pub diff_selected: usize,
    pub diff_scroll_offset: usize,

    // Migration state
    pub migration_sql: Option<String>,
    pub migration_scroll: u16,

    // UI state
    pub error_message: Option<String>,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(config: Config, outcomes: UnboundedSender<FetchOutcome>) -> Self {
        let compare = SchemaCompare::new(config.settings.fetch_settings(), outcomes);
        let defaults = ConnectionProfile::new(String::new());

        Self {
            mode: AppMode::ConnectionSelector,
            connection_field: ConnectionField::Name,
            config,
            selected_profile: 0,
            editing_side: Side::Source,
            name: String::new(),
            url: defaults.url,
            key: String::new(),
            source_url: None,
            target_url: None,
            compare,
            diff_items: Vec::new(),
            diff_selected: 0,
            diff_scroll_offset: 0,
            migration_sql: None,
            migration_scroll: 0,
            error_message: None,
            status_message: None,
        }
    }

    pub fn set_error(&mut self, msg: String) {
        self.status_message = None;
        self.error_message = Some(msg);
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    pub fn set_status(&mut self, msg: String) {
        self.error_message = None;
        self.status_message = Some(msg);
    }

    /// The UI error if any, otherwise the orchestrator's.
    pub fn current_error(&self) -> Option<&str> {
        self.error_message.as_deref().or_else(|| self.compare.error())
    }

    // Connection field navigation
    pub fn next_connection_field(&mut self) {
        self.connection_field = match self.connection_field {
            ConnectionField::Name => ConnectionField::Url,
            ConnectionField::Url => ConnectionField::Key,
            ConnectionField::Key => ConnectionField::Name,
        };
    }

    pub fn prev_connection_field(&mut self) {
        self.connection_field = match self.connection_field {
            ConnectionField::Name => ConnectionField::Key,
            ConnectionField::Url => ConnectionField::Name,
            ConnectionField::Key => ConnectionField::Url,
        };
    }

    fn active_field(&mut self) -> &mut String {
        match self.connection_field {
            ConnectionField::Name => &mut self.name,
            ConnectionField::Url => &mut self.url,
            ConnectionField::Key => &mut self.key,
        }
    }

    pub fn input_char(&mut self, c: char) {
        self.active_field().push(c);
    }

    pub fn delete_char(&mut self) {
        self.active_field().pop();
    }

    /// Starts fetching the schema for the side being edited.
    pub fn submit_connection(&mut self) -> Result<()> {
        let url = self.url.trim().to_string();
        if url.is_empty() {
            anyhow::bail!("URL is required");
        }

        match self.editing_side {
            Side::Source => {
                self.compare.fetch_source(&url, &self.key);
                self.source_url = Some(url.clone());
            }
            Side::Target => {
                self.compare.fetch_target(&url, &self.key);
                self.target_url = Some(url.clone());
            }
        }
        self.key.clear();
        self.mode = AppMode::ConnectionSelector;
        self.clear_error();

        let name = if self.name.trim().is_empty() {
            url.clone()
        } else {
            self.name.trim().to_string()
        };
        if self.config.remember(ConnectionProfile { name, url }) {
            self.config.save().context("Could not save connection profile")?;
        }
        Ok(())
    }

    pub fn url_for(&self, side: Side) -> Option<&str> {
        match side {
            Side::Source => self.source_url.as_deref(),
            Side::Target => self.target_url.as_deref(),
        }
    }

    pub fn apply_fetch(&mut self, outcome: FetchOutcome) {
        if self.compare.apply(outcome) && self.compare.diff().is_none() {
            // A replaced snapshot invalidates everything derived from the old one.
            self.diff_items.clear();
            self.diff_selected = 0;
            self.diff_scroll_offset = 0;
            self.migration_sql = None;
        }
    }

    // Comparison
    pub fn run_compare(&mut self) -> bool {
        self.clear_error();
        let items = match self.compare.compare() {
            Ok(diff) => DiffItem::from_diff(diff),
            Err(e) => {
                tracing::debug!(error = %e, "comparison not run");
                return false;
            }
        };

        self.diff_items = items;
        self.diff_selected = 0;
        self.diff_scroll_offset = 0;
        self.migration_sql = None;
        self.mode = AppMode::Compare;
        true
    }

    pub fn diff_up(&mut self) {
        if self.diff_selected > 0 {
            self.diff_selected -= 1;
            if self.diff_selected < self.diff_scroll_offset {
                self.diff_scroll_offset = self.diff_selected;
            }
        }
    }

    pub fn diff_down(&mut self) {
        if self.diff_selected < self.diff_items.len().saturating_sub(1) {
            self.diff_selected += 1;
        }
    }

    pub fn adjust_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.diff_selected >= self.diff_scroll_offset + visible_height {
            self.diff_scroll_offset = self.diff_selected - visible_height + 1;
        } else if self.diff_selected < self.diff_scroll_offset {
            self.diff_scroll_offset = self.diff_selected;
        }
    }

    pub fn selected_diff_item(&self) -> Option<&DiffItem> {
        self.diff_items.get(self.diff_selected)
    }

    // Migration script
    pub fn generate_migration(&mut self) -> bool {
        self.clear_error();
        let options = self.config.settings.generate_options();
        match self.compare.generate_sql(&options) {
            Ok(sql) => {
                self.migration_sql = Some(sql);
                self.migration_scroll = 0;
                self.mode = AppMode::Migration;
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "migration not generated");
                false
            }
        }
    }

    pub fn migration_line_count(&self) -> u16 {
        self.migration_sql
            .as_deref()
            .map(|sql| sql.lines().count())
            .unwrap_or(0)
            .min(u16::MAX as usize) as u16
    }

    pub fn scroll_migration(&mut self, delta: i32) {
        let max = self.migration_line_count().saturating_sub(1) as i32;
        let next = (self.migration_scroll as i32 + delta).clamp(0, max.max(0));
        self.migration_scroll = next as u16;
    }

    pub fn export_migration(&mut self) -> Result<PathBuf> {
        let sql = self
            .migration_sql
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No migration script to export"))?;

        let dir = self.config.settings.export_dir();
        std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(format!("migration_{}.sql", Local::now().format("%Y%m%d_%H%M%S")));
        std::fs::write(&path, sql).with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!(path = %path.display(), "exported migration script");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SchemaSnapshot, TableColumn};
    use chrono::Utc;
    use tokio::sync::mpsc;

    fn app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(Config::default(), tx)
    }

    fn snapshot(tables: &[&str]) -> SchemaSnapshot {
        let columns = tables
            .iter()
            .map(|t| TableColumn {
                table_name: t.to_string(),
                column_name: "id".to_string(),
                data_type: "uuid".to_string(),
                is_nullable: false,
                column_default: None,
            })
            .collect();
        SchemaSnapshot::from_rows(columns, vec![], Utc::now())
    }

    fn deliver(app: &mut App, side: Side, tables: &[&str]) {
        let generation = app.compare.begin_fetch(side);
        app.apply_fetch(FetchOutcome {
            side,
            generation,
            result: Ok(snapshot(tables)),
        });
    }

    #[test]
    fn test_field_cycle() {
        let mut app = app();
        app.next_connection_field();
        assert_eq!(app.connection_field, ConnectionField::Url);
        app.prev_connection_field();
        app.prev_connection_field();
        assert_eq!(app.connection_field, ConnectionField::Key);
        app.input_char('x');
        app.input_char('y');
        app.delete_char();
        assert_eq!(app.key, "x");
    }

    #[test]
    fn test_compare_without_snapshots_reports_error() {
        let mut app = app();
        assert!(!app.run_compare());
        assert_eq!(app.mode, AppMode::ConnectionSelector);
        assert!(app.current_error().unwrap().contains("Source"));
    }

    #[test]
    fn test_compare_and_generate_flow() {
        let mut app = app();
        deliver(&mut app, Side::Source, &["users", "deployments"]);
        deliver(&mut app, Side::Target, &["users", "legacy"]);

        assert!(app.run_compare());
        assert_eq!(app.mode, AppMode::Compare);
        assert_eq!(
            app.diff_items,
            vec![
                DiffItem::NewTable("deployments".to_string()),
                DiffItem::RemovedTable("legacy".to_string())
            ]
        );

        app.diff_down();
        app.diff_down();
        assert_eq!(app.diff_selected, 1);

        assert!(app.generate_migration());
        assert_eq!(app.mode, AppMode::Migration);
        let sql = app.migration_sql.as_deref().unwrap();
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS public.deployments"));
        assert!(sql.contains("-- DROP TABLE IF EXISTS public.legacy;"));
    }

    #[test]
    fn test_generate_without_compare_stays_put() {
        let mut app = app();
        app.mode = AppMode::Compare;
        assert!(!app.generate_migration());
        assert_eq!(app.mode, AppMode::Compare);
        assert!(app.migration_sql.is_none());
        assert!(app.current_error().is_some());
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut app = app();
        app.migration_sql = Some("a\nb\nc".to_string());
        app.scroll_migration(10);
        assert_eq!(app.migration_scroll, 2);
        app.scroll_migration(-10);
        assert_eq!(app.migration_scroll, 0);
    }
}

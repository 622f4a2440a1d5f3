//! Migration script generation.
//!
//! Turns a [`SchemaDiff`] into a plain-text script that brings the deployed
//! schema in line with the desired one. Additive statements are emitted
//! live and written to be re-runnable (`IF NOT EXISTS`). Destructive
//! statements are only ever emitted behind `-- `.

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::db::{RlsPolicy, SchemaSnapshot, TableColumn};
use crate::diff::SchemaDiff;

pub const ATTRIBUTION: &str = "-- Migration generated by VibeOps Schema Compare";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Append commented notes for modified columns and policy changes,
    /// which have no generated statements.
    pub annotate_unrendered: bool,
}

pub fn generate_migration_now(diff: &SchemaDiff, source: &SchemaSnapshot, options: &GenerateOptions) -> String {
    generate_migration(diff, source, options, Utc::now())
}

pub fn generate_migration(
    diff: &SchemaDiff,
    source: &SchemaSnapshot,
    options: &GenerateOptions,
    generated_at: DateTime<Utc>,
) -> String {
    let mut sql = String::new();
    sql.push_str(ATTRIBUTION);
    sql.push('\n');
    let _ = writeln!(
        sql,
        "-- Generated at: {}",
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    sql.push('\n');

    for table in &diff.new_tables {
        let columns = source.table(table).map(|t| t.columns.as_slice()).unwrap_or_default();
        let name = quote_ident(table);
        let _ = writeln!(sql, "-- Create table: {}", name);
        let _ = writeln!(sql, "CREATE TABLE IF NOT EXISTS public.{} (", name);
        let defs: Vec<String> = columns.iter().map(|c| format!("  {}", column_definition(c))).collect();
        sql.push_str(&defs.join(",\n"));
        if !defs.is_empty() {
            sql.push('\n');
        }
        sql.push_str(");\n\n");
    }

    for changes in diff.modified_tables.iter().filter(|t| !t.new_columns.is_empty()) {
        let table = quote_ident(&changes.table);
        let _ = writeln!(sql, "-- Add columns to: {}", table);
        for column in &changes.new_columns {
            let _ = writeln!(
                sql,
                "ALTER TABLE public.{} ADD COLUMN IF NOT EXISTS {};",
                table,
                column_definition(column)
            );
        }
        sql.push('\n');
    }

    for changes in diff.modified_tables.iter().filter(|t| !t.removed_columns.is_empty()) {
        let table = quote_ident(&changes.table);
        let _ = writeln!(sql, "-- WARNING: columns below exist in {} but not in the source schema", table);
        sql.push_str("-- Dropping them deletes data. Uncomment only after review.\n");
        for column in &changes.removed_columns {
            let _ = writeln!(
                sql,
                "-- ALTER TABLE public.{} DROP COLUMN IF EXISTS {};",
                table,
                quote_ident(column)
            );
        }
        sql.push('\n');
    }

    if !diff.removed_tables.is_empty() {
        sql.push_str("-- WARNING: tables below exist in the target but not in the source schema\n");
        sql.push_str("-- Dropping them deletes data. Uncomment only after review.\n");
        for table in &diff.removed_tables {
            let _ = writeln!(sql, "-- DROP TABLE IF EXISTS public.{};", quote_ident(table));
        }
        sql.push('\n');
    }

    if options.annotate_unrendered {
        write_review_notes(&mut sql, diff);
    }

    sql
}

fn column_definition(column: &TableColumn) -> String {
    let mut def = format!(
        "{} {}",
        quote_ident(&column.column_name),
        single_line(&column.data_type).to_uppercase()
    );
    if !column.is_nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = &column.column_default {
        def.push_str(" DEFAULT ");
        def.push_str(default);
    }
    def
}

fn write_review_notes(sql: &mut String, diff: &SchemaDiff) {
    let modified: Vec<_> = diff
        .modified_tables
        .iter()
        .flat_map(|t| t.modified_columns.iter().map(move |c| (&t.table, c)))
        .collect();

    if modified.is_empty() && diff.added_policies.is_empty() && diff.removed_policies.is_empty() {
        return;
    }

    sql.push_str("-- REVIEW: no statements are generated for the changes below\n");
    for (table, change) in modified {
        let mut parts = Vec::new();
        if change.type_changed() {
            parts.push(format!(
                "type {} -> {}",
                single_line(&change.target.data_type),
                single_line(&change.source.data_type)
            ));
        }
        if change.nullability_changed() {
            parts.push(format!(
                "{} -> {}",
                nullability(change.target.is_nullable),
                nullability(change.source.is_nullable)
            ));
        }
        let _ = writeln!(
            sql,
            "--   column {}.{}: {}",
            quote_ident(table),
            quote_ident(&change.column),
            parts.join(", ")
        );
    }
    for policy in &diff.added_policies {
        let _ = writeln!(
            sql,
            "--   policy {} missing from target ({} for {})",
            policy_name(policy),
            policy.command.as_str(),
            policy.roles.iter().map(|r| quote_ident(r)).collect::<Vec<_>>().join(", ")
        );
    }
    for policy in &diff.removed_policies {
        let _ = writeln!(sql, "--   policy {} exists only in target", policy_name(policy));
    }
}

fn policy_name(policy: &RlsPolicy) -> String {
    format!("{}.{}", quote_ident(&policy.table_name), quote_ident(&policy.policy_name))
}

/// Renders an identifier so that it stays on one line of the script.
///
/// Plain lower-case names are emitted bare. Anything else is double-quoted
/// with embedded `"` doubled, and names holding control characters use the
/// `U&"..."` escape form, so a newline in a name can never end a `--`
/// comment early.
fn quote_ident(name: &str) -> String {
    if is_plain_ident(name) {
        return name.to_string();
    }
    if !name.chars().any(char::is_control) {
        return format!("\"{}\"", name.replace('"', "\"\""));
    }

    let mut quoted = String::from("U&\"");
    for ch in name.chars() {
        match ch {
            '"' => quoted.push_str("\"\""),
            '\\' => quoted.push_str("\\\\"),
            c if c.is_control() => {
                let _ = write!(quoted, "\\{:04x}", c as u32);
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn is_plain_ident(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
}

/// Free text (type names) with line breaks and other control characters
/// replaced by spaces.
fn single_line(text: &str) -> String {
    text.chars().map(|c| if c.is_control() { ' ' } else { c }).collect()
}

fn nullability(is_nullable: bool) -> &'static str {
    if is_nullable {
        "NULL"
    } else {
        "NOT NULL"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::PolicyCommand;
    use crate::diff::diff;
    use chrono::TimeZone;

    fn col(table: &str, name: &str, ty: &str, nullable: bool, default: Option<&str>) -> TableColumn {
        TableColumn {
            table_name: table.to_string(),
            column_name: name.to_string(),
            data_type: ty.to_string(),
            is_nullable: nullable,
            column_default: default.map(str::to_string),
        }
    }

    fn snapshot(columns: Vec<TableColumn>) -> SchemaSnapshot {
        SchemaSnapshot::from_rows(columns, vec![], Utc::now())
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap()
    }

    fn generate(source: &SchemaSnapshot, target: &SchemaSnapshot) -> String {
        generate_migration(&diff(source, target), source, &GenerateOptions::default(), fixed_time())
    }

    fn assert_no_live_drop(sql: &str) {
        for line in sql.lines() {
            if !line.trim_start().starts_with("--") {
                assert!(!line.to_uppercase().contains("DROP"), "live destructive line: {line}");
            }
        }
    }

    #[test]
    fn test_header_on_empty_diff() {
        let s = snapshot(vec![]);
        let sql = generate(&s, &s);
        let mut lines = sql.lines();
        assert_eq!(lines.next(), Some(ATTRIBUTION));
        assert_eq!(lines.next(), Some("-- Generated at: 2026-10-19T08:30:00.000Z"));
        assert!(lines.all(|l| l.trim().is_empty()));
    }

    #[test]
    fn test_new_table_rendering() {
        let source = snapshot(vec![
            col("posts", "id", "uuid", false, Some("gen_random_uuid()")),
            col("posts", "title", "text", false, None),
            col("posts", "body", "text", true, None),
        ]);
        let sql = generate(&source, &snapshot(vec![]));

        assert!(sql.contains(
            "CREATE TABLE IF NOT EXISTS public.posts (\n  id UUID NOT NULL DEFAULT gen_random_uuid(),\n  title TEXT NOT NULL,\n  body TEXT\n);"
        ));
    }

    #[test]
    fn test_add_column_statement() {
        let source = snapshot(vec![
            col("projects", "id", "uuid", false, None),
            col("projects", "score", "integer", false, Some("0")),
        ]);
        let target = snapshot(vec![col("projects", "id", "uuid", false, None)]);
        let sql = generate(&source, &target);

        assert!(sql.contains("ALTER TABLE public.projects ADD COLUMN IF NOT EXISTS score INTEGER NOT NULL DEFAULT 0;"));
    }

    #[test]
    fn test_destructive_statements_are_commented() {
        let source = snapshot(vec![col("projects", "id", "uuid", false, None)]);
        let target = snapshot(vec![
            col("projects", "id", "uuid", false, None),
            col("projects", "legacy_flag", "boolean", true, None),
            col("old_audit", "id", "bigint", false, None),
        ]);
        let sql = generate(&source, &target);

        assert!(sql.contains("-- ALTER TABLE public.projects DROP COLUMN IF EXISTS legacy_flag;"));
        assert!(sql.contains("-- DROP TABLE IF EXISTS public.old_audit;"));
        assert_no_live_drop(&sql);
    }

    #[test]
    fn test_emission_order() {
        let source = snapshot(vec![
            col("fresh", "id", "uuid", false, None),
            col("kept", "id", "uuid", false, None),
            col("kept", "added", "text", true, None),
        ]);
        let target = snapshot(vec![
            col("kept", "id", "uuid", false, None),
            col("kept", "gone", "text", true, None),
            col("stale", "id", "uuid", false, None),
        ]);
        let sql = generate(&source, &target);

        let create = sql.find("CREATE TABLE").unwrap();
        let add = sql.find("ADD COLUMN").unwrap();
        let drop_col = sql.find("DROP COLUMN").unwrap();
        let drop_table = sql.find("DROP TABLE").unwrap();
        assert!(create < add && add < drop_col && drop_col < drop_table);
    }

    #[test]
    fn test_modified_columns_not_rendered_by_default() {
        let source = snapshot(vec![col("users", "age", "bigint", false, None)]);
        let target = snapshot(vec![col("users", "age", "integer", true, None)]);
        let sql = generate(&source, &target);

        assert!(!sql.contains("age"));
        assert!(!sql.contains("REVIEW"));
    }

    #[test]
    fn test_review_notes_when_enabled() {
        let policy = RlsPolicy {
            schema_name: "public".to_string(),
            table_name: "users".to_string(),
            policy_name: "self_read".to_string(),
            permissive: "PERMISSIVE".to_string(),
            roles: vec!["authenticated".to_string()],
            command: PolicyCommand::Select,
            qual: Some("auth.uid() = id".to_string()),
            with_check: None,
        };
        let source = SchemaSnapshot::from_rows(
            vec![col("users", "age", "bigint", false, None)],
            vec![policy],
            Utc::now(),
        );
        let target = snapshot(vec![col("users", "age", "integer", true, None)]);
        let options = GenerateOptions {
            annotate_unrendered: true,
        };
        let sql = generate_migration(&diff(&source, &target), &source, &options, fixed_time());

        assert!(sql.contains("--   column users.age: type integer -> bigint, NULL -> NOT NULL"));
        assert!(sql.contains("--   policy users.self_read missing from target (SELECT for authenticated)"));
        assert!(sql
            .lines()
            .filter(|l| !l.trim().is_empty())
            .all(|l| l.starts_with("--")));
    }

    #[test]
    fn test_hostile_names_cannot_escape_comments() {
        let source = snapshot(vec![
            col("projects", "id", "uuid", false, None),
            col("projects", "note\"; DROP TABLE x; --", "text", true, None),
        ]);
        let target = snapshot(vec![
            col("projects", "id", "uuid", false, None),
            col("projects", "x\nDROP TABLE users", "text", true, None),
            col("old\nDROP TABLE accounts", "id", "bigint", false, None),
        ]);
        let sql = generate(&source, &target);

        for line in sql.lines() {
            assert!(!line.trim_start().to_uppercase().starts_with("DROP"), "live destructive line: {line}");
        }
        assert!(sql.contains(r#"-- ALTER TABLE public.projects DROP COLUMN IF EXISTS U&"x\000aDROP TABLE users";"#));
        assert!(sql.contains(r#"-- DROP TABLE IF EXISTS public.U&"old\000aDROP TABLE accounts";"#));
        assert!(sql.contains(r#"ADD COLUMN IF NOT EXISTS "note""; DROP TABLE x; --" TEXT;"#));
    }

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(quote_ident("user_id"), "user_id");
        assert_eq!(quote_ident("_tmp$1"), "_tmp$1");
        assert_eq!(quote_ident("UserId"), "\"UserId\"");
        assert_eq!(quote_ident("2fa"), "\"2fa\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_ident("a\\b\r"), r#"U&"a\\b\000d""#);
    }

    #[test]
    fn test_deterministic_for_fixed_time() {
        let source = snapshot(vec![col("a", "id", "uuid", false, None)]);
        let target = snapshot(vec![col("b", "id", "uuid", false, None)]);
        assert_eq!(generate(&source, &target), generate(&source, &target));
    }
}

mod connection;
mod queries;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

pub use connection::{DbConnection, Endpoint};
pub use queries::*;

/// One column of one table, as reported by the introspection query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub column_default: Option<String>,
}

impl TableColumn {
    /// Builds a column from the raw `is_nullable` indicator (`YES` / `NO`).
    pub fn from_raw(
        table_name: String,
        column_name: String,
        data_type: String,
        is_nullable: &str,
        column_default: Option<String>,
    ) -> Self {
        Self {
            table_name,
            column_name,
            data_type,
            is_nullable: is_nullable.trim().eq_ignore_ascii_case("yes"),
            column_default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyCommand {
    Select,
    Insert,
    Update,
    Delete,
    All,
}

impl PolicyCommand {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SELECT" | "R" => Self::Select,
            "INSERT" | "A" => Self::Insert,
            "UPDATE" | "W" => Self::Update,
            "DELETE" | "D" => Self::Delete,
            _ => Self::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::All => "ALL",
        }
    }
}

/// A row-level security policy attached to a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RlsPolicy {
    pub schema_name: String,
    pub table_name: String,
    pub policy_name: String,
    pub permissive: String,
    pub roles: Vec<String>,
    pub command: PolicyCommand,
    pub qual: Option<String>,
    pub with_check: Option<String>,
}

impl RlsPolicy {
    /// Identity used when comparing policies across snapshots.
    pub fn key(&self) -> String {
        format!("{}.{}", self.table_name, self.policy_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<TableColumn>,
    pub policies: Vec<RlsPolicy>,
}

impl TableInfo {
    fn new(name: String) -> Self {
        Self {
            name,
            columns: Vec::new(),
            policies: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.column_name == name)
    }
}

/// A point-in-time capture of a database's tables, columns and policies.
///
/// Tables keep the order in which the introspection query first reported
/// them, and columns keep their ordinal order. Table names are unique, and
/// column names are unique within a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSnapshot {
    tables: IndexMap<String, TableInfo>,
    captured_at: DateTime<Utc>,
}

impl SchemaSnapshot {
    /// Groups flat column and policy rows into tables.
    ///
    /// Duplicate `(table, column)` rows and duplicate `table.policy` keys keep
    /// their first occurrence.
    pub fn from_rows(
        columns: Vec<TableColumn>,
        policies: Vec<RlsPolicy>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        let mut tables: IndexMap<String, TableInfo> = IndexMap::new();

        for column in columns {
            let table = tables
                .entry(column.table_name.clone())
                .or_insert_with(|| TableInfo::new(column.table_name.clone()));

            if table.column(&column.column_name).is_some() {
                tracing::warn!(
                    table = %column.table_name,
                    column = %column.column_name,
                    "duplicate column row in introspection result, keeping the first"
                );
                continue;
            }
            table.columns.push(column);
        }

        for policy in policies {
            let table = tables
                .entry(policy.table_name.clone())
                .or_insert_with(|| TableInfo::new(policy.table_name.clone()));

            if table
                .policies
                .iter()
                .any(|p| p.policy_name == policy.policy_name)
            {
                tracing::warn!(policy = %policy.key(), "duplicate policy row, keeping the first");
                continue;
            }
            table.policies.push(policy);
        }

        Self {
            tables,
            captured_at,
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.get(name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableInfo> {
        self.tables.values()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn policies(&self) -> impl Iterator<Item = &RlsPolicy> {
        self.tables.values().flat_map(|t| t.policies.iter())
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(table: &str, name: &str, ty: &str, nullable: &str) -> TableColumn {
        TableColumn::from_raw(table.into(), name.into(), ty.into(), nullable, None)
    }

    fn policy(table: &str, name: &str) -> RlsPolicy {
        RlsPolicy {
            schema_name: "public".into(),
            table_name: table.into(),
            policy_name: name.into(),
            permissive: "PERMISSIVE".into(),
            roles: vec!["authenticated".into()],
            command: PolicyCommand::Select,
            qual: Some("(auth.uid() = user_id)".into()),
            with_check: None,
        }
    }

    #[test]
    fn test_nullability_from_indicator() {
        assert!(col("t", "a", "text", "YES").is_nullable);
        assert!(col("t", "a", "text", "yes").is_nullable);
        assert!(!col("t", "a", "text", "NO").is_nullable);
        assert!(!col("t", "a", "text", "").is_nullable);
    }

    #[test]
    fn test_groups_rows_by_table_in_order() {
        let snapshot = SchemaSnapshot::from_rows(
            vec![
                col("users", "id", "uuid", "NO"),
                col("posts", "id", "uuid", "NO"),
                col("users", "email", "text", "NO"),
                col("posts", "title", "text", "YES"),
            ],
            vec![],
            Utc::now(),
        );

        let names: Vec<_> = snapshot.tables().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["users", "posts"]);

        let users = snapshot.table("users").unwrap();
        let cols: Vec<_> = users.columns.iter().map(|c| c.column_name.as_str()).collect();
        assert_eq!(cols, vec!["id", "email"]);
    }

    #[test]
    fn test_duplicate_column_keeps_first() {
        let snapshot = SchemaSnapshot::from_rows(
            vec![col("t", "a", "text", "NO"), col("t", "a", "integer", "YES")],
            vec![],
            Utc::now(),
        );

        let table = snapshot.table("t").unwrap();
        assert_eq!(table.columns.len(), 1);
        assert_eq!(table.columns[0].data_type, "text");
    }

    #[test]
    fn test_policies_attach_to_tables() {
        let snapshot = SchemaSnapshot::from_rows(
            vec![col("posts", "id", "uuid", "NO")],
            vec![
                policy("posts", "owner_read"),
                policy("posts", "owner_read"),
                policy("audit", "admins_only"),
            ],
            Utc::now(),
        );

        assert_eq!(snapshot.table("posts").unwrap().policies.len(), 1);
        let audit = snapshot.table("audit").unwrap();
        assert!(audit.columns.is_empty());
        assert_eq!(audit.policies[0].key(), "audit.admins_only");
        assert_eq!(snapshot.policies().count(), 2);
    }

    #[test]
    fn test_policy_command_parse() {
        assert_eq!(PolicyCommand::parse("select"), PolicyCommand::Select);
        assert_eq!(PolicyCommand::parse("w"), PolicyCommand::Update);
        assert_eq!(PolicyCommand::parse("*"), PolicyCommand::All);
    }
}

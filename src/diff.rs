//! Schema diffing - compare a desired schema against a deployed one.
//!
//! The *source* snapshot is the desired end state and the *target* snapshot
//! is what is currently deployed. Anything present only in the source is
//! "new"; anything present only in the target is "removed". A migration
//! generated from the diff moves the target towards the source.

use std::collections::HashSet;

use crate::db::{RlsPolicy, SchemaSnapshot, TableColumn, TableInfo};

/// A diff between two schema snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    /// Tables present only in the source.
    pub new_tables: Vec<String>,
    /// Tables present only in the target.
    pub removed_tables: Vec<String>,
    /// Tables present in both with at least one column difference.
    pub modified_tables: Vec<TableChanges>,
    pub added_policies: Vec<RlsPolicy>,
    pub removed_policies: Vec<RlsPolicy>,
}

impl SchemaDiff {
    /// Count total number of changes.
    ///
    /// A modified table counts once no matter how many of its columns changed.
    pub fn change_count(&self) -> usize {
        self.new_tables.len()
            + self.removed_tables.len()
            + self.modified_tables.len()
            + self.added_policies.len()
            + self.removed_policies.len()
    }

    /// Returns true if there are no differences.
    pub fn is_empty(&self) -> bool {
        self.change_count() == 0
    }
}

/// Column-level changes for a table present on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableChanges {
    pub table: String,
    pub new_columns: Vec<TableColumn>,
    pub removed_columns: Vec<String>,
    pub modified_columns: Vec<ColumnChange>,
}

impl TableChanges {
    fn is_empty(&self) -> bool {
        self.new_columns.is_empty() && self.removed_columns.is_empty() && self.modified_columns.is_empty()
    }
}

/// A column whose type or nullability differs between the two sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChange {
    pub column: String,
    pub source: TableColumn,
    pub target: TableColumn,
}

impl ColumnChange {
    pub fn type_changed(&self) -> bool {
        self.source.data_type != self.target.data_type
    }

    pub fn nullability_changed(&self) -> bool {
        self.source.is_nullable != self.target.is_nullable
    }
}

/// Compare `source` (desired) against `target` (deployed).
pub fn diff(source: &SchemaSnapshot, target: &SchemaSnapshot) -> SchemaDiff {
    let new_tables = source
        .tables()
        .filter(|t| !target.contains_table(&t.name))
        .map(|t| t.name.clone())
        .collect();

    let removed_tables = target
        .tables()
        .filter(|t| !source.contains_table(&t.name))
        .map(|t| t.name.clone())
        .collect();

    let modified_tables = source
        .tables()
        .filter_map(|desired| {
            let current = target.table(&desired.name)?;
            let changes = diff_table(desired, current);
            (!changes.is_empty()).then_some(changes)
        })
        .collect();

    let (added_policies, removed_policies) = diff_policies(source, target);

    SchemaDiff {
        new_tables,
        removed_tables,
        modified_tables,
        added_policies,
        removed_policies,
    }
}

fn diff_table(desired: &TableInfo, current: &TableInfo) -> TableChanges {
    let mut new_columns = Vec::new();
    let mut modified_columns = Vec::new();

    for column in &desired.columns {
        match current.column(&column.column_name) {
            None => new_columns.push(column.clone()),
            Some(existing) => {
                if column.data_type != existing.data_type || column.is_nullable != existing.is_nullable {
                    modified_columns.push(ColumnChange {
                        column: column.column_name.clone(),
                        source: column.clone(),
                        target: existing.clone(),
                    });
                }
            }
        }
    }

    let removed_columns = current
        .columns
        .iter()
        .filter(|c| desired.column(&c.column_name).is_none())
        .map(|c| c.column_name.clone())
        .collect();

    TableChanges {
        table: desired.name.clone(),
        new_columns,
        removed_columns,
        modified_columns,
    }
}

fn diff_policies(source: &SchemaSnapshot, target: &SchemaSnapshot) -> (Vec<RlsPolicy>, Vec<RlsPolicy>) {
    let source_keys: HashSet<String> = source.policies().map(RlsPolicy::key).collect();
    let target_keys: HashSet<String> = target.policies().map(RlsPolicy::key).collect();

    let added = source
        .policies()
        .filter(|p| !target_keys.contains(&p.key()))
        .cloned()
        .collect();
    let removed = target
        .policies()
        .filter(|p| !source_keys.contains(&p.key()))
        .cloned()
        .collect();

    (added, removed)
}

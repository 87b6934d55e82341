//! Shared Table & Operation Types
//!
//! The structured form of a client request once the front end has parsed it.
//! An `Operation` is built per request, consumed once by a `ReplicaSetManager`
//! and never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage model of a table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TableKind {
    #[serde(rename = "SQL")]
    Sql,
    #[serde(rename = "NoSQL")]
    NoSql,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Sql => write!(f, "SQL"),
            TableKind::NoSql => write!(f, "NoSQL"),
        }
    }
}

impl FromStr for TableKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SQL" => Ok(TableKind::Sql),
            "NoSQL" => Ok(TableKind::NoSql),
            other => Err(format!("unknown table kind: {}", other)),
        }
    }
}

/// Immutable description of a table, fixed at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableDef {
    pub name: String,
    pub kind: TableKind,
    /// Ordered column list for SQL tables; `None` for schemaless NoSQL tables.
    pub columns: Option<Vec<String>>,
}

impl TableDef {
    pub fn sql(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: TableKind::Sql,
            columns: Some(columns.iter().map(|c| c.to_string()).collect()),
        }
    }

    pub fn nosql(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: TableKind::NoSql,
            columns: None,
        }
    }

    /// Registry key, e.g. `students-SQL`.
    pub fn key(&self) -> String {
        table_key(&self.name, self.kind)
    }

    /// The name becomes part of every replica's file name and node URL, so it
    /// is limited to ASCII letters, digits and `_`.
    pub fn has_valid_name(&self) -> bool {
        !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

pub fn table_key(name: &str, kind: TableKind) -> String {
    format!("{}-{}", name, kind)
}

/// Identity of one replica: `tableName-kind-partitionId-replicaIndex`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ReplicaId {
    pub table: String,
    pub kind: TableKind,
    pub partition: usize,
    pub replica: usize,
}

impl ReplicaId {
    pub fn new(table: &TableDef, partition: usize, replica: usize) -> Self {
        Self {
            table: table.name.clone(),
            kind: table.kind,
            partition,
            replica,
        }
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.table, self.kind, self.partition, self.replica
        )
    }
}

/// Single-column equality condition (`column = value`).
///
/// For NoSQL tables `column` is a key and a row matches when any of its
/// key/value pairs equals `(column, value)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub value: String,
}

impl Predicate {
    pub fn new(column: &str, value: &str) -> Self {
        Self {
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
    Select,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    pub table: String,
    /// Column names (SQL) or keys (NoSQL) for Insert/Update.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Values aligned with `columns`.
    #[serde(default)]
    pub values: Vec<String>,
    /// Equality condition for Update/Delete.
    #[serde(default, rename = "where")]
    pub predicate: Option<Predicate>,
}

impl Operation {
    pub fn insert(table: &str, columns: &[&str], values: &[&str]) -> Self {
        Self {
            kind: OperationKind::Insert,
            table: table.to_string(),
            columns: to_strings(columns),
            values: to_strings(values),
            predicate: None,
        }
    }

    pub fn update(table: &str, columns: &[&str], values: &[&str], predicate: Predicate) -> Self {
        Self {
            kind: OperationKind::Update,
            table: table.to_string(),
            columns: to_strings(columns),
            values: to_strings(values),
            predicate: Some(predicate),
        }
    }

    pub fn delete(table: &str, predicate: Predicate) -> Self {
        Self {
            kind: OperationKind::Delete,
            table: table.to_string(),
            columns: Vec::new(),
            values: Vec::new(),
            predicate: Some(predicate),
        }
    }

    pub fn select(table: &str) -> Self {
        Self {
            kind: OperationKind::Select,
            table: table.to_string(),
            columns: Vec::new(),
            values: Vec::new(),
            predicate: None,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

use crate::error::{Error, Result};
use crate::types::{TableDef, TableKind};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Upper bound on partitions per table.
pub const MAX_PARTITIONS: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PartitionType {
    /// Everything lives in partition 0.
    #[default]
    None,
    /// Rows are spread by `int(key) mod partition_count`.
    Horizontal,
    /// Columns are spread by their owning column group.
    Vertical,
}

impl fmt::Display for PartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionType::None => write!(f, "none"),
            PartitionType::Horizontal => write!(f, "horizontal"),
            PartitionType::Vertical => write!(f, "vertical"),
        }
    }
}

/// How a table is split across partitions. Fixed at table creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartitionSpec {
    #[serde(rename = "type", default)]
    pub partition_type: PartitionType,
    #[serde(default = "default_partition_count")]
    pub partition_count: usize,
    /// One column list per partition, vertical only.
    #[serde(default)]
    pub column_groups: Option<Vec<Vec<String>>>,
}

fn default_partition_count() -> usize {
    1
}

impl Default for PartitionSpec {
    fn default() -> Self {
        Self::none()
    }
}

impl PartitionSpec {
    pub fn none() -> Self {
        Self {
            partition_type: PartitionType::None,
            partition_count: 1,
            column_groups: None,
        }
    }

    pub fn horizontal(partition_count: usize) -> Self {
        Self {
            partition_type: PartitionType::Horizontal,
            partition_count,
            column_groups: None,
        }
    }

    pub fn vertical(groups: &[&[&str]]) -> Self {
        Self {
            partition_type: PartitionType::Vertical,
            partition_count: groups.len(),
            column_groups: Some(
                groups
                    .iter()
                    .map(|group| group.iter().map(|c| c.to_string()).collect())
                    .collect(),
            ),
        }
    }

    /// Rejects any layout the router could not serve for `table`.
    pub fn validate(&self, table: &TableDef) -> Result<()> {
        if self.partition_count == 0 || self.partition_count > MAX_PARTITIONS {
            return Err(Error::Config(format!(
                "partition count must be between 1 and {}, got {}",
                MAX_PARTITIONS, self.partition_count
            )));
        }

        match self.partition_type {
            PartitionType::None => {
                if self.partition_count != 1 {
                    return Err(Error::Config(format!(
                        "unpartitioned table uses exactly one partition, got {}",
                        self.partition_count
                    )));
                }
                self.reject_column_groups()
            }
            PartitionType::Horizontal => self.reject_column_groups(),
            PartitionType::Vertical => self.validate_column_groups(table),
        }
    }

    fn reject_column_groups(&self) -> Result<()> {
        if self.column_groups.is_some() {
            return Err(Error::Config(format!(
                "column groups are only allowed for vertical partitioning, not {}",
                self.partition_type
            )));
        }
        Ok(())
    }

    fn validate_column_groups(&self, table: &TableDef) -> Result<()> {
        if table.kind == TableKind::NoSql {
            return Err(Error::Config(
                "NoSQL tables cannot be partitioned vertically".to_string(),
            ));
        }
        let Some(columns) = &table.columns else {
            return Err(Error::Config(
                "vertical partitioning requires a column list".to_string(),
            ));
        };
        let Some(groups) = &self.column_groups else {
            return Err(Error::Config(
                "vertical partitioning requires column groups".to_string(),
            ));
        };

        if groups.len() != self.partition_count {
            return Err(Error::Config(format!(
                "expected {} column groups, got {}",
                self.partition_count,
                groups.len()
            )));
        }

        let table_columns: HashSet<&str> = columns.iter().map(String::as_str).collect();
        let mut seen: HashSet<&str> = HashSet::new();

        for (idx, group) in groups.iter().enumerate() {
            if group.is_empty() {
                return Err(Error::Config(format!("column group {} is empty", idx)));
            }
            for column in group {
                if !table_columns.contains(column.as_str()) {
                    return Err(Error::Config(format!(
                        "column group {} names unknown column '{}'",
                        idx, column
                    )));
                }
                if !seen.insert(column.as_str()) {
                    return Err(Error::Config(format!(
                        "column '{}' appears in more than one group",
                        column
                    )));
                }
            }
        }

        if let Some(missing) = columns.iter().find(|c| !seen.contains(c.as_str())) {
            return Err(Error::Config(format!(
                "column '{}' is not assigned to any group",
                missing
            )));
        }

        Ok(())
    }
}

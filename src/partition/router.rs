use super::types::{PartitionSpec, PartitionType};
use crate::error::{Error, Result};
use crate::types::{Predicate, TableDef};

use std::collections::HashMap;
use std::ops::Range;

/// The columns and values one partition receives from a single write.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSlice {
    pub partition: usize,
    pub columns: Vec<String>,
    pub values: Vec<String>,
}

pub struct PartitionRouter {
    spec: PartitionSpec,
    /// Column -> owning group, vertical only.
    column_to_group: HashMap<String, usize>,
}

impl PartitionRouter {
    /// Validates `spec` against `table` and builds the static routing tables.
    pub fn new(spec: PartitionSpec, table: &TableDef) -> Result<Self> {
        spec.validate(table)?;

        let mut column_to_group = HashMap::new();
        if let Some(groups) = &spec.column_groups {
            for (group, columns) in groups.iter().enumerate() {
                for column in columns {
                    column_to_group.insert(column.clone(), group);
                }
            }
        }

        Ok(Self {
            spec,
            column_to_group,
        })
    }

    pub fn spec(&self) -> &PartitionSpec {
        &self.spec
    }

    pub fn partition_type(&self) -> PartitionType {
        self.spec.partition_type
    }

    pub fn partition_count(&self) -> usize {
        self.spec.partition_count
    }

    /// All partition ids in ascending order.
    pub fn partitions(&self) -> Range<usize> {
        0..self.spec.partition_count
    }

    pub fn group_of(&self, column: &str) -> Option<usize> {
        self.column_to_group.get(column).copied()
    }

    /// Horizontal placement of a key value: `int(key) mod partition_count`.
    ///
    /// Quotes around the value are ignored, so `'7'` and `7` land together.
    pub fn partition_for_key(&self, key: &str) -> Result<usize> {
        let trimmed = key.trim().trim_matches('\'');
        let parsed: i64 = trimmed.parse().map_err(|_| {
            Error::InvalidOperation(format!(
                "horizontal partition key must be an integer, got '{}'",
                key
            ))
        })?;

        Ok(parsed.rem_euclid(self.spec.partition_count as i64) as usize)
    }

    /// Splits an insert into the per-partition writes it turns into.
    ///
    /// Vertical inserts yield one slice per group, in group order, even when a
    /// group receives no columns, so every partition grows by exactly one row.
    pub fn route_insert(&self, columns: &[String], values: &[String]) -> Result<Vec<ColumnSlice>> {
        match self.spec.partition_type {
            PartitionType::None => Ok(vec![whole(0, columns, values)]),
            PartitionType::Horizontal => {
                let key = values.first().ok_or_else(|| {
                    Error::InvalidOperation("insert carries no partition key".to_string())
                })?;
                let partition = self.partition_for_key(key)?;
                tracing::debug!("Key {} routed to partition {}", key, partition);
                Ok(vec![whole(partition, columns, values)])
            }
            PartitionType::Vertical => self.split_by_group(columns, values, true),
        }
    }

    /// The partition that evaluates `predicate`: the key's partition when
    /// horizontal, the group owning the column when vertical.
    ///
    /// Horizontal routing trusts that the predicate is on the partition key;
    /// any other column is routed by its value all the same.
    pub fn route_predicate(&self, predicate: &Predicate) -> Result<usize> {
        match self.spec.partition_type {
            PartitionType::None => Ok(0),
            PartitionType::Horizontal => self.partition_for_key(&predicate.value),
            PartitionType::Vertical => self.group_of(&predicate.column).ok_or_else(|| {
                Error::InvalidOperation(format!(
                    "column '{}' belongs to no partition",
                    predicate.column
                ))
            }),
        }
    }

    /// Vertical update assignments grouped by owning partition. Groups that
    /// receive no assignment are left out.
    pub fn split_assignments(
        &self,
        columns: &[String],
        values: &[String],
    ) -> Result<Vec<ColumnSlice>> {
        self.split_by_group(columns, values, false)
    }

    fn split_by_group(
        &self,
        columns: &[String],
        values: &[String],
        keep_empty: bool,
    ) -> Result<Vec<ColumnSlice>> {
        let mut slices: Vec<ColumnSlice> = self
            .partitions()
            .map(|partition| ColumnSlice {
                partition,
                columns: Vec::new(),
                values: Vec::new(),
            })
            .collect();

        for (column, value) in columns.iter().zip(values) {
            let group = self.group_of(column).ok_or_else(|| {
                Error::InvalidOperation(format!("column '{}' belongs to no partition", column))
            })?;
            slices[group].columns.push(column.clone());
            slices[group].values.push(value.clone());
        }

        if !keep_empty {
            slices.retain(|slice| !slice.columns.is_empty());
        }

        Ok(slices)
    }
}

fn whole(partition: usize, columns: &[String], values: &[String]) -> ColumnSlice {
    ColumnSlice {
        partition,
        columns: columns.to_vec(),
        values: values.to_vec(),
    }
}

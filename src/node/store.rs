//! Record Store
//!
//! Durable, line-oriented table file backing exactly one replica.
//!
//! ## Mutation Model
//! - **Insert** appends one line and never touches existing rows.
//! - **Update / Delete / *ByPositions** read the whole file, build the new row
//!   list in memory, write it to a temp file, fsync it and atomically rename it
//!   over the original. When nothing matched, no temp file is written at all.
//!   An I/O failure removes the temp file and leaves the original intact.
//!
//! ## Locking
//! One `RwLock` per store: selects share the read side, every mutation takes
//! the write side for the full read-modify-replace cycle.

use super::row;
use crate::types::Predicate;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt store {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

/// Parsed file content: optional header line plus data rows in append order.
struct Contents {
    header: Option<String>,
    rows: Vec<String>,
}

pub struct RecordStore {
    path: PathBuf,
    /// Column order for SQL stores (the header); `None` for NoSQL.
    columns: Option<Vec<String>>,
    lock: RwLock<()>,
}

impl RecordStore {
    /// Creates (or truncates) the store file. SQL stores start with their
    /// header row; NoSQL stores start empty.
    pub async fn create(
        path: impl Into<PathBuf>,
        columns: Option<Vec<String>>,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let initial = match &columns {
            Some(columns) => format!("{}\n", row::render_header(columns)),
            None => String::new(),
        };
        fs::write(&path, initial).await?;

        tracing::debug!("Created record store at {}", path.display());

        Ok(Self {
            path,
            columns,
            lock: RwLock::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// All data rows in append order, header excluded.
    pub async fn select(&self) -> Result<Vec<String>, StoreError> {
        let _guard = self.lock.read().await;
        Ok(self.read_contents().await?.rows)
    }

    /// Raw file content, header included.
    pub async fn read_raw(&self) -> Result<String, StoreError> {
        let _guard = self.lock.read().await;
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Appends one row. SQL values are laid out in the table's column order;
    /// NoSQL keys/values are stored as a flattened pair sequence.
    pub async fn insert(&self, columns: &[String], values: &[String]) -> Result<(), StoreError> {
        let line = match &self.columns {
            Some(table_columns) => {
                row::render_fields(&row::sql_row(table_columns, columns, values))
            }
            None => row::render_pairs(&zip_pairs(columns, values)),
        };

        let _guard = self.lock.write().await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", line).as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;

        Ok(())
    }

    /// Overwrites `columns` with `values` in every row matching `predicate`.
    /// Returns the 0-based positions of the matched rows.
    pub async fn update(
        &self,
        columns: &[String],
        values: &[String],
        predicate: &Predicate,
    ) -> Result<Vec<usize>, StoreError> {
        let _guard = self.lock.write().await;
        let contents = self.read_contents().await?;
        let assignments = zip_pairs(columns, values);

        let Some(matches) = self.matching_positions(&contents.rows, predicate) else {
            return Ok(Vec::new());
        };
        if matches.is_empty() {
            return Ok(matches);
        }

        let rows = self.assign_at(&contents.rows, &matches, &assignments);
        self.rewrite(contents.header.as_deref(), &rows).await?;

        Ok(matches)
    }

    /// Applies assignments to the rows at `positions` regardless of content.
    /// Returns how many rows were touched.
    pub async fn update_by_positions(
        &self,
        positions: &[usize],
        columns: &[String],
        values: &[String],
    ) -> Result<usize, StoreError> {
        let _guard = self.lock.write().await;
        let contents = self.read_contents().await?;
        let assignments = zip_pairs(columns, values);

        let targets: Vec<usize> = positions
            .iter()
            .copied()
            .filter(|&pos| pos < contents.rows.len())
            .collect();
        if targets.is_empty() {
            return Ok(0);
        }

        let rows = self.assign_at(&contents.rows, &targets, &assignments);
        self.rewrite(contents.header.as_deref(), &rows).await?;

        Ok(targets.len())
    }

    /// Removes every row matching `predicate`. Returns the removed positions,
    /// numbered before the delete.
    pub async fn delete(&self, predicate: &Predicate) -> Result<Vec<usize>, StoreError> {
        let _guard = self.lock.write().await;
        let contents = self.read_contents().await?;

        let Some(matches) = self.matching_positions(&contents.rows, predicate) else {
            return Ok(Vec::new());
        };
        if matches.is_empty() {
            return Ok(matches);
        }

        let rows = retain_except(&contents.rows, &matches);
        self.rewrite(contents.header.as_deref(), &rows).await?;

        Ok(matches)
    }

    /// Removes exactly the rows at `positions`, regardless of content.
    /// Returns how many rows were removed.
    pub async fn delete_by_positions(&self, positions: &[usize]) -> Result<usize, StoreError> {
        let _guard = self.lock.write().await;
        let contents = self.read_contents().await?;

        let rows = retain_except(&contents.rows, positions);
        let removed = contents.rows.len() - rows.len();
        if removed == 0 {
            return Ok(0);
        }

        self.rewrite(contents.header.as_deref(), &rows).await?;

        Ok(removed)
    }

    /// Positions of rows matching `predicate`, or `None` when a SQL store has
    /// no such column.
    fn matching_positions(&self, rows: &[String], predicate: &Predicate) -> Option<Vec<usize>> {
        match &self.columns {
            Some(table_columns) => {
                let Some(where_idx) = table_columns.iter().position(|c| c == &predicate.column)
                else {
                    tracing::warn!(
                        "Where column '{}' not found in {}",
                        predicate.column,
                        self.path.display()
                    );
                    return None;
                };

                Some(
                    rows.iter()
                        .enumerate()
                        .filter(|(_, line)| {
                            let fields = row::parse_sql_row(line, table_columns.len());
                            fields[where_idx] == predicate.value
                        })
                        .map(|(pos, _)| pos)
                        .collect(),
                )
            }
            None => Some(
                rows.iter()
                    .enumerate()
                    .filter(|(_, line)| {
                        row::parse_pairs(line)
                            .iter()
                            .any(|(k, v)| k == &predicate.column && v == &predicate.value)
                    })
                    .map(|(pos, _)| pos)
                    .collect(),
            ),
        }
    }

    fn assign_at(
        &self,
        rows: &[String],
        positions: &[usize],
        assignments: &[(String, String)],
    ) -> Vec<String> {
        let targets: HashSet<usize> = positions.iter().copied().collect();

        rows.iter()
            .enumerate()
            .map(|(pos, line)| {
                if !targets.contains(&pos) {
                    return line.clone();
                }
                match &self.columns {
                    Some(table_columns) => {
                        let mut fields = row::parse_sql_row(line, table_columns.len());
                        for (column, value) in assignments {
                            if let Some(idx) = table_columns.iter().position(|c| c == column) {
                                fields[idx] = value.clone();
                            }
                        }
                        row::render_fields(&fields)
                    }
                    None => {
                        // Only keys already present in the row are overwritten.
                        let mut pairs = row::parse_pairs(line);
                        for (key, value) in assignments {
                            for pair in pairs.iter_mut().filter(|(k, _)| k == key) {
                                pair.1 = value.clone();
                            }
                        }
                        row::render_pairs(&pairs)
                    }
                }
            })
            .collect()
    }

    async fn read_contents(&self) -> Result<Contents, StoreError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Contents {
                    header: None,
                    rows: Vec::new(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut lines = content.lines();
        let header = match &self.columns {
            Some(_) => match lines.next() {
                Some(header) => Some(header.to_string()),
                None => {
                    return Err(StoreError::Corrupt {
                        path: self.path.display().to_string(),
                        reason: "missing header row".to_string(),
                    });
                }
            },
            None => None,
        };

        let rows = lines
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Contents { header, rows })
    }

    async fn rewrite(&self, header: Option<&str>, rows: &[String]) -> Result<(), StoreError> {
        let mut content = String::new();
        if let Some(header) = header {
            content.push_str(header);
            content.push('\n');
        }
        for line in rows {
            content.push_str(line);
            content.push('\n');
        }

        let temp_path = self.temp_path();
        if let Err(e) = write_synced(&temp_path, content.as_bytes()).await {
            tracing::error!("Failed to write temp file {}: {}", temp_path.display(), e);
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            tracing::error!("Failed to replace {}: {}", self.path.display(), e);
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path
            .with_file_name(format!("temp-{}-{}", Uuid::new_v4(), file_name))
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

fn zip_pairs(columns: &[String], values: &[String]) -> Vec<(String, String)> {
    columns.iter().cloned().zip(values.iter().cloned()).collect()
}

fn retain_except(rows: &[String], positions: &[usize]) -> Vec<String> {
    let skip: HashSet<usize> = positions.iter().copied().collect();
    rows.iter()
        .enumerate()
        .filter(|(pos, _)| !skip.contains(pos))
        .map(|(_, line)| line.clone())
        .collect()
}

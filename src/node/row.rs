//! Row text format.
//!
//! One row per line. Every field is terminated by `,`, so a SQL row for
//! `(id, name, age)` reads `1,'Alice',20,` and a NoSQL row is the flattened
//! key/value sequence `k1,v1,k2,v2,`. The SQL header is the column list joined
//! by `,` without a trailing separator.

pub const FIELD_SEPARATOR: char = ',';

pub fn parse_fields(line: &str) -> Vec<String> {
    let body = line.strip_suffix(FIELD_SEPARATOR).unwrap_or(line);
    body.split(FIELD_SEPARATOR).map(str::to_string).collect()
}

pub fn render_fields(fields: &[String]) -> String {
    let mut row = String::new();
    for field in fields {
        row.push_str(field);
        row.push(FIELD_SEPARATOR);
    }
    row
}

pub fn render_header(columns: &[String]) -> String {
    columns.join(",")
}

pub fn parse_header(line: &str) -> Vec<String> {
    line.split(FIELD_SEPARATOR).map(str::to_string).collect()
}

/// Lays `values` out in the table's column order. Columns that were not
/// supplied render as empty fields.
pub fn sql_row(table_columns: &[String], columns: &[String], values: &[String]) -> Vec<String> {
    table_columns
        .iter()
        .map(|column| {
            columns
                .iter()
                .position(|c| c == column)
                .and_then(|idx| values.get(idx))
                .cloned()
                .unwrap_or_default()
        })
        .collect()
}

/// Reads a fixed-width SQL row, padding short lines to `width` fields.
pub fn parse_sql_row(line: &str, width: usize) -> Vec<String> {
    let mut fields = parse_fields(line);
    if fields.len() < width {
        fields.resize(width, String::new());
    }
    fields
}

pub fn parse_pairs(line: &str) -> Vec<(String, String)> {
    let fields = parse_fields(line);
    fields
        .chunks(2)
        .map(|pair| {
            let key = pair[0].clone();
            let value = pair.get(1).cloned().unwrap_or_default();
            (key, value)
        })
        .collect()
}

pub fn render_pairs(pairs: &[(String, String)]) -> String {
    let mut row = String::new();
    for (key, value) in pairs {
        row.push_str(key);
        row.push(FIELD_SEPARATOR);
        row.push_str(value);
        row.push(FIELD_SEPARATOR);
    }
    row
}

//! The in-memory table questions are answered against.
//!
//! A [`Dataset`] is materialized once (the binary reads a JSON array of
//! records) and never mutated afterwards, so an `Arc<Dataset>` can be read
//! from any number of turns without locking.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde_json::Map;

use crate::alias::ColumnHasher;
use crate::error::{Result, ScriptlinkError};

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Empty,
}

impl Value {
    /// The text used for comparisons and display. Whole numbers drop their
    /// fractional part so that `5.0` and `"5"` compare equal.
    pub fn normalized(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            Value::Number(n) => format!("{n}"),
            Value::Empty => String::new(),
        }
    }
    /// The lowercase text filters are compared against, folded like `comparable`.
    pub fn comparable(&self) -> String {
        match self {
            Value::Text(s) => comparable(s),
            other => other.normalized().to_lowercase(),
        }
    }
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Text(s) => s.trim().is_empty(),
            Value::Number(_) => false,
            Value::Empty => true,
        }
    }
}

/// Folds `text` for comparison: trimmed and lowercased, and text that reads
/// as a finite number is printed the way [`Value::normalized`] prints numbers,
/// so `"7.0"`, `"07"` and a numeric cell `7` all compare as `"7"`.
pub fn comparable(text: &str) -> String {
    let text = text.trim();
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Number(n).normalized(),
        _ => text.to_lowercase(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.normalized())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Text(s.to_string()) }
}
impl From<String> for Value {
    fn from(s: String) -> Self { Value::Text(s) }
}
impl From<f64> for Value {
    fn from(n: f64) -> Self { Value::Number(n) }
}
impl From<i64> for Value {
    fn from(n: i64) -> Self { Value::Number(n as f64) }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Empty,
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => Value::Number(f),
                None => Value::Text(n.to_string()),
            },
            serde_json::Value::Bool(b) => Value::Text(b.to_string()),
            other => Value::Text(other.to_string()),
        }
    }
}

pub type Row = Vec<Value>;

/// Immutable, column-ordered table snapshot.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    positions: HashMap<String, usize, ColumnHasher>,
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        let mut positions = HashMap::<String, usize, ColumnHasher>::default();
        for (i, column) in columns.iter().enumerate() {
            if positions.insert(column.clone(), i).is_some() {
                return Err(ScriptlinkError::Dataset(format!("Duplicate column '{column}'")));
            }
        }
        for (r, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(ScriptlinkError::Dataset(format!(
                    "Row {r} has {} cells, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, positions, rows })
    }

    /// Reads a JSON array of records. Column order follows first appearance;
    /// a record lacking a column gets an empty cell.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let records: Vec<Map<String, serde_json::Value>> = serde_json::from_reader(reader)?;
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|c| record.remove(c).map(Value::from).unwrap_or(Value::Empty))
                    .collect()
            })
            .collect();
        Self::new(columns, rows)
    }

    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            ScriptlinkError::Dataset(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_json_reader(BufReader::new(file))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

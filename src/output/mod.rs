//! Report rows and the CSV / JSON / YAML encoders

mod delimited;
mod json;
mod yaml;

use anyhow::Result;
use clap::ValueEnum;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use delimited::to_csv;
pub use json::to_json;
pub use yaml::to_yaml;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReportShapeError {
    #[error("row has {got} cells but the report has {expected} columns ({headers})")]
    ArityMismatch {
        expected: usize,
        got: usize,
        headers: String,
    },
}

/// Output encoding selected with `--output`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// A single report value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Int(i64),
}

impl Cell {
    pub fn empty() -> Self {
        Cell::Text(String::new())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Int(n) => write!(f, "{}", n),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Int(n) => serializer.serialize_i64(*n),
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Cell::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::from(value as u64)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_else(Cell::empty)
    }
}

/// Tabular task result: a header and rows of the same arity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Report {
    /// Create an empty report from a comma-joined header string
    pub fn new(headers: &str) -> Self {
        Self {
            headers: headers.split(',').map(|h| h.trim().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Append a row, rejecting it when its arity differs from the header
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), ReportShapeError> {
        if row.len() != self.headers.len() {
            return Err(ReportShapeError::ArityMismatch {
                expected: self.headers.len(),
                got: row.len(),
                headers: self.headers.join(","),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Rows paired with the header, for the map-shaped encoders
    pub(crate) fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |cells| Record {
            headers: &self.headers,
            cells,
        })
    }

    /// Encode the report in the requested format
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Yaml => to_yaml(self),
            OutputFormat::Json => to_json(self),
            OutputFormat::Csv => to_csv(self),
        }
    }
}

/// Build a `Vec<Cell>` from heterogeneous values
#[macro_export]
macro_rules! row {
    ($($cell:expr),* $(,)?) => {
        vec![$($crate::output::Cell::from($cell)),*]
    };
}

/// One row serialized as a map with keys in header order
pub(crate) struct Record<'a> {
    headers: &'a [String],
    cells: &'a [Cell],
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for (key, value) in self.headers.iter().zip(self.cells) {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

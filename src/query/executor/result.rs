// Query Result Implementation
//
// This module defines the value, row and result types shared by the MF
// aggregation pipeline, plus the error type for execution.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::parser::ParseError;

/// Possible data types for values in a row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

// Bit pattern used for float equality and hashing: `-0.0` folds into `0.0`
// and every NaN into one NaN, so equal keys always hash alike.
fn float_bits(f: f64) -> u64 {
    if f == 0.0 {
        0.0f64.to_bits()
    } else if f.is_nan() {
        f64::NAN.to_bits()
    } else {
        f.to_bits()
    }
}

impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DataValue::Null, DataValue::Null) => true,
            (DataValue::Integer(a), DataValue::Integer(b)) => a == b,
            (DataValue::Float(a), DataValue::Float(b)) => float_bits(*a) == float_bits(*b),
            (DataValue::Text(a), DataValue::Text(b)) => a == b,
            (DataValue::Boolean(a), DataValue::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for DataValue {}

impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            DataValue::Null => 0.hash(state),
            DataValue::Integer(i) => { 1.hash(state); i.hash(state); }
            DataValue::Float(f) => { 2.hash(state); float_bits(*f).hash(state); }
            DataValue::Text(s) => { 3.hash(state); s.hash(state); }
            DataValue::Boolean(b) => { 4.hash(state); b.hash(state); }
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => write!(f, "NULL"),
            DataValue::Integer(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::Text(s) => write!(f, "{}", s),
            DataValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (DataValue::Null, DataValue::Null) => Some(Ordering::Equal),
            (DataValue::Null, _) => Some(Ordering::Less),
            (_, DataValue::Null) => Some(Ordering::Greater),

            (DataValue::Integer(a), DataValue::Integer(b)) => a.partial_cmp(b),
            (DataValue::Float(a), DataValue::Float(b)) => a.partial_cmp(b),
            (DataValue::Integer(a), DataValue::Float(b)) => (*a as f64).partial_cmp(b),
            (DataValue::Float(a), DataValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (DataValue::Text(a), DataValue::Text(b)) => Some(a.cmp(b)),
            (DataValue::Boolean(a), DataValue::Boolean(b)) => a.partial_cmp(b),

            _ => None,
        }
    }
}

impl DataValue {
    /// Numeric view of the value; only integers and floats qualify
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Integer(i) => Some(*i as f64),
            DataValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataValue::Integer(_) | DataValue::Float(_))
    }

    /// Add a numeric value, keeping integer sums integral until a float shows up
    pub fn add(&self, other: &DataValue) -> Option<DataValue> {
        match (self, other) {
            (DataValue::Integer(a), DataValue::Integer(b)) => Some(
                a.checked_add(*b)
                    .map(DataValue::Integer)
                    .unwrap_or(DataValue::Float(*a as f64 + *b as f64)),
            ),
            (a, b) => Some(DataValue::Float(a.as_f64()? + b.as_f64()?)),
        }
    }
}

/// Represents a row of named values, in column insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    values: LinkedHashMap<String, DataValue>,
}

impl Row {
    /// Create a new empty row
    pub fn new() -> Self {
        Row {
            values: LinkedHashMap::new(),
        }
    }

    /// Create a row from column values
    pub fn from_values(columns: Vec<String>, values: Vec<DataValue>) -> Self {
        let mut row = Row::new();
        for (col, val) in columns.into_iter().zip(values) {
            row.set(col, val);
        }
        row
    }

    /// Get a value by column name
    pub fn get(&self, column: &str) -> Option<&DataValue> {
        self.values.get(column)
    }

    /// Get a mutable value by column name
    pub fn get_mut(&mut self, column: &str) -> Option<&mut DataValue> {
        self.values.get_mut(column)
    }

    /// Set a value for a column, keeping the column's original position
    pub fn set(&mut self, column: String, value: DataValue) {
        if let Some(existing) = self.values.get_mut(&column) {
            *existing = value;
        } else {
            self.values.insert(column, value);
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Get all columns in the row
    pub fn columns(&self) -> Vec<&String> {
        self.values.keys().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Represents query execution error
#[derive(Error, Debug)]
pub enum QueryError {
    /// The specification could not be parsed
    #[error("Specification error: {0}")]
    Parse(#[from] ParseError),
    /// A row lacks an attribute the run requires
    #[error("Field missing: {0}")]
    FieldMissing(String),
    /// A scan predicate could not be compiled
    #[error("Predicate error: {0}")]
    PredicateError(String),
    /// Error during query execution
    #[error("Execution error: {0}")]
    ExecutionError(String),
    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Query resultset representation
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResultSet {
    /// Column names in the resultset
    columns: Vec<String>,
    /// Rows of data
    rows: Vec<Row>,
}

impl QueryResultSet {
    /// Create a new empty resultset with column names
    pub fn new(columns: Vec<String>) -> Self {
        QueryResultSet {
            columns,
            rows: Vec::new(),
        }
    }

    /// Add a row to the resultset
    pub fn add_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Get the columns in the resultset
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get the rows in the resultset
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Format the resultset as a string table
    pub fn to_string_table(&self) -> String {
        if self.columns.is_empty() {
            return "Empty result".to_string();
        }

        let cell = |row: &Row, col: &str| row.get(col).map(|v| v.to_string()).unwrap_or_default();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.len().max(3)).collect();
        for row in &self.rows {
            for (i, col) in self.columns.iter().enumerate() {
                widths[i] = widths[i].max(cell(row, col).len());
            }
        }

        let mut result = String::new();

        // Add column headers
        result.push('|');
        for (col, width) in self.columns.iter().zip(&widths) {
            result.push_str(&format!(" {:<width$} |", col, width = *width));
        }
        result.push('\n');

        // Add separator
        result.push('+');
        for width in &widths {
            result.push_str(&format!("{}+", "-".repeat(width + 2)));
        }
        result.push('\n');

        // Add rows
        for row in &self.rows {
            result.push('|');
            for (col, width) in self.columns.iter().zip(&widths) {
                result.push_str(&format!(" {:<width$} |", cell(row, col), width = *width));
            }
            result.push('\n');
        }

        result.push_str(&format!("({} rows)\n", self.rows.len()));
        result
    }

    /// Format the resultset as delimited text with a header line.
    /// Absent fields become empty cells.
    pub fn to_delimited(&self, delimiter: char) -> String {
        let delim = delimiter.to_string();
        let mut out = String::new();

        let header: Vec<String> = self.columns.iter().map(|c| escape_cell(c, delimiter)).collect();
        out.push_str(&header.join(&delim));
        out.push('\n');

        for row in &self.rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .map(|col| match row.get(col) {
                    Some(DataValue::Null) | None => String::new(),
                    Some(value) => escape_cell(&value.to_string(), delimiter),
                })
                .collect();
            out.push_str(&cells.join(&delim));
            out.push('\n');
        }
        out
    }
}

fn escape_cell(cell: &str, delimiter: char) -> String {
    if cell.contains(delimiter) || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

// Projection Operator Implementation
//
// This module implements the output projection of the MF pipeline: each
// accumulator row is cut down to the requested output attributes.

use std::sync::{Arc, Mutex};

use crate::query::executor::operators::{lock_operator, Operator, OperatorRef};
use crate::query::executor::result::{Row, QueryResult, QueryError};

/// Projection operator that selects specific columns from input rows
pub struct ProjectionOperator {
    /// The input operator
    input: OperatorRef,
    /// The columns to project, in output order
    columns: Vec<String>,
    /// Whether the operator is initialized
    initialized: bool,
}

impl ProjectionOperator {
    /// Create a new projection operator
    pub fn new(input: OperatorRef, columns: Vec<String>) -> Self {
        ProjectionOperator {
            input,
            columns,
            initialized: false,
        }
    }

    /// Project a row to the specified columns. A column the row lacks, such
    /// as an unresolved average, is left out of the projected row.
    pub fn project_row(columns: &[String], row: &Row) -> Row {
        let mut projected_row = Row::new();
        for column in columns {
            if let Some(value) = row.get(column) {
                projected_row.set(column.clone(), value.clone());
            }
        }
        projected_row
    }
}

impl Operator for ProjectionOperator {
    /// Initialize the operator
    fn init(&mut self) -> QueryResult<()> {
        lock_operator(&self.input)?.init()?;
        self.initialized = true;
        Ok(())
    }

    /// Get the next row with projected columns
    fn next(&mut self) -> QueryResult<Option<Row>> {
        if !self.initialized {
            return Err(QueryError::ExecutionError("Operator not initialized".to_string()));
        }

        let next_row = lock_operator(&self.input)?.next()?;
        Ok(next_row.map(|row| Self::project_row(&self.columns, &row)))
    }

    /// Close the operator
    fn close(&mut self) -> QueryResult<()> {
        self.initialized = false;
        lock_operator(&self.input)?.close()
    }
}

/// Create a projection operator
pub fn create_projection(input: OperatorRef, columns: Vec<String>) -> QueryResult<OperatorRef> {
    let projection = ProjectionOperator::new(input, columns);
    Ok(Arc::new(Mutex::new(projection)))
}

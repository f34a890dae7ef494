// Memory Scan Operator
//
// This module implements the row source of the pipeline: a scan over rows
// that were already materialized by a collaborator (a query result, a JSON
// file, a test fixture).

use std::sync::{Arc, Mutex};

use crate::query::executor::operators::{Operator, OperatorRef};
use crate::query::executor::result::{Row, QueryResult, QueryError};

/// A scan operator that yields materialized rows in source order
pub struct MemoryScanOperator {
    rows: Vec<Row>,
    position: usize,
    initialized: bool,
}

impl MemoryScanOperator {
    /// Create a new scan over the given rows
    pub fn new(rows: Vec<Row>) -> Self {
        MemoryScanOperator {
            rows,
            position: 0,
            initialized: false,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl Operator for MemoryScanOperator {
    fn init(&mut self) -> QueryResult<()> {
        self.position = 0;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        if !self.initialized {
            return Err(QueryError::ExecutionError("Operator not initialized".to_string()));
        }
        let row = self.rows.get(self.position).cloned();
        if row.is_some() {
            self.position += 1;
        }
        Ok(row)
    }

    fn close(&mut self) -> QueryResult<()> {
        self.initialized = false;
        Ok(())
    }
}

/// Create a memory scan operator
pub fn create_memory_scan(rows: Vec<Row>) -> QueryResult<OperatorRef> {
    Ok(Arc::new(Mutex::new(MemoryScanOperator::new(rows))))
}

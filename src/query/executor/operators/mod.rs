// Query Operators Module
//
// This module defines the operators used by the MF aggregation pipeline in
// the iterator-based execution model: a row source, the MF aggregate and the
// output projection.

pub mod scan;
pub mod agg;
pub mod project;

use std::sync::{Arc, Mutex, MutexGuard};

use crate::query::executor::result::{Row, QueryResult, QueryError};

/// The Operator trait defines the interface for all query execution operators
/// in the iterator-based execution model. Each operator processes tuples and
/// passes them to the next operator in the execution plan.
pub trait Operator: Send + Sync {
    /// Initialize the operator before execution
    fn init(&mut self) -> QueryResult<()>;

    /// Get the next row of data from this operator
    fn next(&mut self) -> QueryResult<Option<Row>>;

    /// Close the operator and release any resources
    fn close(&mut self) -> QueryResult<()>;
}

/// Shared handle to an operator in a pipeline
pub type OperatorRef = Arc<Mutex<dyn Operator + Send>>;

// Factory functions for creating operators
pub fn create_memory_scan(rows: Vec<Row>) -> QueryResult<OperatorRef> {
    scan::create_memory_scan(rows)
}

pub fn create_projection(input: OperatorRef, columns: Vec<String>) -> QueryResult<OperatorRef> {
    project::create_projection(input, columns)
}

/// Lock an operator handle, turning a poisoned lock into an execution error
pub(crate) fn lock_operator(op: &OperatorRef) -> QueryResult<MutexGuard<'_, dyn Operator + Send + 'static>> {
    op.lock().map_err(|e| {
        QueryError::ExecutionError(format!("Failed to lock input operator: {}", e))
    })
}

// Query Executor Module
//
// This module is responsible for running MF-structure plans and producing
// results. It implements the iterator-based execution model for query
// processing.

// Re-export public components
pub mod engine;
pub mod result;
pub mod operators;
pub mod predicate;

// Export key types
pub use self::engine::{EngineConfig, MfEngine, MfPlan};
pub use self::result::{DataValue, QueryError, QueryResult, QueryResultSet, Row};
pub use self::operators::Operator;

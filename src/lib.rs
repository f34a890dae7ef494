// MF-structure query engine
//
// Computes several related GROUP BY aggregations ("scans") over an
// in-memory row set, driven by a small declarative specification.

pub mod query;

// Re-export key items for convenient access
pub use query::parser::{parse, ParseError, Parser, Specification};
pub use query::executor::engine::{EngineConfig, MfEngine, MfPlan};
pub use query::executor::operators::agg::{GroupLookup, HavingFilter};
pub use query::executor::result::{DataValue, QueryError, QueryResult, QueryResultSet, Row};

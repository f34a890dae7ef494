// MF Query Processing Module
//
// This module contains components for specification parsing and for
// executing MF-structure aggregations.

pub mod parser;
pub mod executor;

// Export key public interfaces
pub use parser::{parse, Parser, Specification};
pub use executor::engine::{EngineConfig, MfEngine};
pub use executor::result::QueryResult;

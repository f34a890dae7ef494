// Specification Parser Module
//
// This module is responsible for parsing MF-structure query specifications
// and converting them into a typed `Specification`.

pub mod ast;
pub mod error;
pub mod parser;

pub use self::ast::{AggregateKind, AggregateSpec, ScanId, Specification};
pub use self::error::{ParseError, ParseResult};
pub use self::parser::{parse, Parser};

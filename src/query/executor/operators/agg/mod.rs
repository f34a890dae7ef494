// Aggregation Operators Module
//
// This module contains the MF-structure aggregation: the group table with
// its per-scan update and average resolution, and the operator that drives
// it inside a pipeline.

mod mf;
mod table;

// Re-export public components
pub use mf::{MfAggregateOperator, HavingFilter, create_mf_aggregate};
pub use table::{AccumulatorRow, GroupKey, GroupTable, ScanStats, identity_value};

/// How a scan finds the accumulator matching an input row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupLookup {
    /// Compare the row against every accumulator, field by field
    Linear,
    /// Look the row's grouping key up in a hash index
    #[default]
    Hashed,
}

impl std::str::FromStr for GroupLookup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(GroupLookup::Linear),
            "hashed" | "hash" => Ok(GroupLookup::Hashed),
            other => Err(format!("unknown group lookup '{}', expected 'linear' or 'hashed'", other)),
        }
    }
}

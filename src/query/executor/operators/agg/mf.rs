// MF-Structure Aggregation Operator
//
// This operator drains its input once, builds the group table, runs every
// scan in declaration order, resolves averages and then yields one row per
// group in first-seen order.

use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::query::executor::operators::{lock_operator, Operator, OperatorRef};
use crate::query::executor::predicate::CompiledPredicate;
use crate::query::executor::result::{QueryError, QueryResult, Row};
use crate::query::parser::ast::Specification;
use super::table::{GroupTable, ScanStats};
use super::GroupLookup;

/// Post-aggregation group filter, applied after averages are resolved and
/// before projection. The specification's `G` text is never interpreted;
/// callers that need having semantics install their own filter.
pub trait HavingFilter: Send + Sync {
    fn keep(&self, group: &Row) -> QueryResult<bool>;
}

impl<F> HavingFilter for F
where
    F: Fn(&Row) -> bool + Send + Sync,
{
    fn keep(&self, group: &Row) -> QueryResult<bool> {
        Ok(self(group))
    }
}

/// MfAggregateOperator computes every scan's aggregates over its input
pub struct MfAggregateOperator {
    // Input operator
    input: OperatorRef,
    spec: Arc<Specification>,
    // One compiled predicate per scan, in scan order
    predicates: Vec<CompiledPredicate>,
    lookup: GroupLookup,
    having: Option<Arc<dyn HavingFilter>>,
    initialized: bool,
    scan_stats: Vec<ScanStats>,
    // Iterator over the resulting rows
    result_iter: Option<std::vec::IntoIter<Row>>,
}

impl MfAggregateOperator {
    /// Create a new MF aggregate operator. The predicates must cover scans
    /// `1..=n` in order.
    pub fn new(
        input: OperatorRef,
        spec: Arc<Specification>,
        predicates: Vec<CompiledPredicate>,
        lookup: GroupLookup,
        having: Option<Arc<dyn HavingFilter>>,
    ) -> QueryResult<Self> {
        let in_order = predicates.len() == spec.scan_count
            && predicates
                .iter()
                .enumerate()
                .all(|(idx, predicate)| predicate.scan_id() == idx + 1);
        if !in_order {
            return Err(QueryError::InvalidOperation(format!(
                "expected one predicate per scan 1..={}, got {}",
                spec.scan_count,
                predicates.len()
            )));
        }

        Ok(MfAggregateOperator {
            input,
            spec,
            predicates,
            lookup,
            having,
            initialized: false,
            scan_stats: Vec::new(),
            result_iter: None,
        })
    }

    /// Counters of the scans run so far, in scan order
    pub fn scan_stats(&self) -> &[ScanStats] {
        &self.scan_stats
    }

    // Drain the input once; every scan reuses the materialized rows
    fn materialize_input(&mut self) -> QueryResult<Vec<Row>> {
        let mut input = lock_operator(&self.input)?;
        input.init()?;
        let mut rows = Vec::new();
        while let Some(row) = input.next()? {
            rows.push(row);
        }
        Ok(rows)
    }

    fn compute(&mut self) -> QueryResult<Vec<Row>> {
        let rows = self.materialize_input()?;
        let mut table = GroupTable::build(&rows, &self.spec, self.lookup)?;
        info!(
            "MF aggregation over {} rows: {} groups, {} scans",
            rows.len(),
            table.len(),
            self.spec.scan_count
        );

        self.scan_stats.clear();
        for predicate in &self.predicates {
            let stats = table.apply_scan(predicate, &rows, &self.spec)?;
            self.scan_stats.push(stats);
        }

        table.resolve_averages(&self.spec);

        if let Some(having) = &self.having {
            let dropped = table.retain(|group| having.keep(group))?;
            debug!("Having filter dropped {} groups", dropped);
        }

        Ok(table.into_rows())
    }
}

impl Operator for MfAggregateOperator {
    fn init(&mut self) -> QueryResult<()> {
        if !self.initialized {
            let result_rows = self.compute()?;
            self.result_iter = Some(result_rows.into_iter());
            self.initialized = true;
        }
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Row>> {
        // Ensure we're initialized
        if !self.initialized {
            self.init()?;
        }

        Ok(self.result_iter.as_mut().and_then(|iter| iter.next()))
    }

    fn close(&mut self) -> QueryResult<()> {
        lock_operator(&self.input)?.close()?;

        // Reset state
        self.initialized = false;
        self.result_iter = None;
        Ok(())
    }
}

/// Create a new MfAggregateOperator wrapped in an operator handle
pub fn create_mf_aggregate(
    input: OperatorRef,
    spec: Arc<Specification>,
    predicates: Vec<CompiledPredicate>,
    lookup: GroupLookup,
    having: Option<Arc<dyn HavingFilter>>,
) -> QueryResult<OperatorRef> {
    let op = MfAggregateOperator::new(input, spec, predicates, lookup, having)?;
    Ok(Arc::new(Mutex::new(op)))
}

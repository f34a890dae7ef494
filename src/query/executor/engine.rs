// MF Query Execution Engine
//
// This module assembles the execution pipeline for an MF-structure query:
// memory scan -> MF aggregate -> projection, and drains it into a result set.
// Parsing and predicate compilation both finish before any row is touched.

use std::sync::Arc;

use log::info;

use crate::query::executor::operators::agg::{create_mf_aggregate, GroupLookup, HavingFilter};
use crate::query::executor::operators::{create_memory_scan, create_projection, lock_operator, OperatorRef};
use crate::query::executor::predicate::{compile_predicates, CompiledPredicate};
use crate::query::executor::result::{QueryResult, QueryResultSet, Row};
use crate::query::parser::ast::Specification;
use crate::query::parser::parse;

/// Configuration for the MF execution engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How scans locate the accumulator for an input row
    pub group_lookup: GroupLookup,

    /// Whether an installed having filter is applied before projection
    pub apply_having: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            group_lookup: GroupLookup::Hashed,
            apply_having: false,
        }
    }
}

/// A specification with its scan predicates compiled
#[derive(Debug, Clone)]
pub struct MfPlan {
    spec: Arc<Specification>,
    predicates: Vec<CompiledPredicate>,
}

impl MfPlan {
    /// Compile every scan predicate; fails before any row is read
    pub fn new(spec: Specification) -> QueryResult<Self> {
        let predicates = compile_predicates(&spec)?;
        Ok(MfPlan {
            spec: Arc::new(spec),
            predicates,
        })
    }

    pub fn specification(&self) -> &Specification {
        &self.spec
    }

    pub fn predicates(&self) -> &[CompiledPredicate] {
        &self.predicates
    }
}

/// Runs MF-structure queries over materialized rows
pub struct MfEngine {
    config: EngineConfig,
    having: Option<Arc<dyn HavingFilter>>,
}

impl Default for MfEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl MfEngine {
    pub fn new(config: EngineConfig) -> Self {
        MfEngine { config, having: None }
    }

    /// Install a group filter; it only runs when `apply_having` is set
    pub fn with_having_filter(mut self, filter: Arc<dyn HavingFilter>) -> Self {
        self.having = Some(filter);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse specification text and compile it into a plan
    pub fn prepare(&self, spec_text: &str) -> QueryResult<MfPlan> {
        let spec = parse(spec_text)?;
        MfPlan::new(spec)
    }

    /// Parse, compile and run a query over the given rows
    pub fn execute_query(&self, spec_text: &str, rows: Vec<Row>) -> QueryResult<QueryResultSet> {
        let plan = self.prepare(spec_text)?;
        self.execute_rows(&plan, rows)
    }

    /// Run a prepared plan over materialized rows
    pub fn execute_rows(&self, plan: &MfPlan, rows: Vec<Row>) -> QueryResult<QueryResultSet> {
        let input = create_memory_scan(rows)?;
        self.execute(plan, input)
    }

    /// Run a prepared plan over any row source
    pub fn execute(&self, plan: &MfPlan, input: OperatorRef) -> QueryResult<QueryResultSet> {
        let having = if self.config.apply_having {
            self.having.clone()
        } else {
            None
        };
        if plan.spec.having.is_some() && having.is_none() {
            info!("Having clause '{}' is carried but not applied", plan.spec.having.as_deref().unwrap_or_default());
        }

        let aggregate = create_mf_aggregate(
            input,
            plan.spec.clone(),
            plan.predicates.clone(),
            self.config.group_lookup,
            having,
        )?;
        let projection = create_projection(aggregate, plan.spec.output_attributes.clone())?;

        let mut result = QueryResultSet::new(plan.spec.output_attributes.clone());
        {
            let mut op = lock_operator(&projection)?;
            op.init()?;
            while let Some(row) = op.next()? {
                result.add_row(row);
            }
            op.close()?;
        }

        info!("MF query produced {} rows", result.row_count());
        Ok(result)
    }
}

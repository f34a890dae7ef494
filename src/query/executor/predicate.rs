// Scan Predicate Compiler
//
// Compiles the equality fragments of each scan into a typed test over rows.
// Compilation happens once, before any row is read; a fragment that cannot
// be compiled aborts the run instead of silently excluding rows.

use log::{debug, warn};

use crate::query::executor::result::{DataValue, QueryError, QueryResult, Row};
use crate::query::parser::ast::{Literal, Operand, PredicateFragment, ScanId, ScanPredicate, Specification};
use crate::query::parser::parser::parse_fragment;

/// One compiled equality test
#[derive(Debug, Clone, PartialEq)]
enum Comparison {
    /// Literal-to-literal comparison folded at compile time
    Constant(bool),
    /// Row field compared against a literal
    FieldEquals { field: String, literal: Literal },
}

/// A scan's filter, ready to run against rows
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    scan_id: ScanId,
    text: String,
    comparisons: Vec<Comparison>,
}

impl CompiledPredicate {
    /// Compile the conjunction of a scan's fragments
    pub fn compile(predicate: &ScanPredicate) -> QueryResult<Self> {
        if predicate.fragments.is_empty() {
            return Err(QueryError::PredicateError(format!(
                "scan {} has no predicate fragments",
                predicate.scan_id
            )));
        }

        let mut comparisons = Vec::with_capacity(predicate.fragments.len());
        for fragment in &predicate.fragments {
            if fragment.scan_id != predicate.scan_id {
                return Err(QueryError::PredicateError(format!(
                    "fragment '{}' belongs to scan {}, not scan {}",
                    fragment.text, fragment.scan_id, predicate.scan_id
                )));
            }
            comparisons.push(compile_fragment(fragment)?);
        }

        let compiled = CompiledPredicate {
            scan_id: predicate.scan_id,
            text: predicate.to_string(),
            comparisons,
        };
        if compiled.is_never_true() {
            warn!("Predicate for scan {} ({}) can never match", compiled.scan_id, compiled.text);
        }
        Ok(compiled)
    }

    /// Compile a single raw fragment such as `1.state=NY`
    pub fn compile_text(text: &str, scan_count: usize) -> QueryResult<Self> {
        let fragment = parse_fragment(text, scan_count)?;
        CompiledPredicate::compile(&ScanPredicate {
            scan_id: fragment.scan_id,
            fragments: vec![fragment],
        })
    }

    /// Evaluate against a row. A referenced field the row lacks makes the
    /// predicate false rather than failing the run.
    pub fn evaluate(&self, row: &Row) -> bool {
        self.comparisons.iter().all(|cmp| match cmp {
            Comparison::Constant(value) => *value,
            Comparison::FieldEquals { field, literal } => match row.get(field) {
                Some(value) => value_matches(value, literal),
                None => false,
            },
        })
    }

    pub fn scan_id(&self) -> ScanId {
        self.scan_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when every comparison is a folded constant `true`
    pub fn is_always_true(&self) -> bool {
        self.comparisons.iter().all(|cmp| *cmp == Comparison::Constant(true))
    }

    fn is_never_true(&self) -> bool {
        self.comparisons.iter().any(|cmp| *cmp == Comparison::Constant(false))
    }
}

/// Compile every scan predicate of a specification, ordered by scan id
pub fn compile_predicates(spec: &Specification) -> QueryResult<Vec<CompiledPredicate>> {
    (1..=spec.scan_count)
        .map(|scan_id| {
            let predicate = spec.predicate_for_scan(scan_id).ok_or_else(|| {
                QueryError::PredicateError(format!("scan {} has no predicate", scan_id))
            })?;
            let compiled = CompiledPredicate::compile(predicate)?;
            debug!("Compiled predicate for scan {}: {}", scan_id, compiled.text);
            Ok(compiled)
        })
        .collect()
}

fn compile_fragment(fragment: &PredicateFragment) -> QueryResult<Comparison> {
    match &fragment.left {
        Operand::Literal(left) => Ok(Comparison::Constant(literals_equal(left, &fragment.right))),
        Operand::Field(field) if field.is_empty() => Err(QueryError::PredicateError(format!(
            "fragment '{}' has an empty attribute",
            fragment.text
        ))),
        Operand::Field(field) => Ok(Comparison::FieldEquals {
            field: field.clone(),
            literal: fragment.right.clone(),
        }),
    }
}

fn literals_equal(left: &Literal, right: &Literal) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

/// Equality between a row value and a literal.
///
/// Numeric literals compare numerically, including against text fields that
/// parse as numbers; text that does not parse falls back to comparing with
/// the literal's spelling. Text literals only match text values.
fn value_matches(value: &DataValue, literal: &Literal) -> bool {
    match (value, literal) {
        (DataValue::Null, _) => false,
        (DataValue::Integer(a), Literal::Integer(b)) => a == b,
        (DataValue::Integer(_) | DataValue::Float(_), Literal::Integer(_) | Literal::Float(_)) => {
            value.as_f64() == literal.as_f64()
        }
        (DataValue::Text(s), Literal::Integer(_) | Literal::Float(_)) => match s.trim().parse::<f64>() {
            Ok(parsed) => Some(parsed) == literal.as_f64(),
            Err(_) => *s == literal.to_string(),
        },
        (DataValue::Text(s), Literal::Text(t)) => s == t,
        (DataValue::Boolean(a), Literal::Boolean(b)) => a == b,
        (DataValue::Text(s), Literal::Boolean(b)) => s.eq_ignore_ascii_case(&b.to_string()),
        _ => false,
    }
}

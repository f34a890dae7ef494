// Specification Abstract Syntax Tree
//
// This module defines the typed form of a parsed MF-structure query
// specification: output attributes, scan count, grouping attributes,
// aggregate descriptors, scan predicates and the opaque having text.

use std::fmt;

/// Identifier of a scan (grouping variable), numbered from 1
pub type ScanId = usize;

/// Kinds of aggregate functions a specification can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Sum,
    Count,
    Min,
    Max,
    Avg,
}

impl AggregateKind {
    /// Parse the function prefix of an aggregate token
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "sum" => Some(AggregateKind::Sum),
            "count" => Some(AggregateKind::Count),
            "min" => Some(AggregateKind::Min),
            "max" => Some(AggregateKind::Max),
            "avg" => Some(AggregateKind::Avg),
            _ => None,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            AggregateKind::Sum => "sum",
            AggregateKind::Count => "count",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
            AggregateKind::Avg => "avg",
        }
    }

    /// Whether the aggregate is computed from other fields after all scans
    pub fn is_derived(&self) -> bool {
        matches!(self, AggregateKind::Avg)
    }
}

/// One aggregate requested by the specification, e.g. `sum_1_quant`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSpec {
    /// Scan that updates this aggregate
    pub scan_id: ScanId,
    pub kind: AggregateKind,
    /// Input attribute being aggregated (absent for a bare count)
    pub base_attribute: Option<String>,
    /// Field name in accumulator rows
    pub name: String,
}

impl AggregateSpec {
    pub fn new(kind: AggregateKind, scan_id: ScanId, base_attribute: Option<String>) -> Self {
        let name = match &base_attribute {
            Some(base) => format!("{}_{}_{}", kind.prefix(), scan_id, base),
            None => format!("{}_{}", kind.prefix(), scan_id),
        };
        AggregateSpec {
            scan_id,
            kind,
            base_attribute,
            name,
        }
    }

    /// Name of the sum field an average is derived from
    pub fn sum_name(scan_id: ScanId, base: &str) -> String {
        format!("sum_{}_{}", scan_id, base)
    }

    /// Name of the count field an average is derived from
    pub fn count_name(scan_id: ScanId) -> String {
        format!("count_{}", scan_id)
    }
}

/// A literal appearing in a predicate fragment
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

impl Literal {
    /// Interpret a raw token: quoted text stays text, otherwise a numeric
    /// parse is attempted before falling back to text.
    pub fn from_token(token: &str) -> Self {
        let token = token.trim();
        if let Some(inner) = strip_quotes(token) {
            return Literal::Text(inner.to_string());
        }
        if looks_numeric(token) {
            if let Ok(i) = token.parse::<i64>() {
                return Literal::Integer(i);
            }
            if let Ok(f) = token.parse::<f64>() {
                return Literal::Float(f);
            }
        }
        match token.to_ascii_lowercase().as_str() {
            "true" => Literal::Boolean(true),
            "false" => Literal::Boolean(false),
            _ => Literal::Text(token.to_string()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Literal::Integer(_) | Literal::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Integer(i) => Some(*i as f64),
            Literal::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(fl) => write!(f, "{}", fl),
            Literal::Text(s) => write!(f, "'{}'", s),
            Literal::Boolean(b) => write!(f, "{}", b),
        }
    }
}

// Sign, digits, '.' and exponent only; keeps `nan`, `inf` and friends as text
fn looks_numeric(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

fn strip_quotes(token: &str) -> Option<&str> {
    if token.len() < 2 {
        return None;
    }
    let bytes = token.as_bytes();
    let first = bytes[0];
    let last = bytes[token.len() - 1];
    if (first == b'\'' || first == b'"') && first == last {
        Some(&token[1..token.len() - 1])
    } else {
        None
    }
}

/// Left-hand side of an equality comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A row attribute
    Field(String),
    /// A constant, making the whole comparison constant
    Literal(Literal),
}

/// One `<scanId>.<attribute>==<value>` fragment after normalization
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateFragment {
    pub scan_id: ScanId,
    pub left: Operand,
    pub right: Literal,
    /// Normalized source text, `=` rewritten to `==`
    pub text: String,
}

impl PredicateFragment {
    /// An always-true placeholder for a scan with no real predicate
    pub fn always_true(scan_id: ScanId) -> Self {
        PredicateFragment {
            scan_id,
            left: Operand::Literal(Literal::Integer(1)),
            right: Literal::Integer(1),
            text: format!("{}.1==1", scan_id),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.left, Operand::Literal(_))
    }
}

/// The filter for one scan: the conjunction of its fragments
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPredicate {
    pub scan_id: ScanId,
    pub fragments: Vec<PredicateFragment>,
}

impl fmt::Display for ScanPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let texts: Vec<&str> = self.fragments.iter().map(|p| p.text.as_str()).collect();
        write!(f, "{}", texts.join(" AND "))
    }
}

/// A fully parsed and validated MF-structure query specification
#[derive(Debug, Clone, PartialEq)]
pub struct Specification {
    /// Columns of the final output, in order
    pub output_attributes: Vec<String>,
    pub scan_count: usize,
    /// Attributes forming the grouping key, in order
    pub grouping_attributes: Vec<String>,
    pub aggregates: Vec<AggregateSpec>,
    /// One predicate per scan, index `i` holds scan `i + 1`
    pub scan_predicates: Vec<ScanPredicate>,
    /// Opaque having text; carried but not interpreted
    pub having: Option<String>,
}

impl Specification {
    /// Aggregates updated directly by the given scan
    pub fn aggregates_for_scan(&self, scan_id: ScanId) -> impl Iterator<Item = &AggregateSpec> {
        self.aggregates
            .iter()
            .filter(move |agg| agg.scan_id == scan_id && !agg.kind.is_derived())
    }

    pub fn predicate_for_scan(&self, scan_id: ScanId) -> Option<&ScanPredicate> {
        self.scan_predicates.iter().find(|p| p.scan_id == scan_id)
    }

    pub fn aggregate(&self, name: &str) -> Option<&AggregateSpec> {
        self.aggregates.iter().find(|agg| agg.name == name)
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "S: {}", self.output_attributes.join(", "))?;
        writeln!(f, "n: {}", self.scan_count)?;
        writeln!(f, "V: {}", self.grouping_attributes.join(", "))?;
        let aggs: Vec<&str> = self.aggregates.iter().map(|a| a.name.as_str()).collect();
        writeln!(f, "F: {}", aggs.join(", "))?;
        for predicate in &self.scan_predicates {
            writeln!(f, "sig[{}]: {}", predicate.scan_id, predicate)?;
        }
        if let Some(having) = &self.having {
            writeln!(f, "G: {}", having)?;
        }
        Ok(())
    }
}

// Specification Parser Implementation
//
// Turns the line-oriented `key: value` specification text into a typed
// `Specification`. Keys may appear in any order; `F` and `sig` are resolved
// once the scan count is known.

use log::{debug, warn};

use crate::query::parser::ast::{
    AggregateKind, AggregateSpec, Literal, Operand, PredicateFragment, ScanId, ScanPredicate,
    Specification,
};
use crate::query::parser::error::{ParseError, ParseResult};

/// Raw value of a list-style key together with the line it came from
#[derive(Debug, Clone)]
struct RawEntry {
    line: usize,
    value: String,
}

/// Line-oriented specification parser
pub struct Parser<'a> {
    input: &'a str,
    output_attributes: Option<Vec<String>>,
    scan_count: Option<usize>,
    grouping_attributes: Option<Vec<String>>,
    aggregates: Option<RawEntry>,
    predicates: Option<RawEntry>,
    having: Option<String>,
}

impl<'a> Parser<'a> {
    /// Create a new parser over specification text
    pub fn new(input: &'a str) -> Self {
        Parser {
            input,
            output_attributes: None,
            scan_count: None,
            grouping_attributes: None,
            aggregates: None,
            predicates: None,
            having: None,
        }
    }

    /// Parse the whole input into a validated specification
    pub fn parse_specification(mut self) -> ParseResult<Specification> {
        for (idx, line) in self.input.lines().enumerate() {
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::malformed(line_no, format!("missing ':' in '{}'", line.trim())))?;
            self.apply_key(line_no, key.trim(), value.trim())?;
        }

        let output_attributes = self.output_attributes.take().ok_or(ParseError::MissingKey("S"))?;
        let scan_count = self.scan_count.ok_or(ParseError::MissingKey("n"))?;
        let grouping_attributes = self.grouping_attributes.take().ok_or(ParseError::MissingKey("V"))?;

        let aggregates = match self.aggregates.take() {
            Some(entry) => expand_averages(parse_aggregates(&entry, scan_count)?),
            None => Vec::new(),
        };

        let scan_predicates = match self.predicates.take() {
            Some(entry) if !entry.value.is_empty() => parse_predicates(&entry.value, scan_count)?,
            _ => {
                warn!("No scan predicates given, synthesizing {} always-true predicates", scan_count);
                (1..=scan_count)
                    .map(|scan_id| ScanPredicate {
                        scan_id,
                        fragments: vec![PredicateFragment::always_true(scan_id)],
                    })
                    .collect()
            }
        };

        let spec = Specification {
            output_attributes,
            scan_count,
            grouping_attributes,
            aggregates,
            scan_predicates,
            having: self.having.take(),
        };
        debug!("Parsed specification:\n{}", spec);
        Ok(spec)
    }

    fn apply_key(&mut self, line: usize, key: &str, value: &str) -> ParseResult<()> {
        match key {
            "S" => {
                let attrs = parse_list(value);
                if attrs.is_empty() {
                    return Err(ParseError::malformed(line, "S lists no output attributes"));
                }
                if let Some(dup) = first_duplicate(&attrs) {
                    return Err(ParseError::malformed(line, format!("duplicate output attribute '{}'", dup)));
                }
                self.output_attributes = Some(attrs);
            }
            "n" => {
                let count = value
                    .parse::<usize>()
                    .map_err(|_| ParseError::malformed(line, format!("scan count '{}' is not an integer", value)))?;
                if count == 0 {
                    return Err(ParseError::malformed(line, "scan count must be positive"));
                }
                self.scan_count = Some(count);
            }
            "V" => {
                let attrs = parse_list(value);
                if attrs.is_empty() {
                    return Err(ParseError::malformed(line, "V lists no grouping attributes"));
                }
                if let Some(dup) = first_duplicate(&attrs) {
                    return Err(ParseError::malformed(line, format!("duplicate grouping attribute '{}'", dup)));
                }
                self.grouping_attributes = Some(attrs);
            }
            "F" => {
                self.aggregates = Some(RawEntry { line, value: value.to_string() });
            }
            "sig" => {
                self.predicates = Some(RawEntry { line, value: value.to_string() });
            }
            "G" => {
                self.having = if value.is_empty() { None } else { Some(value.to_string()) };
            }
            other => return Err(ParseError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

/// Parse specification text into a `Specification`
pub fn parse(input: &str) -> ParseResult<Specification> {
    Parser::new(input).parse_specification()
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn first_duplicate(items: &[String]) -> Option<&String> {
    items
        .iter()
        .enumerate()
        .find(|(i, item)| items[..*i].contains(*item))
        .map(|(_, item)| item)
}

fn parse_aggregates(entry: &RawEntry, scan_count: usize) -> ParseResult<Vec<AggregateSpec>> {
    let mut aggregates: Vec<AggregateSpec> = Vec::new();
    for token in parse_list(&entry.value) {
        let agg = parse_aggregate_token(&token, scan_count)?;
        if aggregates.iter().any(|existing| existing.name == agg.name) {
            debug!("Ignoring repeated aggregate {} on line {}", agg.name, entry.line);
            continue;
        }
        aggregates.push(agg);
    }
    Ok(aggregates)
}

/// Parse `<kind>_<scanId>_<base>` or `count_<scanId>`
fn parse_aggregate_token(token: &str, scan_count: usize) -> ParseResult<AggregateSpec> {
    let mut parts = token.splitn(3, '_');
    let prefix = parts.next().unwrap_or_default();
    let kind = AggregateKind::from_prefix(prefix)
        .ok_or_else(|| ParseError::aggregate(token, format!("unknown function '{}'", prefix)))?;

    let scan_part = parts
        .next()
        .ok_or_else(|| ParseError::aggregate(token, "missing scan number"))?;
    let scan_id = scan_part
        .parse::<ScanId>()
        .map_err(|_| ParseError::aggregate(token, format!("scan number '{}' is not an integer", scan_part)))?;
    if scan_part != scan_id.to_string() {
        return Err(ParseError::aggregate(
            token,
            format!("scan number '{}' must be written as {}", scan_part, scan_id),
        ));
    }
    if scan_id == 0 || scan_id > scan_count {
        return Err(ParseError::aggregate(
            token,
            format!("scan {} is outside 1..={}", scan_id, scan_count),
        ));
    }

    let base = match parts.next() {
        Some("") => return Err(ParseError::aggregate(token, "empty base attribute")),
        base => base.map(str::to_string),
    };
    if base.is_none() && kind != AggregateKind::Count {
        return Err(ParseError::aggregate(token, "missing base attribute"));
    }

    // Tokens are canonical here, so the built name is the token itself,
    // including a spelling such as `count_1_quant`
    Ok(AggregateSpec::new(kind, scan_id, base))
}

/// Append the sum and count fields each average is derived from
fn expand_averages(mut aggregates: Vec<AggregateSpec>) -> Vec<AggregateSpec> {
    let averages: Vec<(ScanId, String)> = aggregates
        .iter()
        .filter(|agg| agg.kind == AggregateKind::Avg)
        .filter_map(|agg| agg.base_attribute.clone().map(|base| (agg.scan_id, base)))
        .collect();

    for (scan_id, base) in averages {
        let sum_name = AggregateSpec::sum_name(scan_id, &base);
        if !aggregates.iter().any(|agg| agg.name == sum_name) {
            warn!("Adding {} required by avg_{}_{}", sum_name, scan_id, base);
            aggregates.push(AggregateSpec::new(AggregateKind::Sum, scan_id, Some(base.clone())));
        }
        let count_name = AggregateSpec::count_name(scan_id);
        if !aggregates.iter().any(|agg| agg.name == count_name) {
            warn!("Adding {} required by avg_{}_{}", count_name, scan_id, base);
            aggregates.push(AggregateSpec::new(AggregateKind::Count, scan_id, None));
        }
    }
    aggregates
}

fn parse_predicates(value: &str, scan_count: usize) -> ParseResult<Vec<ScanPredicate>> {
    let mut predicates: Vec<ScanPredicate> = (1..=scan_count)
        .map(|scan_id| ScanPredicate { scan_id, fragments: Vec::new() })
        .collect();

    for raw in parse_list(value) {
        let fragment = parse_fragment(&raw, scan_count)?;
        predicates[fragment.scan_id - 1].fragments.push(fragment);
    }

    for predicate in predicates.iter_mut().filter(|p| p.fragments.is_empty()) {
        warn!("Scan {} has no predicate, treating it as always true", predicate.scan_id);
        predicate.fragments.push(PredicateFragment::always_true(predicate.scan_id));
    }
    Ok(predicates)
}

/// Parse `<scanId>.<attribute><op><value>` where `<op>` is `=` or `==`
pub fn parse_fragment(raw: &str, scan_count: usize) -> ParseResult<PredicateFragment> {
    let (prefix, rest) = raw
        .split_once('.')
        .ok_or_else(|| ParseError::predicate(raw, "missing '<scan>.' prefix"))?;
    let scan_id = prefix
        .trim()
        .parse::<ScanId>()
        .map_err(|_| ParseError::predicate(raw, format!("scan prefix '{}' is not a scan number", prefix.trim())))?;
    if scan_id == 0 || scan_id > scan_count {
        return Err(ParseError::predicate(
            raw,
            format!("scan {} is outside 1..={}", scan_id, scan_count),
        ));
    }

    let normalized = if rest.contains("==") {
        rest.to_string()
    } else if rest.contains('=') {
        rest.replacen('=', "==", 1)
    } else {
        return Err(ParseError::predicate(raw, "expected '=' or '=='"));
    };

    let (attr, val) = normalized
        .split_once("==")
        .ok_or_else(|| ParseError::predicate(raw, "expected '=' or '=='"))?;
    let (attr, val) = (attr.trim(), val.trim());

    if attr.ends_with(['!', '<', '>']) || val.starts_with('=') {
        return Err(ParseError::predicate(raw, "only equality comparisons are supported"));
    }
    if attr.is_empty() {
        return Err(ParseError::predicate(raw, "missing attribute"));
    }
    if val.is_empty() {
        return Err(ParseError::predicate(raw, "missing value"));
    }

    let left = match Literal::from_token(attr) {
        Literal::Text(name) if name == attr => {
            if name.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
                return Err(ParseError::predicate(raw, format!("invalid attribute name '{}'", attr)));
            }
            Operand::Field(name)
        }
        literal => Operand::Literal(literal),
    };

    Ok(PredicateFragment {
        scan_id,
        left,
        right: Literal::from_token(val),
        text: format!("{}.{}=={}", scan_id, attr, val),
    })
}

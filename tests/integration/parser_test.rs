use anyhow::{Result, anyhow};
use mfquery::query::parser::ast::{AggregateKind, Literal, Operand};
use mfquery::{parse, ParseError};

const SALES_SPEC: &str = "\
S: cust, prod, avg_1_quant, max_2_quant, count_3
n: 3
V: cust, prod
F: avg_1_quant, max_2_quant, count_3
sig: 1.state='NY', 2.state=NJ, 3.month==2
G: avg_1_quant > 5
";

#[test]
fn test_full_specification() -> Result<()> {
    let spec = parse(SALES_SPEC).map_err(|e| anyhow!("Parse error: {:?}", e))?;

    assert_eq!(spec.output_attributes, vec!["cust", "prod", "avg_1_quant", "max_2_quant", "count_3"]);
    assert_eq!(spec.scan_count, 3);
    assert_eq!(spec.grouping_attributes, vec!["cust", "prod"]);

    let names: Vec<&str> = spec.aggregates.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["avg_1_quant", "max_2_quant", "count_3", "sum_1_quant", "count_1"]);

    let max = spec.aggregate("max_2_quant").expect("max aggregate");
    assert_eq!(max.kind, AggregateKind::Max);
    assert_eq!(max.scan_id, 2);
    assert_eq!(max.base_attribute.as_deref(), Some("quant"));

    let count = spec.aggregate("count_3").expect("count aggregate");
    assert_eq!(count.base_attribute, None);

    assert_eq!(spec.scan_predicates.len(), 3);
    let third = &spec.scan_predicates[2].fragments[0];
    assert_eq!(third.left, Operand::Field("month".to_string()));
    assert_eq!(third.right, Literal::Integer(2));

    assert_eq!(spec.having.as_deref(), Some("avg_1_quant > 5"));
    Ok(())
}

#[test]
fn test_scan_aggregates_exclude_derived() -> Result<()> {
    let spec = parse(SALES_SPEC)?;
    let scan_one: Vec<&str> = spec.aggregates_for_scan(1).map(|a| a.name.as_str()).collect();
    assert_eq!(scan_one, vec!["sum_1_quant", "count_1"]);
    Ok(())
}

#[test]
fn test_constant_predicate_synthesis() -> Result<()> {
    let spec = parse("S: cust\nn: 3\nV: cust\nF: count_1, count_2, count_3\nsig:\n")?;
    assert_eq!(spec.scan_predicates.len(), 3);
    assert!(spec.scan_predicates.iter().all(|p| p.fragments.len() == 1 && p.fragments[0].is_constant()));
    Ok(())
}

#[test]
fn test_error_taxonomy() {
    assert!(matches!(parse("S: a\nn: x\nV: a\n"), Err(ParseError::MalformedInput { .. })));
    assert!(matches!(parse("S: a\nn: 1\nV: a\nH: b\n"), Err(ParseError::UnknownKey(key)) if key == "H"));
    assert!(matches!(parse("S: a\nn: 1\nV: a\nsig: 1.a>3\n"), Err(ParseError::PredicateError { .. })));
    assert!(matches!(parse("S: a\nn: 1\nV: a\nF: total_1_a\n"), Err(ParseError::InvalidAggregate { .. })));
    assert!(matches!(parse("S: a\nn: 1\nno separator here\n"), Err(ParseError::MalformedInput { line: 3, .. })));
}

#[test]
fn test_errors_name_the_offender() {
    let err = parse("S: a\nn: 1\nV: a\nsig: 1.a=1, 7.b=2\n").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("7.b=2"), "message was: {}", message);

    let err = parse("S: a\nn: 1\nV: a\nsigma: x\n").unwrap_err();
    assert!(err.to_string().contains("sigma"));
}

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use mfquery::{DataValue, MfEngine, Row};

#[path = "../common/mod.rs"]
mod common;

use common::{int, region_rows, sales_rows, text};

fn key_of(row: &Row, attrs: &[&str]) -> Vec<DataValue> {
    attrs.iter().map(|a| row.get(a).cloned().unwrap_or(DataValue::Null)).collect()
}

#[test]
fn test_region_scenario() -> Result<()> {
    let spec = "S: region, sum_1_quant, count_1\nn: 1\nV: region\nF: sum_1_quant,count_1\nsig: 1.region=='E'\n";
    let result = MfEngine::default().execute_query(spec, region_rows())?;

    assert_eq!(result.row_count(), 2);
    let east = &result.rows()[0];
    assert_eq!(east.get("region"), Some(&text("E")));
    assert_eq!(east.get("sum_1_quant"), Some(&int(15)));
    assert_eq!(east.get("count_1"), Some(&int(2)));

    let west = &result.rows()[1];
    assert_eq!(west.get("region"), Some(&text("W")));
    assert_eq!(west.get("sum_1_quant"), Some(&int(0)));
    assert_eq!(west.get("count_1"), Some(&int(0)));
    Ok(())
}

#[test]
fn test_output_groups_equal_input_groups() -> Result<()> {
    let rows = sales_rows();
    let spec = "S: cust, prod, count_1\nn: 1\nV: cust, prod\nF: count_1\nsig: 1.state=CT\n";
    let result = MfEngine::default().execute_query(spec, rows.clone())?;

    let input: HashSet<Vec<DataValue>> = rows.iter().map(|r| key_of(r, &["cust", "prod"])).collect();
    let output: HashSet<Vec<DataValue>> = result.rows().iter().map(|r| key_of(r, &["cust", "prod"])).collect();
    assert_eq!(input, output);
    assert_eq!(result.row_count(), input.len());
    Ok(())
}

#[test]
fn test_groups_in_first_seen_order() -> Result<()> {
    let spec = "S: cust\nn: 1\nV: cust\n";
    let result = MfEngine::default().execute_query(spec, sales_rows())?;
    let custs: Vec<&DataValue> = result.rows().iter().filter_map(|r| r.get("cust")).collect();
    assert_eq!(custs, vec![&text("Dan"), &text("Sam"), &text("Ana")]);
    Ok(())
}

#[test]
fn test_average_matches_sum_over_count() -> Result<()> {
    let spec = "S: cust, avg_1_quant, sum_1_quant, count_1\nn: 1\nV: cust\nF: avg_1_quant\nsig: 1.state=NY\n";
    let result = MfEngine::default().execute_query(spec, sales_rows())?;

    for row in result.rows() {
        let count = row.get("count_1").and_then(DataValue::as_f64).unwrap_or(0.0);
        let sum = row.get("sum_1_quant").and_then(DataValue::as_f64).unwrap_or(0.0);
        if count > 0.0 {
            let avg = row.get("avg_1_quant").and_then(DataValue::as_f64).expect("average present");
            assert!((avg - sum / count).abs() < 1e-9);
        } else {
            assert!(row.get("avg_1_quant").is_none());
        }
    }
    Ok(())
}

#[test]
fn test_average_absent_when_no_rows_match() -> Result<()> {
    let spec = "S: cust, avg_1_quant\nn: 1\nV: cust\nF: avg_1_quant\nsig: 1.state=CT\n";
    let result = MfEngine::default().execute_query(spec, sales_rows())?;

    let sam = result.rows().iter().find(|r| r.get("cust") == Some(&text("Sam"))).expect("Sam group");
    assert_eq!(sam.get("avg_1_quant"), Some(&DataValue::Float(7.0)));

    let dan = result.rows().iter().find(|r| r.get("cust") == Some(&text("Dan"))).expect("Dan group");
    assert_eq!(dan.columns(), vec!["cust"]);
    Ok(())
}

#[test]
fn test_synthesized_sum_and_count_are_populated() -> Result<()> {
    let spec = "S: prod, avg_1_quant, sum_1_quant, count_1\nn: 1\nV: prod\nF: avg_1_quant\n";
    let result = MfEngine::default().execute_query(spec, sales_rows())?;

    let pear = &result.rows()[1];
    assert_eq!(pear.get("prod"), Some(&text("Pear")));
    assert_eq!(pear.get("sum_1_quant"), Some(&int(15)));
    assert_eq!(pear.get("count_1"), Some(&int(3)));
    assert_eq!(pear.get("avg_1_quant"), Some(&DataValue::Float(5.0)));
    Ok(())
}

#[test]
fn test_constant_predicates_count_every_row() -> Result<()> {
    let spec = "S: prod, count_1, count_2, count_3\nn: 3\nV: prod\nF: count_1, count_2, count_3\nsig:\n";
    let result = MfEngine::default().execute_query(spec, sales_rows())?;

    let totals: HashMap<String, i64> = [("Apple", 5), ("Pear", 3)].iter().map(|(k, v)| (k.to_string(), *v)).collect();
    for row in result.rows() {
        let prod = row.get("prod").map(|v| v.to_string()).unwrap_or_default();
        for field in ["count_1", "count_2", "count_3"] {
            assert_eq!(row.get(field), Some(&int(totals[&prod])));
        }
    }
    Ok(())
}

#[test]
fn test_multiple_scans_with_min_max() -> Result<()> {
    let spec = "\
S: cust, min_1_quant, max_1_quant, max_2_quant, sum_3_quant
n: 3
V: cust
F: min_1_quant, max_1_quant, max_2_quant, sum_3_quant
sig: 1.state=NY, 2.state=NJ, 3.month=1
";
    let result = MfEngine::default().execute_query(spec, sales_rows())?;

    let dan = &result.rows()[0];
    assert_eq!(dan.get("min_1_quant"), Some(&int(5)));
    assert_eq!(dan.get("max_1_quant"), Some(&int(30)));
    assert_eq!(dan.get("max_2_quant"), Some(&int(20)));
    assert_eq!(dan.get("sum_3_quant"), Some(&int(15)));

    // Sam never appears in NJ, so max stays at its identity value
    let sam = &result.rows()[1];
    assert_eq!(sam.get("max_2_quant"), Some(&DataValue::Float(f64::NEG_INFINITY)));
    Ok(())
}

#[test]
fn test_conjunctive_predicate() -> Result<()> {
    let spec = "S: cust, sum_1_quant\nn: 1\nV: cust\nF: sum_1_quant\nsig: 1.state=NY, 1.month=1\n";
    let result = MfEngine::default().execute_query(spec, sales_rows())?;
    assert_eq!(result.rows()[0].get("sum_1_quant"), Some(&int(15)));
    Ok(())
}

#[test]
fn test_predicate_on_missing_field_excludes_row() -> Result<()> {
    let spec = "S: region, count_1\nn: 1\nV: region\nF: count_1\nsig: 1.channel=web\n";
    let result = MfEngine::default().execute_query(spec, region_rows())?;
    assert!(result.rows().iter().all(|r| r.get("count_1") == Some(&int(0))));
    Ok(())
}

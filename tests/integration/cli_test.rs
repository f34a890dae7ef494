use anyhow::Result;
use std::fs;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

const ROWS_JSON: &str = r#"[
    {"region": "E", "quant": 10},
    {"region": "E", "quant": 5},
    {"region": "W", "quant": 7}
]"#;

const REGION_SPEC: &str = "S: region, sum_1_quant, count_1, avg_1_quant\nn: 1\nV: region\nF: sum_1_quant, count_1, avg_1_quant\nsig: 1.region=='E'\n";

fn mfq() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mfq"))
}

fn temp_file(contents: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Run a specification and print delimited output
#[test]
fn test_cli_run_csv() -> Result<()> {
    let spec = temp_file(REGION_SPEC)?;
    let rows = temp_file(ROWS_JSON)?;

    let output = mfq()
        .args(["run", "--format", "csv"])
        .arg("--spec")
        .arg(spec.path())
        .arg("--rows")
        .arg(rows.path())
        .output()?;

    assert!(output.status.success(), "CLI run failed: {}", String::from_utf8_lossy(&output.stderr));
    let output_str = String::from_utf8(output.stdout)?;
    assert_eq!(
        output_str,
        "region,sum_1_quant,count_1,avg_1_quant\nE,15,2,7.5\nW,0,0,\n"
    );
    Ok(())
}

/// Table output ends with a row count
#[test]
fn test_cli_run_table_with_linear_lookup() -> Result<()> {
    let spec = temp_file(REGION_SPEC)?;
    let rows = temp_file(ROWS_JSON)?;

    let output = mfq()
        .args(["--lookup", "linear", "run"])
        .arg("--spec")
        .arg(spec.path())
        .arg("--rows")
        .arg(rows.path())
        .output()?;

    assert!(output.status.success(), "CLI run failed");
    let output_str = String::from_utf8(output.stdout)?;
    assert!(output_str.contains("region"), "Column header not found");
    assert!(output_str.contains("sum_1_quant"), "Column header not found");
    assert!(output_str.contains("(2 rows)"), "Row count not found");
    Ok(())
}

/// Output can be written to a file with a custom delimiter
#[test]
fn test_cli_run_to_output_file() -> Result<()> {
    let spec = temp_file(REGION_SPEC)?;
    let rows = temp_file(ROWS_JSON)?;
    let temp_dir = tempfile::tempdir()?;
    let out_path = temp_dir.path().join("result.txt");

    let status = mfq()
        .args(["run", "--format", "csv", "--delimiter", ";"])
        .arg("--spec")
        .arg(spec.path())
        .arg("--rows")
        .arg(rows.path())
        .arg("--output")
        .arg(&out_path)
        .status()?;

    assert!(status.success());
    let written = fs::read_to_string(&out_path)?;
    assert!(written.starts_with("region;sum_1_quant;count_1;avg_1_quant\n"));
    assert!(written.contains("E;15;2;7.5\n"));
    Ok(())
}

/// Explain shows the resolved specification and compiled scans
#[test]
fn test_cli_explain() -> Result<()> {
    let spec = temp_file("S: prod, avg_1_quant\nn: 2\nV: prod\nF: avg_1_quant\nsig: 2.state=NY\n")?;

    let output = mfq().arg("explain").arg("--spec").arg(spec.path()).output()?;

    assert!(output.status.success(), "CLI explain failed");
    let output_str = String::from_utf8(output.stdout)?;
    assert!(output_str.contains("n: 2"));
    assert!(output_str.contains("F: avg_1_quant, sum_1_quant, count_1"));
    assert!(output_str.contains("scan 1: 1.1==1 (always true)"));
    assert!(output_str.contains("scan 2: 2.state==NY"));
    Ok(())
}

/// A malformed specification exits with an error and no output
#[test]
fn test_cli_rejects_bad_specification() -> Result<()> {
    let spec = temp_file("S: region\nn: 1\nV: region\nF: median_1_quant\n")?;
    let rows = temp_file(ROWS_JSON)?;

    let output = mfq()
        .arg("run")
        .arg("--spec")
        .arg(spec.path())
        .arg("--rows")
        .arg(rows.path())
        .output()?;

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("median_1_quant"), "stderr was: {}", stderr);
    Ok(())
}

/// Rows that are not a JSON array of objects are reported
#[test]
fn test_cli_rejects_bad_rows() -> Result<()> {
    let spec = temp_file(REGION_SPEC)?;
    let rows = temp_file("{\"region\": \"E\"}")?;

    let output = mfq()
        .arg("run")
        .arg("--spec")
        .arg(spec.path())
        .arg("--rows")
        .arg(rows.path())
        .output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("JSON array"));
    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use mfquery::query::executor::engine::{EngineConfig, MfEngine};
use mfquery::query::executor::result::{QueryResultSet, Row};
use mfquery::GroupLookup;

#[derive(Parser)]
#[command(author, version, about = "mfq - run MF-structure aggregation queries over JSON rows")]
struct Cli {
    /// How scans find the group of an input row
    #[arg(short, long, default_value = "hashed")]
    lookup: GroupLookup,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a specification over a JSON array of row objects
    Run {
        /// Specification file (S, n, V, F, sig, G lines)
        #[arg(short, long)]
        spec: PathBuf,

        /// JSON file holding an array of row objects
        #[arg(short, long)]
        rows: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Field delimiter for delimited output
        #[arg(short, long, default_value_t = ',')]
        delimiter: char,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a specification and show its resolved form
    Explain {
        /// Specification file
        #[arg(short, long)]
        spec: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Aligned text table
    Table,
    /// Delimited text with a header line
    Csv,
}

fn load_rows(path: &Path) -> Result<Vec<Row>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rows from {}", path.display()))?;
    let rows: Vec<Row> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse rows in {} as a JSON array of objects", path.display()))?;
    Ok(rows)
}

fn load_spec(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read specification {}", path.display()))
}

fn render(result: &QueryResultSet, format: OutputFormat, delimiter: char) -> String {
    match format {
        OutputFormat::Table => result.to_string_table(),
        OutputFormat::Csv => result.to_delimited(delimiter),
    }
}

fn explain(engine: &MfEngine, spec_text: &str) -> Result<String> {
    let plan = engine.prepare(spec_text)?;
    let mut out = plan.specification().to_string();
    out.push_str("Compiled scans:\n");
    for predicate in plan.predicates() {
        let marker = if predicate.is_always_true() { " (always true)" } else { "" };
        out.push_str(&format!("  scan {}: {}{}\n", predicate.scan_id(), predicate.text(), marker));
    }
    Ok(out)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = EngineConfig {
        group_lookup: cli.lookup,
        ..EngineConfig::default()
    };
    let engine = MfEngine::new(config);

    match &cli.command {
        Commands::Run { spec, rows, format, delimiter, output } => {
            let spec_text = load_spec(spec)?;
            let rows = load_rows(rows)?;
            let result = engine
                .execute_query(&spec_text, rows)
                .context("Failed to execute MF query")?;
            let rendered = render(&result, *format, *delimiter);
            match output {
                Some(path) => fs::write(path, rendered)
                    .with_context(|| format!("Failed to write output to {}", path.display()))?,
                None => print!("{}", rendered),
            }
        }
        Commands::Explain { spec } => {
            let spec_text = load_spec(spec)?;
            print!("{}", explain(&engine, &spec_text)?);
        }
    }

    Ok(())
}

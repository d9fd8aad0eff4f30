use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "ctxlocal workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the backend benchmarks and write a comparison report
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,
    },
}

const BENCH: &str = "local_benchmark";

/// Every other column is reported relative to this one.
const BASELINE: &str = "std_mutex_hash_map";

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bench { quick, report_only } => {
            if !report_only {
                run_benchmarks(quick)?;
            }
            generate_report()?;
        }
    }

    Ok(())
}

fn run_benchmarks(quick: bool) -> Result<()> {
    println!(">>> Benchmarking {BENCH}...");
    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.arg("bench").arg("--bench").arg(BENCH);

    // Args for the test runner (Criterion) go after --
    cmd.arg("--");
    if quick {
        cmd.arg("--measurement-time").arg("0.1");
        cmd.arg("--noplot");
        cmd.arg("--sample-size").arg("10");
    }

    let status = cmd.status().context("failed to spawn cargo bench")?;
    if !status.success() {
        anyhow::bail!("benchmark {BENCH} failed");
    }
    println!("Finished in {:.2?}", start.elapsed());
    Ok(())
}

fn generate_report() -> Result<()> {
    println!("\n>>> Generating Report...");
    let criterion_dir = Path::new("target/criterion");
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    // group -> function -> ops/s
    let mut results: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for group in fs::read_dir(criterion_dir)?.flatten() {
        let group_name = group.file_name().to_string_lossy().into_owned();
        if group_name == "report" || !group.path().is_dir() {
            continue;
        }
        for function in fs::read_dir(group.path())?.flatten() {
            let function_name = function.file_name().to_string_lossy().into_owned();
            let estimates = function.path().join("new").join("estimates.json");
            if let Some(ops) = read_ops_per_sec(&estimates)? {
                results.entry(group_name.clone()).or_default().insert(function_name, ops);
            }
        }
    }

    let columns: BTreeSet<&String> = results.values().flat_map(|m| m.keys()).collect();

    let report_path = Path::new("benchmark_results/report.md");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }

    use std::fmt::Write as _;
    let mut out = String::new();
    writeln!(out, "# Local Storage Benchmark Report\n")?;
    write!(out, "| Operation |")?;
    for column in &columns {
        write!(out, " {column} (Ops/s) | vs {BASELINE} |")?;
    }
    writeln!(out)?;
    write!(out, "|---|")?;
    for _ in &columns {
        write!(out, "---|---|")?;
    }
    writeln!(out)?;

    for (group, row) in &results {
        write!(out, "| {group} |")?;
        let baseline = row.get(BASELINE).copied().unwrap_or(0.0);
        for column in &columns {
            match row.get(*column) {
                Some(ops) => {
                    let rel = if baseline > 0.0 { ops / baseline } else { 0.0 };
                    write!(out, " {} | **{rel:.2}x** |", format_ops(*ops))?;
                }
                None => write!(out, " N/A | - |")?,
            }
        }
        writeln!(out)?;
    }

    fs::write(report_path, out)
        .with_context(|| format!("failed to write {}", report_path.display()))?;
    println!("Report written to {}", report_path.display());
    Ok(())
}

fn read_ops_per_sec(estimates: &Path) -> Result<Option<f64>> {
    if !estimates.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(estimates)
        .with_context(|| format!("failed to read {}", estimates.display()))?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("malformed criterion output in {}", estimates.display()))?;
    let time_ns = json
        .get("mean")
        .and_then(|m| m.get("point_estimate"))
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(0.0);
    Ok((time_ns > 0.0).then(|| 1e9 / time_ns))
}

fn format_ops(ops: f64) -> String {
    if ops > 1_000_000.0 {
        format!("{:.2}M", ops / 1_000_000.0)
    } else if ops > 1_000.0 {
        format!("{:.2}K", ops / 1_000.0)
    } else {
        format!("{ops:.0}")
    }
}

//! Run Report
//!
//! Parses a directory of engine run logs, averages repeated trials and prints the
//! end-to-end timing table. The table is also written as JSON for chart and
//! spreadsheet generators.

use chrono::Utc;
use grid_eval::aggregate::{AggregateReport, AggregatedRow, MethodComparison, SkippedLog};
use grid_eval::config::AnalysisConfig;
use grid_eval::logging::init_logging;
use grid_eval::{LogRunParser, RunAggregator};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct RunReportBundle<'a> {
    generated_at: String,
    logs_directory: String,
    rows: &'a [AggregatedRow],
    comparisons: Vec<MethodComparison>,
    skipped: &'a [SkippedLog],
}

fn print_usage() {
    println!("Usage: run_report <LOGS_DIR> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -o, --output FILE       Output JSON file (default: experiment_report.json)");
    println!("  -c, --config FILE       Analysis config JSON");
    println!("  -d, --dataset NAME      Only print rows for this dataset");
    println!("  -h, --help              Show this help");
}

fn print_rows(rows: &[&AggregatedRow]) {
    println!(
        "{:<14} {:<14} {:>4} {:>8} {:>12} {:>11} {:>11} {:>11} {:>11} {:>11} {:>11}",
        "Dataset",
        "Method",
        "P",
        "Mem(GB)",
        "End-to-End",
        "Pre Total",
        "PR Total",
        "DegCalc",
        "GridGen",
        "DegSetup",
        "Iter"
    );
    println!("{}", "-".repeat(132));
    for row in rows {
        println!(
            "{:<14} {:<14} {:>4} {:>8} {:>12.2} {:>11.2} {:>11.2} {:>11.2} {:>11.2} {:>11.2} {:>11.2}",
            row.dataset,
            row.method.display_name(),
            row.parallelism,
            row.memory_gb,
            row.end_to_end,
            row.pre_total,
            row.algo_total,
            row.pre_degcalc,
            row.pre_gridgen,
            row.algo_degsetup,
            row.algo_iter,
        );
    }
}

fn print_comparisons(comparisons: &[MethodComparison]) {
    println!(
        "{:<14} {:>4} {:>8} {:>14} {:>14} {:>9}",
        "Dataset", "P", "Mem(GB)", "Baseline", "Degree-based", "Speedup"
    );
    println!("{}", "-".repeat(68));
    let fmt = |v: Option<f64>| v.map(|t| format!("{:.2}", t)).unwrap_or_else(|| "-".into());
    for c in comparisons {
        println!(
            "{:<14} {:>4} {:>8} {:>14} {:>14} {:>9}",
            c.dataset,
            c.parallelism,
            c.memory_gb,
            fmt(c.baseline_end_to_end),
            fmt(c.degree_aware_end_to_end),
            c.speedup
                .map(|s| format!("{:.2}x", s))
                .unwrap_or_else(|| "-".into()),
        );
    }
}

fn empty_table_message(dataset_filter: Option<&str>) -> String {
    match dataset_filter {
        Some(name) => format!("No rows for dataset '{}'.", name),
        None => {
            "No pagerank runs found; end-to-end rows need at least one pagerank log.".to_string()
        }
    }
}

fn ensure_output_dir(path: &str) {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
}

fn write_bundle(report: &AggregateReport, logs_dir: &str, output_file: &str) -> std::io::Result<()> {
    let bundle = RunReportBundle {
        generated_at: Utc::now().to_rfc3339(),
        logs_directory: logs_dir.to_string(),
        rows: &report.rows,
        comparisons: report.method_comparison(),
        skipped: &report.skipped,
    };
    ensure_output_dir(output_file);
    let json = serde_json::to_string_pretty(&bundle)?;
    let mut file = File::create(output_file)?;
    file.write_all(json.as_bytes())
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut logs_dir: Option<String> = None;
    let mut output_file = "experiment_report.json".to_string();
    let mut config_file: Option<String> = None;
    let mut dataset_filter: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--output" | "-o" => {
                if i + 1 < args.len() {
                    output_file = args[i + 1].clone();
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_file = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--dataset" | "-d" => {
                if i + 1 < args.len() {
                    dataset_filter = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other if logs_dir.is_none() && !other.starts_with('-') => {
                logs_dir = Some(other.to_string());
            }
            _ => {}
        }
        i += 1;
    }

    let Some(logs_dir) = logs_dir else {
        print_usage();
        std::process::exit(1);
    };

    let config = match &config_file {
        Some(path) => AnalysisConfig::from_json_file(path).unwrap_or_else(|e| {
            eprintln!("Error loading config {}: {}", path, e);
            std::process::exit(1);
        }),
        None => AnalysisConfig::default(),
    };
    let _guard = init_logging(&config.logging).unwrap_or_else(|e| {
        eprintln!("Error initializing logging: {}", e);
        None
    });

    let parser = LogRunParser::new(&config);
    let logs = parser.parse_directory(&logs_dir).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let report = match RunAggregator::from_logs(&config, &logs).aggregate() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {} in {}", e, logs_dir);
            std::process::exit(1);
        }
    };

    println!("Run Report");
    println!("==========\n");
    println!("Logs directory: {}", logs_dir);
    println!("Log files:      {}", logs.len());
    println!("Rows:           {}", report.rows.len());
    println!("Skipped:        {}", report.skipped.len());
    println!();

    let rows: Vec<&AggregatedRow> = match &dataset_filter {
        Some(name) => report.rows_for_dataset(name).collect(),
        None => report.rows.iter().collect(),
    };
    if rows.is_empty() {
        println!("{}", empty_table_message(dataset_filter.as_deref()));
    } else {
        print_rows(&rows);
    }

    println!();
    print_comparisons(&report.method_comparison());

    if let Err(e) = write_bundle(&report, &logs_dir, &output_file) {
        eprintln!("Error writing {}: {}", output_file, e);
        std::process::exit(1);
    }
    println!("\nResults saved to {}", output_file);
}

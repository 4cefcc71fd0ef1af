//! Partition Quality
//!
//! Scans the block files of a baseline and a degree-aware grid, then reports load
//! balance (absolute deviation from the ideal per-block edge count) and block size
//! distribution statistics for both.

use chrono::Utc;
use grid_eval::blocks::{BlockCoordinate, BlockFileScanner, BlockInspection, BlockScan, Edge};
use grid_eval::config::AnalysisConfig;
use grid_eval::degrees::{self, DegreeSummary};
use grid_eval::distribution::{DistributionComparator, DistributionComparison, LogHistogram};
use grid_eval::logging::init_logging;
use grid_eval::quality::{
    BalanceVerdict, PartitionQualityAnalyzer, PartitionQualityReport, QualityComparison,
};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
struct PartitionQualityBundle {
    generated_at: String,
    dataset: String,
    expected_total_edges: u64,
    baseline: Option<PartitionQualityReport>,
    degree_aware: Option<PartitionQualityReport>,
    quality_comparison: Option<QualityComparison>,
    distribution: Option<DistributionComparison>,
    histogram: Option<LogHistogram>,
    degree_files: Option<DegreeSummary>,
    block: Option<BlockInspection>,
}

fn print_usage() {
    println!("Usage: partition_quality [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --baseline-dir DIR      Baseline grid directory");
    println!("  --p-baseline NUM        P used for the baseline grid");
    println!("  --dv-dir DIR            Degree-aware grid directory");
    println!("  --p-dv NUM              P used for the degree-aware grid");
    println!("  -e, --edges NUM         Total number of edges in the graph");
    println!("  --dataset NAME          Dataset name for the report (default: graph)");
    println!("  --block I J             Compare block (I, J) of both grids with sample edges");
    println!("  --samples NUM           Sample edges shown per block (default: 5)");
    println!("  -c, --config FILE       Analysis config JSON");
    println!("  -o, --output FILE       Output JSON file");
    println!("  -h, --help              Show this help");
}

fn print_quality(title: &str, report: &PartitionQualityReport) {
    println!("--- {} ---", title);
    println!("  Ideal Edges per Block:    {:.2}", report.ideal_edges_per_block);
    println!("  Total Absolute Deviation: {:.0}", report.total_absolute_deviation);
    println!("  Verified Total Edges:     {}", report.verified_total_edges);
    println!(
        "  Non-Empty Blocks:         {} / {}",
        report.non_empty_blocks, report.total_blocks
    );
    if !report.verified {
        println!(
            "  ! Sum of block edges ({}) does not match the expected total ({})",
            report.verified_total_edges, report.expected_total_edges
        );
    }
}

fn print_edges(title: &str, path: &Path, edges: u64, sample: &[Edge]) {
    println!("--- {} ---", title);
    println!("  File:         {}", path.display());
    println!("  Total Edges:  {}", edges);
    let sample: Vec<String> = sample
        .iter()
        .map(|e| format!("({}, {})", e.src, e.dst))
        .collect();
    println!("  Sample Edges: [{}]", sample.join(", "));
}

fn print_inspection(inspection: &BlockInspection) {
    let delta = &inspection.delta;
    println!("\nBlock {}", delta.coordinate);
    println!("{}", "-".repeat(60));
    print_edges(
        "Baseline Version",
        &inspection.baseline_path,
        delta.baseline_edges,
        &inspection.baseline_sample,
    );
    print_edges(
        "Degree-Based Version",
        &inspection.other_path,
        delta.other_edges,
        &inspection.other_sample,
    );
    let change = delta
        .percent_change
        .map(|p| format!(" ({:+.2}%)", p))
        .unwrap_or_default();
    match delta.difference {
        d if d > 0 => println!("  The degree-based block is LARGER by {} edges{}", d, change),
        d if d < 0 => println!(
            "  The degree-based block is SMALLER by {} edges{}",
            d.unsigned_abs(),
            change
        ),
        _ => println!("  Both blocks have the same number of edges"),
    }
}

fn scan_or_report(scanner: &BlockFileScanner, dir: &str, p: u32, label: &str) -> Option<BlockScan> {
    match scanner.scan(dir, p) {
        Ok(scan) => Some(scan),
        Err(e) => {
            eprintln!("Could not analyze {} grid: {}", label, e);
            None
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

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut baseline_dir: Option<String> = None;
    let mut p_baseline: Option<u32> = None;
    let mut dv_dir: Option<String> = None;
    let mut p_dv: Option<u32> = None;
    let mut total_edges: Option<u64> = None;
    let mut dataset = "graph".to_string();
    let mut config_file: Option<String> = None;
    let mut output_file: Option<String> = None;
    let mut block: Option<BlockCoordinate> = None;
    let mut samples = BlockFileScanner::DEFAULT_SAMPLE_EDGES;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1).cloned();
        match args[i].as_str() {
            "--baseline-dir" => {
                baseline_dir = value;
                i += 1;
            }
            "--p-baseline" => {
                p_baseline = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "--dv-dir" => {
                dv_dir = value;
                i += 1;
            }
            "--p-dv" => {
                p_dv = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "--edges" | "-e" => {
                total_edges = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "--dataset" => {
                if let Some(v) = value {
                    dataset = v;
                }
                i += 1;
            }
            "--config" | "-c" => {
                config_file = value;
                i += 1;
            }
            "--block" => {
                let row = value.and_then(|v| v.parse().ok());
                let col = args.get(i + 2).and_then(|v| v.parse().ok());
                if let (Some(row), Some(col)) = (row, col) {
                    block = Some(BlockCoordinate::new(row, col));
                } else {
                    eprintln!("--block expects two indices: --block I J");
                    std::process::exit(1);
                }
                i += 2;
            }
            "--samples" => {
                samples = value.and_then(|v| v.parse().ok()).unwrap_or(samples);
                i += 1;
            }
            "--output" | "-o" => {
                output_file = value;
                i += 1;
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {}
        }
        i += 1;
    }

    let (Some(baseline_dir), Some(p_baseline), Some(dv_dir), Some(p_dv), Some(total_edges)) =
        (baseline_dir, p_baseline, dv_dir, p_dv, total_edges)
    else {
        print_usage();
        std::process::exit(1);
    };
    let output_file =
        output_file.unwrap_or_else(|| format!("{}_partition_quality.json", dataset));

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

    println!("{}", "=".repeat(60));
    println!("Partitioning Quality Analysis: {}", dataset);
    println!(
        "Total Edges: {}, Baseline P: {}, Degree-based P: {}",
        total_edges, p_baseline, p_dv
    );
    println!("{}", "=".repeat(60));

    let (scanner, comparator) = match (
        BlockFileScanner::new(&config),
        DistributionComparator::new(&config),
    ) {
        (Ok(scanner), Ok(comparator)) => (scanner, comparator),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let analyzer = PartitionQualityAnalyzer::new();

    let baseline_scan = scan_or_report(&scanner, &baseline_dir, p_baseline, "baseline");
    let dv_scan = scan_or_report(&scanner, &dv_dir, p_dv, "degree-based");

    let baseline = baseline_scan
        .as_ref()
        .map(|scan| analyzer.analyze(scan, total_edges));
    let degree_aware = dv_scan.as_ref().map(|scan| analyzer.analyze(scan, total_edges));

    if let Some(report) = &baseline {
        print_quality("Baseline Version", report);
    }
    if let Some(report) = &degree_aware {
        print_quality("Degree-Based Version", report);
    }

    let quality_comparison = match (&baseline, &degree_aware) {
        (Some(b), Some(d)) => Some(analyzer.compare(b, d)),
        _ => None,
    };
    if let Some(cmp) = &quality_comparison {
        println!("\nConclusion");
        println!("{}", "-".repeat(60));
        match cmp.verdict {
            BalanceVerdict::MoreBalanced => println!(
                "Degree-based partitioning is MORE BALANCED (deviation reduced by {:.2}%)",
                cmp.deviation_reduction_pct
            ),
            BalanceVerdict::LessBalanced => println!("Degree-based partitioning is LESS BALANCED"),
            BalanceVerdict::EquallyBalanced => {
                println!("Both partitioning methods have the same level of balance")
            }
        }
        if !cmp.both_verified {
            println!("! Verification warning: block edge sums do not match the provided total");
        }
    }

    let distribution = match (&baseline_scan, &dv_scan) {
        (Some(b), Some(d)) => Some(comparator.compare(b, d)),
        _ => None,
    };
    let histogram = distribution.as_ref().and_then(|d| {
        comparator.histogram(&d.baseline, &d.other, config.histogram_bins)
    });
    if let Some(dist) = &distribution {
        println!("\nBlock Size Distribution (unit: {} bytes)", dist.unit_bytes);
        println!("{}", "-".repeat(60));
        println!("  Baseline std dev:     {:.0}", dist.baseline.std_dev);
        println!("  Degree-based std dev: {:.0}", dist.other.std_dev);
        println!("  Reduction:            {:.1}%", dist.reduction_pct);
    }

    let block = match (block, &baseline_scan, &dv_scan) {
        (Some(coordinate), Some(b), Some(d)) => {
            match scanner.inspect_block(b, d, coordinate, samples) {
                Ok(Some(inspection)) => {
                    print_inspection(&inspection);
                    Some(inspection)
                }
                Ok(None) => {
                    println!(
                        "\nBlock {} lies outside the baseline ({}x{}) or degree-based ({}x{}) grid",
                        coordinate, p_baseline, p_baseline, p_dv, p_dv
                    );
                    None
                }
                Err(e) => {
                    eprintln!("Could not read block {}: {}", coordinate, e);
                    None
                }
            }
        }
        _ => None,
    };

    let degree_files = match degrees::summarize(&dv_dir) {
        Ok(summary) => {
            if !summary.matches_edges(total_edges) {
                println!("\n! Degree file sums do not match the provided total edges");
            }
            Some(summary)
        }
        Err(e) => {
            println!("\nDegree files not checked: {}", e);
            None
        }
    };

    let bundle = PartitionQualityBundle {
        generated_at: Utc::now().to_rfc3339(),
        dataset,
        expected_total_edges: total_edges,
        baseline,
        degree_aware,
        quality_comparison,
        distribution,
        histogram,
        degree_files,
        block,
    };

    ensure_output_dir(&output_file);
    let json = match serde_json::to_string_pretty(&bundle) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing report: {}", e);
            std::process::exit(1);
        }
    };
    match File::create(&output_file).and_then(|mut f| f.write_all(json.as_bytes())) {
        Ok(()) => println!("\nResults saved to {}", output_file),
        Err(e) => {
            eprintln!("Error writing {}: {}", output_file, e);
            std::process::exit(1);
        }
    }
}

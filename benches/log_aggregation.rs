//! Benchmark for run log parsing and aggregation
//!
//! Measures line classification over synthetic engine logs and the cost of averaging
//! many trials into the timing table.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use grid_eval::{LogRunParser, MetricRecord, RunAggregator};

/// Synthetic engine log with `noise` unrelated lines around the timing lines
fn synthetic_log(noise: usize) -> String {
    let mut lines = Vec::with_capacity(noise + 4);
    for i in 0..noise {
        lines.push(format!("[worker {}] processed partition {} in 0.0{} s", i % 16, i, i % 10));
        if i == noise / 2 {
            lines.push("Phase 1 (Degree Calculation) took 31.25 seconds.".to_string());
            lines.push("it takes 104.5 seconds to generate edge grid".to_string());
        }
    }
    lines.push("degree read used 2.5 seconds".to_string());
    lines.push("20 iterations of pagerank took 150.75 seconds".to_string());
    lines.join("\n")
}

/// Benchmark classifying every line of a log
fn bench_parse_log(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_log");
    let parser = LogRunParser::default();

    for noise in [100, 1_000, 10_000].iter() {
        let text = synthetic_log(*noise);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(noise), &text, |b, text| {
            b.iter(|| black_box(parser.parse_str(black_box(text))));
        });
    }

    group.finish();
}

/// Benchmark grouping and averaging a full experiment matrix
fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let record = LogRunParser::default().parse_str(&synthetic_log(10));

    for trials in [1usize, 5, 20].iter() {
        let mut names = Vec::new();
        for dataset in ["twitter", "friendster", "uk2007"] {
            for method in ["baseline", "dv"] {
                for p in [4, 8, 16, 32] {
                    names.push(format!("{}_preprocess_{}_p{}.log", dataset, method, p));
                    for mem in [8, 16, 32] {
                        names.push(format!("{}_pagerank_{}_p{}_m{}gb.log", dataset, method, p, mem));
                    }
                }
            }
        }

        group.bench_with_input(BenchmarkId::from_parameter(trials), trials, |b, &trials| {
            b.iter(|| {
                let mut aggregator = RunAggregator::default();
                for name in &names {
                    for _ in 0..trials {
                        aggregator.add(name, record).ok();
                    }
                }
                black_box(aggregator.aggregate())
            });
        });
    }

    group.finish();
}

/// Benchmark per-metric averaging alone
fn bench_average(c: &mut Criterion) {
    let records: Vec<MetricRecord> = (0..1_000)
        .map(|i| MetricRecord {
            pre_degree_calc: (i % 3 != 0).then_some(i as f64),
            pre_grid_gen: Some(i as f64 * 0.5),
            pr_degree_setup: None,
            pr_iteration: Some(100.0 + i as f64),
        })
        .collect();

    c.bench_function("average_1000_records", |b| {
        b.iter(|| black_box(MetricRecord::average(black_box(&records))));
    });
}

criterion_group!(benches, bench_parse_log, bench_aggregate, bench_average);
criterion_main!(benches);

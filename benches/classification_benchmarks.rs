//! Classification and Contract Validation Benchmarks
//!
//! Hot-path costs on every trigger (classification, urgency ordering) and on
//! every stage completion (post-stage contract validation).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::path::Path;
use venture_pipeline::contracts::StageContractRegistry;
use venture_pipeline::triggers::sort_by_urgency;
use venture_pipeline::{build_dispatch_request, classify, DispatchRequest};

const EVENTS: [&str; 6] = [
    "decision.submitted",
    "stage.completed",
    "venture.ready",
    "ops.cycle",
    "chairman.override",
    "unknown.event",
];

fn benchmark_classification(c: &mut Criterion) {
    c.bench_function("classify", |b| {
        b.iter(|| {
            for event in EVENTS {
                black_box(classify(black_box(event)));
            }
        })
    });

    c.bench_function("build_dispatch_request", |b| {
        b.iter(|| build_dispatch_request(black_box("gate.evaluated"), json!({"venture_id": "v-1"})))
    });
}

fn benchmark_urgency_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_by_urgency");
    for size in [10usize, 100, 1000] {
        let requests: Vec<DispatchRequest> = (0..size)
            .map(|n| build_dispatch_request(EVENTS[n % EVENTS.len()], json!({})))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &requests, |b, requests| {
            b.iter(|| {
                let mut batch = requests.clone();
                sort_by_urgency(&mut batch);
                batch
            })
        });
    }
    group.finish();
}

fn benchmark_contract_validation(c: &mut Criterion) {
    let registry = StageContractRegistry::load(Path::new("config/stage_contracts.yaml"))
        .expect("shipped contracts should load");
    let output = json!({
        "venture_name": "Harvest Link",
        "problem_statement": "Restaurants cannot source local produce reliably",
        "target_market": "Independent restaurants",
    });

    c.bench_function("validate_post_stage", |b| {
        b.iter(|| registry.validate_post_stage(black_box(1), black_box(&output)))
    });
}

criterion_group!(
    benches,
    benchmark_classification,
    benchmark_urgency_sort,
    benchmark_contract_validation
);
criterion_main!(benches);

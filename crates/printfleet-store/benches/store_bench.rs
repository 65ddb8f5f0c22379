// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for whole-collection JSON persistence in the
// printfleet-store crate.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use printfleet_core::types::{JobStatus, Priority, PrintJob};
use printfleet_store::{Collection, JsonCollection};

fn job(n: u64) -> PrintJob {
    PrintJob {
        id: format!("job-{n:03}"),
        name: format!("batch {n}"),
        filename: "bracket.gcode".into(),
        quantity: 4,
        priority: Priority::Normal,
        material: "PETG".into(),
        assigned_printers: vec!["ZB3D-001".into(), "ZB3D-002".into()],
        status: JobStatus::Pending,
        progress: 0,
        estimated_time: "2h".into(),
        created: chrono::Utc::now(),
        started: None,
        completed: None,
        modified: None,
        current_file_index: 0,
        files_printed: 0,
    }
}

/// Benchmark a single upsert (full rewrite) at growing collection sizes.
///
/// Every mutation rewrites the whole array, so cost grows with the number of
/// jobs already on disk.
fn bench_upsert_rewrite(c: &mut Criterion) {
    let mut group = c.benchmark_group("json_collection_upsert");
    for size in [10u64, 100, 1000] {
        let dir = tempfile::tempdir().expect("tempdir");
        let col: JsonCollection<PrintJob> =
            JsonCollection::open(dir.path().join("jobs.json")).expect("open");
        for n in 1..=size {
            col.upsert(job(n)).expect("seed");
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut updated = job(size / 2 + 1);
                updated.progress = 50;
                col.upsert(black_box(updated)).expect("upsert");
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_upsert_rewrite);
criterion_main!(benches);

//! Benchmarks for conflict detection and preview

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use itembank::merge::{ConflictDetector, MergeEngine, MergeStrategy};
use itembank::Item;

fn sample_items(count: usize, prefix: &str) -> Vec<Item> {
    let sample_texts = [
        "Calculate the voltage across a 10 ohm resistor carrying 2 A",
        "Define Kirchhoff's current law",
        "What is the derivative of sin(x)?",
        "Name the SI unit of capacitance",
        "Explain the difference between AC and DC",
        "Solve for x: 3x + 5 = 20",
        "State Newton's second law of motion",
        "What is the time constant of an RC circuit?",
    ];

    (0..count)
        .map(|i| {
            Item::new(
                format!("{}{}", prefix, i),
                format!("{} (variant {})", sample_texts[i % sample_texts.len()], i),
            )
            .with_answer(format!("{}", i * 7 % 13))
            .with_topic(format!("topic{}", i % 4))
        })
        .collect()
}

fn bench_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect");
    let detector = ConflictDetector::default();

    for size in [25usize, 100, 250] {
        let existing = sample_items(size, "q");
        let incoming = sample_items(size, "n");
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| detector.detect(black_box(&existing), black_box(&incoming)))
        });
    }
    group.finish();
}

fn bench_preview(c: &mut Criterion) {
    let engine = MergeEngine::default();
    let existing = sample_items(100, "q");
    let incoming = sample_items(100, "q");

    c.bench_function("preview_skip_duplicates_100", |b| {
        b.iter(|| {
            engine.preview(
                black_box(&existing),
                black_box(&incoming),
                MergeStrategy::SkipDuplicates,
            )
        })
    });
}

criterion_group!(benches, bench_detect, bench_preview);
criterion_main!(benches);

//! Reconstruction throughput on synthetic grid plans.
//!
//! Run with: cargo bench -p floorplan-engine --bench reconstruct

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use floorplan_engine::{FloorPlanEngine, FrameSize, Line, PlanInput, Point, PrimitiveSet, SourceKind, TextAnchor};

/// A `cells` x `cells` grid of double-stroke walls, labeled along the
/// diagonal. Line count grows as 4 * (cells + 1).
fn generate_grid_plan(cells: usize) -> PrimitiveSet {
    let pitch = 200.0;
    let span = cells as f64 * pitch;
    let mut set = PrimitiveSet::new(SourceKind::Vector, FrameSize { width: span + 100.0, height: span + 100.0 });

    for i in 0..=cells {
        let offset = i as f64 * pitch;
        for (delta, width) in [(0.0, 0.7), (8.0, 0.35)] {
            let o = offset + delta;
            set.push_line(Line::new(Point::new(0.0, o), Point::new(span, o), width));
            set.push_line(Line::new(Point::new(o, 0.0), Point::new(o, span), width));
        }
    }
    for i in 0..cells {
        let c = i as f64 * pitch + pitch / 2.0;
        let label = if i % 2 == 0 { "침실" } else { "거실" };
        set.push_text(TextAnchor::new(label, Point::new(c, c), 9.0));
    }
    set.push_text(TextAnchor::new("2000", Point::new(pitch / 2.0, -20.0), 7.0));
    set
}

fn bench_reconstruct(c: &mut Criterion) {
    let engine = FloorPlanEngine::with_defaults();
    let mut group = c.benchmark_group("reconstruct");

    // the largest grid exceeds the default pairing cap
    for cells in [4, 16, 64, 400] {
        let input = PlanInput::new(generate_grid_plan(cells)).with_known_area(84.0);
        group.throughput(Throughput::Elements(input.primitives.lines.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(cells), &input, |b, input| {
            b.iter(|| engine.reconstruct(black_box(input)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reconstruct);
criterion_main!(benches);

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use scanpro_core::{NormalizedGrid, RasterMatrix};

// Jagged rows around `cols` samples, like a real scan at a fixed rate.
fn synth_matrix(rows: usize, cols: usize, seed: u32) -> RasterMatrix {
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        x
    };
    let m: Vec<Vec<f32>> = (0..rows)
        .map(|r| {
            let len = cols - (next() as usize % 4);
            (0..len)
                .map(|c| ((r * cols + c) as f32 / 100.0).sin() + 0.5)
                .collect()
        })
        .collect();
    RasterMatrix::from(m)
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    for (rows, cols) in [(26usize, 70usize), (130, 700)] {
        let matrix = synth_matrix(rows, cols, 0x5eed);
        group.bench_function(format!("{rows}x{cols}"), |b| {
            b.iter_batched(
                || matrix.clone(),
                |m| black_box(NormalizedGrid::normalize(&m)),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);

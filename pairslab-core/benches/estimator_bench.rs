use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pairslab_core::{Cointegration, RollingZScore};

fn price_stream(n: usize) -> Vec<(f64, f64)> {
    (0..n)
        .map(|t| {
            let x = 100.0 + (t as f64 * 0.7).sin() * 3.0 + t as f64 * 0.01;
            let y = 5.0 + 0.5 * x + (t as f64 * 1.3).cos() * 0.5;
            (x, y)
        })
        .collect()
}

fn bench_rolling_zscore(c: &mut Criterion) {
    let stream = price_stream(1_000);
    c.bench_function("rolling_zscore_1k_ticks", |b| {
        b.iter(|| {
            let mut z = RollingZScore::new(20);
            let mut last = 0.0;
            for &(x, y) in &stream {
                last = z.update(black_box(x), black_box(y));
            }
            last
        })
    });
}

fn bench_cointegration(c: &mut Criterion) {
    let stream = price_stream(1_000);
    c.bench_function("kalman_spread_1k_ticks", |b| {
        b.iter(|| {
            let mut coint = Cointegration::new(1e-4, 1e-3);
            for &(x, y) in &stream {
                coint.step(black_box(x), black_box(y));
            }
            coint.error()
        })
    });
}

criterion_group!(benches, bench_rolling_zscore, bench_cointegration);
criterion_main!(benches);

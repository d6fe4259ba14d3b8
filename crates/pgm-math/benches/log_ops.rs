//! Criterion benchmarks for `pgm-math`.
//!
//! Focus on the log-domain kernels the elimination engine calls per step.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pgm_math::{log_sum_exp, LogScale};

fn bench_log_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_domain");

    for width in [4usize, 64, 1024] {
        let values: Vec<f64> = (0..width).map(|i| -(i as f64) * 0.01).collect();
        group.bench_with_input(
            BenchmarkId::new("log_sum_exp", width),
            &values,
            |b, v| {
                b.iter(|| black_box(log_sum_exp(black_box(v))));
            },
        );

        let direct: Vec<f64> = (0..width).map(|i| 1.0 / (i as f64 + 2.0)).collect();
        group.bench_with_input(
            BenchmarkId::new("log_scale_chain", width),
            &direct,
            |b, v| {
                b.iter(|| {
                    let mut s = LogScale::one();
                    for x in v {
                        s.mul_value(*x);
                    }
                    black_box(s.ln())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_log_kernels);
criterion_main!(benches);

//! # Vectorize Benchmarks
//!
//! | Group | Measures |
//! |-------|----------|
//! | `elementwise` | ufunc call throughput per (strategy, target) |
//! | `gufunc` | batched matmul per gu strategy |
//! | `registry` | lookup + construction cost of a request |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;
use vectorize::{NdArray, Strategy, Target, VectorizeConfig};
use vectorize_tests::fixtures::{cpu_registry, matmul, random_vec, softplus};

fn bench_elementwise(c: &mut Criterion) {
    let mut group = c.benchmark_group("elementwise");
    group.measurement_time(Duration::from_secs(5));

    let registry = cpu_registry(&VectorizeConfig::default());
    for size in [1_000usize, 100_000] {
        let xs = random_vec(size);
        group.throughput(Throughput::Elements(size as u64));

        for strategy in registry.strategies() {
            for target in registry.targets(strategy) {
                if target == Target::Gpu {
                    continue;
                }
                let ufunc = match registry
                    .vectorize(softplus(), strategy, target)
                    .map(|v| v.build_ufunc())
                {
                    Ok(Ok(ufunc)) => ufunc,
                    _ => continue,
                };
                group.bench_with_input(
                    BenchmarkId::new(format!("{}/{}", strategy, target), size),
                    &xs,
                    |b, xs| b.iter(|| black_box(ufunc.call(&[xs.as_slice()]))),
                );
            }
        }
    }

    group.finish();
}

fn bench_gufunc(c: &mut Criterion) {
    let mut group = c.benchmark_group("gufunc");

    let registry = cpu_registry(&VectorizeConfig::default());
    let (func, sig) = matmul();
    for n in [4usize, 16] {
        let batch = 64;
        let inputs = [
            NdArray::new(vec![batch, n, n], random_vec(batch * n * n)),
            NdArray::new(vec![n, n], random_vec(n * n)),
        ];
        let inputs = match inputs {
            [Ok(a), Ok(b)] => [a, b],
            _ => continue,
        };
        group.throughput(Throughput::Elements((batch * n * n * n) as u64));

        for strategy in registry.gu_strategies() {
            let ufunc = match registry
                .gu_vectorize(func.clone(), sig.clone(), strategy, Target::Cpu)
                .map(|v| v.build_ufunc())
            {
                Ok(Ok(ufunc)) => ufunc,
                _ => continue,
            };
            let id = BenchmarkId::new(strategy.as_str(), n);
            group.bench_with_input(id, &inputs, |b, inputs| {
                b.iter(|| black_box(ufunc.call(inputs)))
            });
        }
    }

    group.finish();
}

fn bench_registry_request(c: &mut Criterion) {
    let registry = cpu_registry(&VectorizeConfig::default());
    c.bench_function("registry/vectorize_named", |b| {
        b.iter(|| black_box(registry.vectorize_named(softplus(), "ast", "parallel").is_ok()))
    });
    c.bench_function("registry/resolve", |b| {
        b.iter(|| black_box(registry.resolve(Strategy::Mini, Target::Parallel).is_ok()))
    });
}

criterion_group!(
    benches,
    bench_elementwise,
    bench_gufunc,
    bench_registry_request
);
criterion_main!(benches);

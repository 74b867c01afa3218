#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]
//! Benchmark for kernel x strategy x memory layout.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lanewise::fixtures::{AlignedInputs, BENCH_ITEMS};
use lanewise::prelude::*;
use trueno::Vector;

const MISALIGN: usize = 4;

fn bench_kernel<T: Element>(c: &mut Criterion, kernel: Kernel) {
    let executor = Executor::<T>::new();
    let alignment = executor.backend().register_width_bytes().max(MISALIGN);
    let mut group = c.benchmark_group(format!("{}_{kernel}", T::TYPE));

    let inputs = KernelInputs::<T>::fixture(BENCH_ITEMS);
    let mut result = inputs.output();
    for strategy in Strategy::ALL {
        group.bench_function(BenchmarkId::new(strategy.name(), "heap"), |b| {
            b.iter(|| {
                executor
                    .run(kernel, strategy, black_box(inputs.left()), black_box(inputs.right()), &mut result)
                    .unwrap();
            });
        });
    }

    for offset in [0, MISALIGN] {
        let aligned = AlignedInputs::<T>::fixture(BENCH_ITEMS, alignment, offset).unwrap();
        let mut result = aligned.output().unwrap();
        group.bench_function(BenchmarkId::new("vectorized", format!("aligned+{offset}")), |b| {
            b.iter(|| {
                executor
                    .run(
                        kernel,
                        Strategy::Vectorized,
                        black_box(aligned.left()),
                        black_box(aligned.right()),
                        &mut result,
                    )
                    .unwrap();
            });
        });
    }

    group.finish();
}

fn float_sum_benchmark(c: &mut Criterion) {
    bench_kernel::<f32>(c, Kernel::Sum);
}

fn float_compound_benchmark(c: &mut Criterion) {
    bench_kernel::<f32>(c, Kernel::Compound);
}

fn int_compound_benchmark(c: &mut Criterion) {
    bench_kernel::<i32>(c, Kernel::Compound);
}

fn trueno_reference_benchmark(c: &mut Criterion) {
    let inputs = KernelInputs::<f32>::fixture(BENCH_ITEMS);
    let left = Vector::from_slice(inputs.left());
    let right = Vector::from_slice(inputs.right());

    c.bench_function("f32_sum/trueno/vector_add", |b| {
        b.iter(|| black_box(&left).add(black_box(&right)).unwrap());
    });
}

criterion_group!(
    benches,
    float_sum_benchmark,
    float_compound_benchmark,
    int_compound_benchmark,
    trueno_reference_benchmark
);
criterion_main!(benches);

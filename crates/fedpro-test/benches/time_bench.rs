//! Benchmarks for logical time arithmetic and decoding

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fedpro_time::{
    Float64Interval, Float64Time, Integer64Interval, Integer64Time, IntervalValue, TimeFactory,
    TimeValue,
};

fn bench_integer_advance(c: &mut Criterion) {
    let step: IntervalValue = Integer64Interval::new(10).into();
    let start: TimeValue = Integer64Time::new(0).unwrap().into();

    c.bench_function("integer64_add", |b| {
        b.iter(|| black_box(start).add(black_box(&step)).unwrap())
    });
}

fn bench_float_advance(c: &mut Criterion) {
    let step: IntervalValue = Float64Interval::new(0.1).into();
    let start: TimeValue = Float64Time::new(1.0e9).into();

    c.bench_function("float64_add", |b| {
        b.iter(|| black_box(start).add(black_box(&step)).unwrap())
    });

    // Below one ULP the sum still has to move.
    let tiny: IntervalValue = Float64Interval::new(1.0e-12).into();
    c.bench_function("float64_add_sub_ulp", |b| {
        b.iter(|| black_box(start).add(black_box(&tiny)).unwrap())
    });
}

fn bench_compare(c: &mut Criterion) {
    let a: TimeValue = Float64Time::new(3.5).into();
    let b_time: TimeValue = Float64Time::new(7.25).into();

    c.bench_function("float64_compare", |b| {
        b.iter(|| black_box(&a).compare(black_box(&b_time)).unwrap())
    });
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("time_decode");

    for factory in [TimeFactory::Integer64, TimeFactory::Float64] {
        let epsilon = factory.make_epsilon();
        let time = factory.make_initial().add(&epsilon).unwrap().to_be_bytes();
        group.bench_function(factory.name(), |b| {
            b.iter(|| factory.decode_time(black_box(&time), 0).unwrap())
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_integer_advance,
    bench_float_advance,
    bench_compare,
    bench_decode,
);

criterion_main!(benches);

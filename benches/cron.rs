//! Benchmarks for cron expression parsing and evaluation.

use chrono::NaiveDate;
use chronotab::CronExpr;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("cron_parse");

    group.bench_function("simple", |b| {
        b.iter(|| CronExpr::parse(black_box("*/15 * * * *")).unwrap())
    });
    group.bench_function("complex", |b| {
        b.iter(|| CronExpr::parse(black_box("0,30 0,12 1,15 JAN,JUN MON")).unwrap())
    });
    group.bench_function("shorthand", |b| {
        b.iter(|| CronExpr::parse(black_box("@weekly")).unwrap())
    });

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let cron = CronExpr::parse("0,30 0,12 1,15 JAN,JUN MON").unwrap();
    let t = NaiveDate::from_ymd_opt(1990, 1, 15)
        .unwrap()
        .and_hms_opt(12, 30, 0)
        .unwrap();

    let mut group = c.benchmark_group("cron_evaluate");

    group.bench_function("matches", |b| {
        b.iter(|| black_box(&cron).matches(black_box(t)))
    });
    group.bench_function("after", |b| b.iter(|| black_box(&cron).after(black_box(t))));
    group.bench_function("before", |b| {
        b.iter(|| black_box(&cron).before(black_box(t)))
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_evaluate);
criterion_main!(benches);

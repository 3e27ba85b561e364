use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sensor_dataset::models::{MeasurementClass, MonthlyAggregate, Record};
use sensor_dataset::processors::{DataMerger, HourlyAggregator, IntegrityChecker, TimePartitioner};

// One reading per `step_minutes` for every location, starting 2024-01-01
fn create_test_records(locations: usize, days: usize, step_minutes: i64) -> Vec<Record> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let per_day = 24 * 60 / step_minutes;
    let mut records = Vec::with_capacity(locations * days * per_day as usize);

    for location in 0..locations {
        for i in 0..(days as i64 * per_day) {
            records.push(Record::new(
                start + Duration::minutes(i * step_minutes),
                format!("L{}", location),
                "meter",
                MeasurementClass::Additive,
                "energy",
                Some((i % 17) as f64 * 0.25),
            ));
        }
    }

    records
}

fn benchmark_hourly_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("hourly_aggregation");

    for locations in [1, 10, 50] {
        let records = create_test_records(locations, 7, 5);
        group.bench_with_input(BenchmarkId::from_parameter(locations), &records, |b, records| {
            b.iter(|| {
                let aggregator = HourlyAggregator::new();
                black_box(aggregator.aggregate(black_box(records), MeasurementClass::Additive))
            });
        });
    }

    group.finish();
}

fn benchmark_partitioning(c: &mut Criterion) {
    let records = create_test_records(10, 90, 15);

    c.bench_function("monthly_partitioning", |b| {
        b.iter(|| {
            let buckets = TimePartitioner::new().partition(black_box(records.clone())).count();
            black_box(buckets)
        });
    });
}

fn benchmark_merge(c: &mut Criterion) {
    let records = create_test_records(20, 31, 10);
    let aggregated = HourlyAggregator::new().aggregate(&records, MeasurementClass::Additive);
    let partition = MonthlyAggregate::new("additive_2024-01.hourly.csv", aggregated.rows);

    c.bench_function("merge_monthly", |b| {
        b.iter(|| {
            let merger = DataMerger::new();
            black_box(merger.merge(vec![partition.clone()]))
        });
    });

    c.bench_function("integrity_check", |b| {
        b.iter(|| {
            let checker = IntegrityChecker::new();
            black_box(checker.check(black_box(&partition.rows)))
        });
    });
}

criterion_group!(
    benches,
    benchmark_hourly_aggregation,
    benchmark_partitioning,
    benchmark_merge
);
criterion_main!(benches);

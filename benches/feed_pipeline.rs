use std::fmt::Write as _;

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use status_sync::{
    categorize, parse_feed, CaseSensitivity, CategorySpec, ChannelId, FilterMatcher, RawFilter,
    Reconciler,
};

const MONITORS: usize = 2000;

/// Metrics text with `MONITORS` status lines interleaved with other series.
fn synthetic_feed() -> String {
    let mut body = String::from("# HELP monitor_status Monitor Status (1 = UP, 0= DOWN, 2= PENDING, 3= MAINTENANCE)\n");
    for i in 0..MONITORS {
        let prefix = match i % 4 {
            0 => "api",
            1 => "db",
            2 => "cdn",
            _ => "worker",
        };
        let _ = writeln!(
            body,
            "monitor_status{{monitor_name=\"{prefix}-{i}\",monitor_type=\"http\",monitor_url=\"https://{prefix}.example/{i}\",monitor_hostname=\"null\",monitor_port=\"null\"}} {}",
            i % 4
        );
        let _ = writeln!(body, "monitor_response_time{{monitor_name=\"{prefix}-{i}\"}} 42");
    }
    body
}

fn categories(matcher: &FilterMatcher) -> Vec<CategorySpec> {
    vec![
        CategorySpec::compile("Core", &[RawFilter::regex("^API-"), RawFilter::exact("db-1")], matcher).unwrap(),
        CategorySpec::compile("Edge", &[RawFilter::regex("^cdn-\\d+$")], matcher).unwrap(),
        CategorySpec::compile("Jobs", &[RawFilter::regex("worker")], matcher).unwrap(),
        CategorySpec::compile("None", &[RawFilter::exact("missing")], matcher).unwrap(),
    ]
}

fn bench_parse(c: &mut Criterion) {
    let body = synthetic_feed();
    let mut group = c.benchmark_group("feed");
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("parse", |b| b.iter(|| parse_feed(black_box(&body))));
    group.finish();
}

fn bench_categorize(c: &mut Criterion) {
    let body = synthetic_feed();
    let records = parse_feed(&body);
    let matcher = FilterMatcher::new(CaseSensitivity::Insensitive);
    let specs = categories(&matcher);

    c.bench_function("feed/categorize", |b| {
        b.iter(|| categorize(black_box(&records), &specs, &matcher));
    });
}

fn bench_plan(c: &mut Criterion) {
    let body = synthetic_feed();
    let matcher = FilterMatcher::new(CaseSensitivity::Insensitive);
    let reconciler = Reconciler::new(
        ChannelId::new("900"),
        categories(&matcher),
        matcher,
        "https://kuma.example/metrics",
    );
    let state = reconciler.initial_state();
    let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

    c.bench_function("feed/plan", |b| {
        b.iter(|| reconciler.plan(black_box(&body), &state, &at));
    });
}

criterion_group!(feed_pipeline, bench_parse, bench_categorize, bench_plan);
criterion_main!(feed_pipeline);

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chainpulse::event::Insight;
use chainpulse::insight::NoTextGenerator;
use chainpulse::{topics, BroadcastOutbound, Broker, Dashboard, DashboardConfig, Event, RawRecord};

fn insight() -> Event {
    Event::Insight(Insight {
        insight: "steady".to_string(),
    })
}

fn bench_publish_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("fanout/publish");
    for subscribers in [1_usize, 8, 64] {
        let broker = Broker::detached();
        let hits = Arc::new(AtomicU64::new(0));
        for i in 0..subscribers {
            let hits = Arc::clone(&hits);
            broker.subscribe_fn(topics::AI_INSIGHTS, &format!("sink-{i}"), move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
            });
        }

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(subscribers), &subscribers, |b, _| {
            b.iter(|| broker.publish(black_box(&topics::AI_INSIGHTS), insight()));
        });
    }
    group.finish();
}

fn bench_outbound_mirror(c: &mut Criterion) {
    let outbound = BroadcastOutbound::new(1024);
    let mut rx = outbound.subscribe();
    let broker = Broker::new(Arc::new(outbound));

    c.bench_function("fanout/outbound_mirror", |b| {
        b.iter(|| {
            broker.publish(&topics::AI_INSIGHTS, insight());
            black_box(rx.try_recv().ok());
        });
    });
}

fn bench_ingest_cascade(c: &mut Criterion) {
    let dashboard = Dashboard::new(DashboardConfig::default(), Arc::new(NoTextGenerator));
    let mut sales = 0_u32;

    // Sales stay below the surge threshold so no remedy generation is requested.
    c.bench_function("fanout/ingest_cascade", |b| {
        b.iter(|| {
            sales = (sales + 1) % 250;
            dashboard.ingestion.ingest(RawRecord::Pos {
                timestamp: Utc::now(),
                store_id: "store_1".to_string(),
                sales,
            });
        });
    });
}

criterion_group!(benches, bench_publish_fanout, bench_outbound_mirror, bench_ingest_cascade);
criterion_main!(benches);

#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};
use motewatch_metrics::{Aggregator, MetricsSettings};

/// Recompute cost grows with the node count, since every receive walks all nodes.
fn bench_receive_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregator_recompute");

    for node_count in [16usize, 256, 4096] {
        group.bench_function(format!("nodes_{}", node_count), |b| {
            let mut agg = Aggregator::new(MetricsSettings {
                node_count,
                ..MetricsSettings::default()
            });
            let mut t = 1u64;
            b.iter(|| {
                let node = (t % node_count as u64) as i64;
                agg.on_sent(node, t).unwrap();
                t += 1;
                black_box(agg.on_received(node, t).unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_receive_recompute);
criterion_main!(benches);

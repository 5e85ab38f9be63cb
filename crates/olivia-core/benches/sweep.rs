//! Condensation and metric-sweep benchmarks over seeded random networks.

#![allow(clippy::cast_possible_truncation)]

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use olivia_core::{MetricKind, Network, PackageGraph};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sparse random digraph in the sub-critical regime: most SCCs stay small.
fn random_graph(nodes: usize, arcs_per_node: usize, seed: u64) -> PackageGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let names: Vec<String> = (0..nodes).map(|i| format!("pkg{i:05}")).collect();
    let mut edges: Vec<(&str, &str)> = Vec::with_capacity(nodes * arcs_per_node);
    for u in 0..nodes {
        for _ in 0..arcs_per_node {
            let v = rng.gen_range(0..nodes);
            edges.push((&names[u], &names[v]));
        }
    }
    PackageGraph::from_edges(edges)
}

fn bench_build(c: &mut Criterion) {
    let graph = random_graph(10_000, 3, 7);
    c.bench_function("condensation_10k", |b| {
        b.iter(|| Network::from_graph(black_box(graph.clone())).expect("build"));
    });
}

fn bench_reach_sweep(c: &mut Criterion) {
    let graph = random_graph(10_000, 3, 7);
    c.bench_function("reach_sweep_10k", |b| {
        b.iter_with_setup(
            || Network::from_graph(graph.clone()).expect("build"),
            |net| {
                let stats = net.get_metric(&MetricKind::Reach).expect("reach");
                black_box(stats.summary().mean)
            },
        );
    });
}

fn bench_coupling_profile(c: &mut Criterion) {
    let net = Network::from_graph(random_graph(2_000, 2, 11)).expect("build");
    // Warm the propagation sets once; queries are the interesting part.
    net.get_metric(&MetricKind::Reach).expect("reach");
    c.bench_function("coupling_profile_2k", |b| {
        b.iter(|| {
            let view = net.view("pkg00000").expect("view");
            black_box(view.coupling_profile().len())
        });
    });
}

criterion_group!(benches, bench_build, bench_reach_sweep, bench_coupling_profile);
criterion_main!(benches);

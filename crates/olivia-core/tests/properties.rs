//! Property-based invariants over randomized dependency networks.
//!
//! Each property is checked against a naive reachability oracle computed
//! straight off the raw adjacency, so a sweep bug cannot hide behind a
//! matching bug in the oracle.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use olivia_core::{
    Algorithm, MetricCompute, MetricKind, Network, immunization_delta,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Generators and oracles
// ---------------------------------------------------------------------------

/// Random digraphs: up to 24 nodes, arbitrary arc lists (duplicates and
/// self-loops included, which the builder must normalize away).
fn arb_edges() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..24).prop_flat_map(|n| {
        let arcs = proptest::collection::vec((0..n, 0..n), 0..n * 3);
        (Just(n), arcs)
    })
}

fn build(n: usize, arcs: &[(usize, usize)]) -> Network {
    let names: Vec<String> = (0..n).map(|i| format!("pkg{i:02}")).collect();
    let mut pairs: Vec<(&str, &str)> = Vec::with_capacity(arcs.len());
    for &(u, v) in arcs {
        pairs.push((&names[u], &names[v]));
    }
    let mut builder = olivia_core::GraphBuilder::new();
    for name in &names {
        builder.add_node(name);
    }
    for (u, v) in pairs {
        builder.add_edge(u, v);
    }
    Network::from_graph(builder.build()).expect("build")
}

/// Forward (or reverse) reachable set of one node, self included, by BFS
/// over the raw graph.
fn bfs(net: &Network, start: u32, reverse: bool) -> HashSet<u32> {
    let graph = net.graph();
    let mut seen = HashSet::from([start]);
    let mut queue = vec![start];
    while let Some(u) = queue.pop() {
        let next = if reverse {
            graph.in_neighbors(u)
        } else {
            graph.out_neighbors(u)
        };
        for &v in next {
            if seen.insert(v) {
                queue.push(v);
            }
        }
    }
    seen
}

// ---------------------------------------------------------------------------
// Reach / Surface / Impact invariants
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn reach_counts_transitive_dependants((n, arcs) in arb_edges()) {
        let net = build(n, &arcs);
        for name in net.names() {
            let view = net.view(name).expect("view");
            prop_assert_eq!(view.reach(), 1 + view.transitive_dependants().len() as u64);
            prop_assert_eq!(view.surface(), 1 + view.transitive_dependencies().len() as u64);
        }
    }

    #[test]
    fn metrics_match_bfs_oracle((n, arcs) in arb_edges()) {
        let net = build(n, &arcs);
        let graph = net.graph();
        for id in 0..n as u32 {
            let closure = bfs(&net, id, false);
            let view = net.view(graph.name_of(id)).expect("view");
            prop_assert_eq!(view.reach(), closure.len() as u64);
            prop_assert_eq!(view.surface(), bfs(&net, id, true).len() as u64);
            let arcs_inside: usize = closure
                .iter()
                .map(|&u| graph.out_degree(u))
                .sum();
            prop_assert_eq!(view.impact(), arcs_inside as u64);
        }
    }

    #[test]
    fn scc_members_share_metrics((n, arcs) in arb_edges()) {
        let net = build(n, &arcs);
        for members in net.sccs() {
            let first = net.view(members[0]).expect("view");
            let (reach, impact, surface) = (first.reach(), first.impact(), first.surface());
            for name in &members[1..] {
                let view = net.view(name).expect("view");
                prop_assert_eq!(view.reach(), reach);
                prop_assert_eq!(view.impact(), impact);
                prop_assert_eq!(view.surface(), surface);
            }
        }
    }

    #[test]
    fn coupling_sums_to_impact((n, arcs) in arb_edges()) {
        let net = build(n, &arcs);
        for name in net.names() {
            let view = net.view(name).expect("view");
            if view.scc().len() != 1 {
                // Inside a cluster the arcs into the package itself are
                // not attributed to any dependant's interface.
                continue;
            }
            let total: usize = view
                .transitive_dependants()
                .iter()
                .map(|dependant| {
                    view.transitive_coupling_to(dependant).expect("coupling")
                })
                .sum();
            prop_assert_eq!(total as u64, view.impact());
        }
    }
}

// ---------------------------------------------------------------------------
// Immunization invariants
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn immunization_delta_is_nonnegative_and_monotone(
        (n, arcs) in arb_edges(),
        picks in proptest::collection::vec(any::<prop::sample::Index>(), 1..6),
    ) {
        let net = build(n, &arcs);
        let names: Vec<&str> = net.names().collect();
        let chosen: Vec<&str> = picks.iter().map(|ix| names[ix.index(names.len())]).collect();
        let subset = &chosen[..chosen.len() / 2];

        let delta_subset =
            immunization_delta(&net, subset, &MetricKind::Reach, Algorithm::Network)
                .expect("delta");
        let delta_all =
            immunization_delta(&net, &chosen, &MetricKind::Reach, Algorithm::Network)
                .expect("delta");
        prop_assert!(delta_subset >= 0.0);
        prop_assert!(delta_all + 1e-12 >= delta_subset);
    }

    #[test]
    fn analytic_delta_matches_network(
        (n, arcs) in arb_edges(),
        picks in proptest::collection::vec(any::<prop::sample::Index>(), 1..5),
    ) {
        let net = build(n, &arcs);
        let names: Vec<&str> = net.names().collect();
        let targets: Vec<&str> = picks.iter().map(|ix| names[ix.index(names.len())]).collect();

        let by_network =
            immunization_delta(&net, &targets, &MetricKind::Reach, Algorithm::Network)
                .expect("network");
        let by_analytic =
            immunization_delta(&net, &targets, &MetricKind::Reach, Algorithm::Analytic)
                .expect("analytic");
        let scale = by_network.abs().max(1.0);
        prop_assert!((by_network - by_analytic).abs() / scale <= 1e-9);
    }
}

// ---------------------------------------------------------------------------
// Cache discipline
// ---------------------------------------------------------------------------

/// A sweep metric that counts how many times its weight runs.
struct CountingMetric {
    calls: Arc<AtomicUsize>,
}

impl MetricCompute for CountingMetric {
    fn scc_weight(&self, _net: &Network, _scc: u32) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        1.0
    }
}

#[test]
fn get_metric_computes_exactly_once() {
    let mut net =
        Network::from_edges([("a", "b"), ("b", "c"), ("c", "d")]).expect("build");
    let calls = Arc::new(AtomicUsize::new(0));
    net.register_metric(
        "scc-count",
        Arc::new(CountingMetric {
            calls: calls.clone(),
        }),
    );

    let kind = MetricKind::custom("scc-count");
    let first = net.get_metric(&kind).expect("first");
    let second = net.get_metric(&kind).expect("second");
    assert_eq!(first, second);
    // One weight call per SCC, once: the second request hit the cache.
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    // Weight 1 folded over inclusive descendants counts reachable SCCs.
    assert_eq!(first.get("a"), Some(4.0));
    assert_eq!(first.get("d"), Some(1.0));
}

#[test]
fn concurrent_get_metric_single_flight() {
    let mut net =
        Network::from_edges([("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")]).expect("build");
    let calls = Arc::new(AtomicUsize::new(0));
    net.register_metric(
        "scc-count",
        Arc::new(CountingMetric {
            calls: calls.clone(),
        }),
    );
    let net = Arc::new(net);

    let kind = MetricKind::custom("scc-count");
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let net = net.clone();
            let kind = kind.clone();
            std::thread::spawn(move || net.get_metric(&kind).expect("metric"))
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("join"))
        .collect();

    assert_eq!(calls.load(Ordering::SeqCst), 5);
    for pair in results.windows(2) {
        assert_eq!(pair[0], pair[1]);
    }
}

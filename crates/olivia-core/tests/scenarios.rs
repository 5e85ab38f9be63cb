//! End-to-end scenarios with literal expected values.

use olivia_core::{Algorithm, MetricKind, Network, failure_vulnerability, immunization_delta};

fn path_network() -> Network {
    Network::from_edges([("0", "1"), ("1", "2"), ("2", "3"), ("3", "4")]).expect("build")
}

fn star_network() -> Network {
    let edges: Vec<(String, String)> = (0..10)
        .map(|i| ("h".to_string(), format!("leaf{i:02}")))
        .collect();
    Network::from_edges(edges.iter().map(|(a, b)| (a.as_str(), b.as_str()))).expect("build")
}

// ---------------------------------------------------------------------------
// Scenario 1: path graph
// ---------------------------------------------------------------------------

#[test]
fn path_graph_reach_ranking() {
    let net = path_network();
    let reach = net.get_metric(&MetricKind::Reach).expect("reach");
    let top = reach.top(5, None);
    let expected = [("0", 5.0), ("1", 4.0), ("2", 3.0), ("3", 2.0), ("4", 1.0)];
    assert_eq!(top.len(), 5);
    for ((name, value), (want_name, want_value)) in top.iter().zip(expected) {
        assert_eq!(name, want_name);
        assert_eq!(*value, want_value);
    }
}

#[test]
fn path_graph_surface_and_impact() {
    let net = path_network();
    let surface = net.get_metric(&MetricKind::Surface).expect("surface");
    assert_eq!(surface.get("0"), Some(1.0));
    assert_eq!(surface.get("4"), Some(5.0));
    let impact = net.get_metric(&MetricKind::Impact).expect("impact");
    assert_eq!(impact.get("0"), Some(4.0));
    assert_eq!(impact.get("4"), Some(0.0));
}

#[test]
fn path_graph_has_five_singleton_sccs() {
    let net = path_network();
    let sccs: Vec<Vec<&str>> = net.sccs().collect();
    assert_eq!(sccs.len(), 5);
    assert!(sccs.iter().all(|members| members.len() == 1));
}

// ---------------------------------------------------------------------------
// Scenario 2: three-cycle plus a package the cycle propagates from
// ---------------------------------------------------------------------------

#[test]
fn cycle_cluster_metrics() {
    let net =
        Network::from_edges([("a", "b"), ("b", "c"), ("c", "a"), ("d", "a")]).expect("build");

    let clusters = net.sorted_clusters();
    let mut biggest = clusters[0].clone();
    biggest.sort_unstable();
    assert_eq!(biggest, vec!["a", "b", "c"]);

    let reach = net.get_metric(&MetricKind::Reach).expect("reach");
    let impact = net.get_metric(&MetricKind::Impact).expect("impact");
    // Every cycle member shares its cluster's values: the closure is the
    // cycle itself, with its three internal arcs.
    for name in ["a", "b", "c"] {
        assert_eq!(reach.get(name), Some(3.0));
        assert_eq!(impact.get(name), Some(3.0));
    }
    assert_eq!(reach.get("d"), Some(4.0));
    assert_eq!(impact.get("d"), Some(4.0));
}

// ---------------------------------------------------------------------------
// Scenario 3: hub with ten dependants
// ---------------------------------------------------------------------------

#[test]
fn star_reach_and_degrees() {
    let net = star_network();
    let reach = net.get_metric(&MetricKind::Reach).expect("reach");
    assert_eq!(reach.get("h"), Some(11.0));
    assert_eq!(reach.get("leaf03"), Some(1.0));

    let dependants = net.get_metric(&MetricKind::DependentsCount).expect("deg");
    assert_eq!(dependants.get("h"), Some(10.0));
    let dependencies = net
        .get_metric(&MetricKind::DependenciesCount)
        .expect("deg");
    assert_eq!(dependencies.get("h"), Some(0.0));
    assert_eq!(dependencies.get("leaf00"), Some(1.0));
}

#[test]
fn star_failure_vulnerability() {
    let net = star_network();
    let mean = failure_vulnerability(&net, &MetricKind::Reach).expect("mean");
    assert!((mean - 21.0 / 11.0).abs() < 1e-12);
}

// ---------------------------------------------------------------------------
// Scenario 4: transitive coupling
// ---------------------------------------------------------------------------

#[test]
fn coupling_interface_example() {
    // v depends on p, q, r; q depends on s; s and r depend on u.
    let net = Network::from_edges([
        ("p", "v"),
        ("q", "v"),
        ("r", "v"),
        ("s", "q"),
        ("u", "s"),
        ("u", "r"),
    ])
    .expect("build");

    let v = net.view("v").expect("v");
    let mut interface = v.coupling_interface_from("u").expect("interface");
    interface.sort_unstable();
    assert_eq!(interface, vec!["q", "r"]);

    let u = net.view("u").expect("u");
    assert_eq!(u.transitive_coupling_to("v").expect("coupling"), 2);
}

// ---------------------------------------------------------------------------
// Scenario 5: immunization shrinkage
// ---------------------------------------------------------------------------

#[test]
fn immunizing_the_hub_shrinks_the_mean() {
    let net = star_network();
    for algorithm in [Algorithm::Network, Algorithm::Analytic] {
        let delta =
            immunization_delta(&net, &["h"], &MetricKind::Reach, algorithm).expect("delta");
        assert!((delta - 10.0 / 11.0).abs() < 1e-12, "{algorithm:?}");
    }
}

// ---------------------------------------------------------------------------
// Scenario 6: arithmetic composition
// ---------------------------------------------------------------------------

#[test]
fn reach_arithmetic_composition() {
    let net = path_network();
    let reach = net.get_metric(&MetricKind::Reach).expect("reach");

    #[allow(clippy::cast_precision_loss)]
    let normalized = reach.div_scalar(net.size() as f64);
    assert_eq!(normalized.top(1, None), vec![("0".to_string(), 1.0)]);

    let squared = reach.pow_scalar(2.0);
    assert_eq!(squared.get("0"), Some(25.0));
}

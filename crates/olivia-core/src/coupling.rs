//! Transitive coupling: through which direct dependencies does one package
//! influence another?
//!
//! # Overview
//!
//! For a package `u` and a package `v` that transitively depends on it, the
//! coupling interface of `u` over `v` is the set of direct dependencies of
//! `v` that are reachable from `u` (inclusive). Each candidate is answered
//! with one membership test against the descendant sets retained by the
//! propagation sweep, so a query costs O(|direct dependencies of v|).
//!
//! Transitive coupling is the interface's cardinality; summed over all
//! transitive dependants of `u` it reproduces `Impact(u)` for packages in
//! trivial SCCs.

#![allow(clippy::cast_possible_truncation)]

use std::collections::BTreeMap;

use crate::model::Network;

/// The coupling interface of `source` over `user`, in the insertion order
/// of `user`'s dependency arcs.
///
/// Empty when `user` does not transitively depend on `source`.
pub(crate) fn interface<'a>(net: &'a Network, source: u32, user: u32) -> Vec<&'a str> {
    let cond = net.condensation();
    let prop = net.propagation();
    let source_scc = cond.scc_of(source);
    net.graph()
        .in_neighbors(user)
        .iter()
        .filter(|&&dep| prop.reaches(source_scc, cond.scc_of(dep)))
        .map(|&dep| net.graph().name_of(dep))
        .collect()
}

/// Cardinality of the coupling interface of `source` over `user`.
pub(crate) fn transitive_coupling(net: &Network, source: u32, user: u32) -> usize {
    let cond = net.condensation();
    let prop = net.propagation();
    let source_scc = cond.scc_of(source);
    net.graph()
        .in_neighbors(user)
        .iter()
        .filter(|&&dep| prop.reaches(source_scc, cond.scc_of(dep)))
        .count()
}

/// The coupling profile of `user`: every transitive dependency mapped to
/// its interface over `user`, keyed by name.
pub(crate) fn profile<'a>(net: &'a Network, user: u32) -> BTreeMap<&'a str, Vec<&'a str>> {
    let cond = net.condensation();
    let user_scc = cond.scc_of(user);
    cond.reachable_sccs(user_scc, true)
        .into_iter()
        .flat_map(|s| cond.members(s).iter().copied())
        .filter(|&source| source != user)
        .map(|source| (net.graph().name_of(source), interface(net, source, user)))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

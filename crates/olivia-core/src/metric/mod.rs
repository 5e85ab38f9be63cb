//! Whole-network metric computation over the condensation DAG.
//!
//! # Overview
//!
//! Every transitive metric is defined on SCCs and expanded to packages:
//! all members of an SCC share the value. The engine runs one
//! reverse-topological sweep that builds, for each SCC `S`, the set
//! `D(S) = ⋃_{S→T} ({T} ∪ D(T))` of its proper descendants, unioning each
//! quotient arc exactly once. Per-SCC Reach and Impact totals fall out of
//! the finished sets; Surface runs the mirror sweep over the reverse
//! quotient. The descendant sets themselves are retained (as a
//! [`Propagation`]) because the coupling engine and the analytic
//! immunization path reuse them for membership tests.
//!
//! # Custom metrics
//!
//! A [`MetricCompute`] supplies a per-SCC weight folded over inclusive
//! descendant (or ancestor) sets, which is exactly the shape of the
//! built-in transitive metrics. Registered kinds share the cache and the
//! single-flight discipline of the built-ins.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

pub mod stats;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use olivia_graph::{Condensation, SccSet};

use crate::model::Network;
use crate::progress::{self, ProgressObserver};
pub use stats::{MetricStats, Summary};

// ---------------------------------------------------------------------------
// MetricKind
// ---------------------------------------------------------------------------

/// Identifier for a metric computation.
///
/// `Custom` names a computation registered on the model via
/// `register_metric`; the other kinds are built in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Packages affected by a defect here, self included.
    Reach,
    /// Arcs inside the defect-propagation closure.
    Impact,
    /// Packages whose defect can arrive here, self included.
    Surface,
    /// Direct dependants (out-degree).
    DependentsCount,
    /// Direct dependencies (in-degree).
    DependenciesCount,
    /// A caller-registered computation.
    Custom(Arc<str>),
}

impl MetricKind {
    /// Stable tag used in the serialized model format.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Reach => "reach",
            Self::Impact => "impact",
            Self::Surface => "surface",
            Self::DependentsCount => "dependents-count",
            Self::DependenciesCount => "dependencies-count",
            Self::Custom(name) => name,
        }
    }

    /// Inverse of [`MetricKind::tag`]; unknown tags become `Custom`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "reach" => Self::Reach,
            "impact" => Self::Impact,
            "surface" => Self::Surface,
            "dependents-count" => Self::DependentsCount,
            "dependencies-count" => Self::DependenciesCount,
            other => Self::Custom(Arc::from(other)),
        }
    }

    /// A custom kind from a name.
    #[must_use]
    pub fn custom(name: &str) -> Self {
        Self::Custom(Arc::from(name))
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// MetricCompute
// ---------------------------------------------------------------------------

/// Which quotient direction a sweep metric folds over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDirection {
    /// Inclusive descendants: the defect-propagation closure.
    Descendants,
    /// Inclusive ancestors: the exposure closure.
    Ancestors,
}

/// A pluggable metric computation conforming to the engine's sweep
/// contract: a per-SCC weight, folded over inclusive descendant or
/// ancestor sets, yielding one value per package.
pub trait MetricCompute: Send + Sync {
    /// Fold direction. Defaults to descendants.
    fn direction(&self) -> SweepDirection {
        SweepDirection::Descendants
    }

    /// The weight one SCC contributes to every SCC whose closure contains
    /// it. Called once per SCC per computation.
    fn scc_weight(&self, net: &Network, scc: u32) -> f64;
}

// ---------------------------------------------------------------------------
// Propagation
// ---------------------------------------------------------------------------

/// Retained result of the descendant sweep: proper-descendant sets plus the
/// per-SCC Reach and Impact totals read off them.
#[derive(Debug)]
pub(crate) struct Propagation {
    /// Proper descendants (self excluded) per SCC, indexed by SCC id.
    pub desc: Vec<SccSet>,
    /// Reach total per SCC: `|S| + Σ |T|` over descendants.
    pub reach: Vec<u64>,
    /// Impact total per SCC: arcs sourced inside the inclusive closure.
    pub impact: Vec<u64>,
}

impl Propagation {
    /// Membership test: is `target` inside the inclusive descendant closure
    /// of `scc`?
    pub fn reaches(&self, scc: u32, target: u32) -> bool {
        scc == target || self.desc[scc as usize].contains(target)
    }
}

/// Run the descendant sweep for a condensation.
pub(crate) fn build_propagation(
    cond: &Condensation,
    observer: Option<&dyn ProgressObserver>,
) -> Propagation {
    let c = cond.scc_count();
    let mut desc: Vec<SccSet> = (0..c).map(|_| SccSet::new()).collect();
    let mut reach = vec![0u64; c];
    let mut impact = vec![0u64; c];

    // SCC ids are reverse-topological, so every successor's set is final
    // by the time we union it.
    for (done, &s) in cond.rev_topo().iter().enumerate() {
        let mut set = SccSet::new();
        for &t in cond.successors(s) {
            set.insert(t, c);
            set.union_with(&desc[t as usize], c);
        }
        let mut nodes = cond.scc_len(s) as u64;
        let mut arcs = cond.arcs_from(s);
        for t in &set {
            nodes += cond.scc_len(t) as u64;
            arcs += cond.arcs_from(t);
        }
        reach[s as usize] = nodes;
        impact[s as usize] = arcs;
        desc[s as usize] = set;
        progress::report(observer, "propagation", done + 1, c);
    }

    tracing::debug!(sccs = c, "descendant sweep complete");
    Propagation {
        desc,
        reach,
        impact,
    }
}

/// Run the ancestor sweep and return per-SCC Surface totals. The ancestor
/// sets are transient; nothing downstream needs them once the totals are
/// taken.
pub(crate) fn surface_totals(
    cond: &Condensation,
    observer: Option<&dyn ProgressObserver>,
) -> Vec<u64> {
    let c = cond.scc_count();
    let mut anc: Vec<Option<SccSet>> = (0..c).map(|_| None).collect();
    let mut surface = vec![0u64; c];

    // Forward-topological order is descending SCC id.
    for (done, &s) in cond.rev_topo().iter().rev().enumerate() {
        let mut set = SccSet::new();
        for &p in cond.predecessors(s) {
            set.insert(p, c);
            if let Some(prior) = &anc[p as usize] {
                set.union_with(prior, c);
            }
        }
        let mut nodes = cond.scc_len(s) as u64;
        for p in &set {
            nodes += cond.scc_len(p) as u64;
        }
        surface[s as usize] = nodes;
        anc[s as usize] = Some(set);
        progress::report(observer, "surface", done + 1, c);
    }

    tracing::debug!(sccs = c, "ancestor sweep complete");
    surface
}

// ---------------------------------------------------------------------------
// Computation entry points
// ---------------------------------------------------------------------------

/// Compute the stats for a built-in kind.
pub(crate) fn compute_builtin(net: &Network, kind: &MetricKind) -> Arc<MetricStats> {
    let graph = net.graph();
    let cond = net.condensation();
    let per_node: Box<dyn Fn(u32) -> f64 + '_> = match kind {
        MetricKind::Reach => {
            let prop = net.propagation();
            Box::new(move |id| prop.reach[cond.scc_of(id) as usize] as f64)
        }
        MetricKind::Impact => {
            let prop = net.propagation();
            Box::new(move |id| prop.impact[cond.scc_of(id) as usize] as f64)
        }
        MetricKind::Surface => {
            let surface = net.surface();
            Box::new(move |id| surface[cond.scc_of(id) as usize] as f64)
        }
        MetricKind::DependentsCount => Box::new(move |id| graph.out_degree(id) as f64),
        MetricKind::DependenciesCount => Box::new(move |id| graph.in_degree(id) as f64),
        MetricKind::Custom(_) => unreachable!("custom kinds go through compute_custom"),
    };
    let values = (0..graph.node_count() as u32).map(|id| (graph.name_of(id), per_node(id)));
    Arc::new(MetricStats::from_values(values))
}

/// Compute the stats for a registered custom kind by folding its per-SCC
/// weight over inclusive closures.
pub(crate) fn compute_custom(net: &Network, compute: &dyn MetricCompute) -> Arc<MetricStats> {
    let graph = net.graph();
    let cond = net.condensation();
    let c = cond.scc_count();
    let weights: Vec<f64> = (0..c as u32).map(|s| compute.scc_weight(net, s)).collect();

    let mut per_scc = vec![0.0f64; c];
    match compute.direction() {
        SweepDirection::Descendants => {
            let prop = net.propagation();
            for s in 0..c as u32 {
                let mut total = weights[s as usize];
                for t in &prop.desc[s as usize] {
                    total += weights[t as usize];
                }
                per_scc[s as usize] = total;
            }
        }
        SweepDirection::Ancestors => {
            // Transient ancestor sets, same shape as the Surface sweep.
            let mut anc: Vec<Option<SccSet>> = (0..c).map(|_| None).collect();
            for &s in cond.rev_topo().iter().rev() {
                let mut set = SccSet::new();
                for &p in cond.predecessors(s) {
                    set.insert(p, c);
                    if let Some(prior) = &anc[p as usize] {
                        set.union_with(prior, c);
                    }
                }
                let mut total = weights[s as usize];
                for p in &set {
                    total += weights[p as usize];
                }
                per_scc[s as usize] = total;
                anc[s as usize] = Some(set);
            }
        }
    }

    let values = (0..graph.node_count() as u32)
        .map(|id| (graph.name_of(id), per_scc[cond.scc_of(id) as usize]));
    Arc::new(MetricStats::from_values(values))
}

// ---------------------------------------------------------------------------
// MetricCache
// ---------------------------------------------------------------------------

/// Append-only, single-flight cache of metric results.
///
/// Each kind gets one once-cell; concurrent requests for the same kind all
/// block on the same cell, so the computation runs exactly once and every
/// caller sees the same shared result.
#[derive(Debug, Default)]
pub(crate) struct MetricCache {
    slots: Mutex<HashMap<MetricKind, Arc<OnceLock<Arc<MetricStats>>>>>,
}

impl MetricCache {
    /// Fetch or compute the entry for `kind`.
    pub fn get_or_compute(
        &self,
        kind: &MetricKind,
        compute: impl FnOnce() -> Arc<MetricStats>,
    ) -> Arc<MetricStats> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            slots.entry(kind.clone()).or_default().clone()
        };
        slot.get_or_init(compute).clone()
    }

    /// Seed an entry from a deserialized model. Pre-existing entries win.
    pub fn seed(&self, kind: MetricKind, stats: Arc<MetricStats>) {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            slots.entry(kind).or_default().clone()
        };
        let _ = slot.set(stats);
    }

    /// Snapshot of all computed entries, sorted by tag for deterministic
    /// serialization.
    pub fn entries(&self) -> Vec<(MetricKind, Arc<MetricStats>)> {
        let slots = self.slots.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut out: Vec<(MetricKind, Arc<MetricStats>)> = slots
            .iter()
            .filter_map(|(kind, slot)| slot.get().map(|stats| (kind.clone(), stats.clone())))
            .collect();
        out.sort_by(|a, b| a.0.tag().cmp(b.0.tag()));
        out
    }
}


//! The network model: graph + condensation + metric cache.
//!
//! # Overview
//!
//! [`Network`] is the owning composition root of the engine. It holds the
//! immutable package graph and its condensation, the append-only metric
//! cache, the custom-metric registry, and the lazily built propagation
//! structure shared by the metric, coupling, and immunization code.
//!
//! # Mutability
//!
//! After construction the only mutating operations are cache fills, and
//! those are single-flight: a metric kind is computed at most once per
//! model, concurrent callers included, and the resulting stats are shared
//! read-only. Per-package [`PackageView`]s borrow the model and never
//! outlive it.

#![allow(clippy::cast_possible_truncation)]

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use olivia_graph::{Condensation, PackageGraph};

use crate::error::{Error, Result};
use crate::io;
use crate::metric::{
    self, MetricCache, MetricCompute, MetricKind, MetricStats, Propagation,
};
use crate::progress::ProgressObserver;
use crate::view::PackageView;

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// An immutable package dependency network with cached derived metrics.
pub struct Network {
    graph: PackageGraph,
    cond: Condensation,
    metrics: MetricCache,
    registry: HashMap<MetricKind, Arc<dyn MetricCompute>>,
    propagation: OnceLock<Propagation>,
    surface: OnceLock<Vec<u64>>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("packages", &self.graph.node_count())
            .field("arcs", &self.graph.arc_count())
            .field("sccs", &self.cond.scc_count())
            .finish_non_exhaustive()
    }
}

impl Network {
    /// Build a model from an already-materialized graph.
    ///
    /// # Errors
    ///
    /// [`Error::Graph`] if condensation bookkeeping fails (a bug, not an
    /// input condition).
    pub fn from_graph(graph: PackageGraph) -> Result<Self> {
        let cond = Condensation::build(&graph)?;
        tracing::info!(
            packages = graph.node_count(),
            arcs = graph.arc_count(),
            sccs = cond.scc_count(),
            "network model built"
        );
        Ok(Self {
            graph,
            cond,
            metrics: MetricCache::default(),
            registry: HashMap::new(),
            propagation: OnceLock::new(),
            surface: OnceLock::new(),
            observer: None,
        })
    }

    /// Build a model from `(package, dependant)` arc pairs; normalization
    /// (dedup, self-loop removal, auto-registration) happens on the way in.
    ///
    /// # Errors
    ///
    /// As [`Network::from_graph`].
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        Self::from_graph(PackageGraph::from_edges(edges))
    }

    /// Read an adjacency-list text file (optionally `.gz`/`.bz2`
    /// compressed) and build the model.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] for unparsable lines, [`Error::Io`] for
    /// filesystem failures.
    pub fn from_adjacency_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_graph(io::adjacency::read_file(path.as_ref())?)
    }

    /// Reassemble a model from deserialized parts (loader only).
    pub(crate) fn from_prebuilt(graph: PackageGraph, cond: Condensation) -> Self {
        Self {
            graph,
            cond,
            metrics: MetricCache::default(),
            registry: HashMap::new(),
            propagation: OnceLock::new(),
            surface: OnceLock::new(),
            observer: None,
        }
    }

    // -- basic queries ------------------------------------------------------

    /// Number of packages.
    #[must_use]
    pub fn size(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether `name` is part of the model.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.graph.contains(name)
    }

    /// All package names in id order.
    pub fn names(&self) -> impl ExactSizeIterator<Item = &str> {
        self.graph.names()
    }

    /// The per-package view for `name`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the name is not in the model.
    pub fn view(&self, name: &str) -> Result<PackageView<'_>> {
        let id = self
            .graph
            .id_of(name)
            .ok_or_else(|| Error::not_found(name))?;
        Ok(PackageView::new(self, id))
    }

    /// The underlying graph.
    #[must_use]
    pub fn graph(&self) -> &PackageGraph {
        &self.graph
    }

    // -- metrics ------------------------------------------------------------

    /// The stats for `kind`, computing and caching on first request.
    ///
    /// Idempotent and single-flight: one underlying computation per kind
    /// per model, shared by all callers.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedMetric`] for a custom kind with no registered
    /// computation.
    pub fn get_metric(&self, kind: &MetricKind) -> Result<Arc<MetricStats>> {
        let custom = match kind {
            MetricKind::Custom(name) => Some(
                self.registry
                    .get(kind)
                    .cloned()
                    .ok_or_else(|| Error::unsupported(name.as_ref(), "get_metric"))?,
            ),
            _ => None,
        };
        Ok(self.metrics.get_or_compute(kind, || match &custom {
            Some(compute) => metric::compute_custom(self, compute.as_ref()),
            None => metric::compute_builtin(self, kind),
        }))
    }

    /// Register a custom metric computation under `name`.
    ///
    /// Registration must happen before the kind is first requested; the
    /// computation then participates in the normal cache discipline.
    pub fn register_metric(&mut self, name: &str, compute: Arc<dyn MetricCompute>) {
        self.registry.insert(MetricKind::custom(name), compute);
    }

    /// Install an observer for sweep progress callbacks.
    pub fn set_progress_observer(&mut self, observer: Arc<dyn ProgressObserver>) {
        self.observer = Some(observer);
    }

    // -- SCC queries --------------------------------------------------------

    /// Lazily iterate SCC member-name sets in SCC id order (sinks first).
    pub fn sccs(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        (0..self.cond.scc_count() as u32).map(move |s| {
            self.cond
                .members(s)
                .iter()
                .map(|&id| self.graph.name_of(id))
                .collect()
        })
    }

    /// All SCC member sets, largest first (ties by SCC id).
    #[must_use]
    pub fn sorted_clusters(&self) -> Vec<Vec<&str>> {
        let mut clusters: Vec<Vec<&str>> = self.sccs().collect();
        clusters.sort_by_key(|members| std::cmp::Reverse(members.len()));
        clusters
    }

    // -- persistence --------------------------------------------------------

    /// Serialize the model (graph, condensation, cached metrics) to `path`.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] on filesystem failures.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        io::model_file::save(self, path.as_ref())
    }

    /// Load a model previously written by [`Network::save`].
    ///
    /// # Errors
    ///
    /// [`Error::CorruptedModel`] if the file fails validation,
    /// [`Error::Io`] on filesystem failures.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        io::model_file::load(path.as_ref())
    }

    // -- crate-internal accessors -------------------------------------------

    pub(crate) fn condensation(&self) -> &Condensation {
        &self.cond
    }

    pub(crate) fn propagation(&self) -> &Propagation {
        self.propagation
            .get_or_init(|| metric::build_propagation(&self.cond, self.observer_ref()))
    }

    pub(crate) fn surface(&self) -> &[u64] {
        self.surface
            .get_or_init(|| metric::surface_totals(&self.cond, self.observer_ref()))
    }

    pub(crate) fn observer_ref(&self) -> Option<&dyn ProgressObserver> {
        self.observer.as_deref()
    }

    pub(crate) fn metric_cache(&self) -> &MetricCache {
        &self.metrics
    }

    pub(crate) fn registry_snapshot(&self) -> HashMap<MetricKind, Arc<dyn MetricCompute>> {
        self.registry.clone()
    }

    pub(crate) fn install_registry(&mut self, registry: HashMap<MetricKind, Arc<dyn MetricCompute>>) {
        self.registry = registry;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

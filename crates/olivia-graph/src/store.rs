//! Immutable package graph: name↔id bimap plus CSR adjacency.
//!
//! # Overview
//!
//! A [`PackageGraph`] is a directed graph whose nodes are package names and
//! whose arcs carry defect flow: an arc `u → v` means `v` directly depends
//! on `u`, so a defect in `u` propagates to `v`. Out-neighbors of a package
//! are its direct dependants; in-neighbors are its direct dependencies.
//!
//! # Design
//!
//! - **Dense ids**: every package gets a stable `u32` id in `[0, N)` at
//!   build time. All adjacency is id-based; names are resolved once at the
//!   boundary.
//! - **CSR adjacency**: neighbors are stored as one offsets array plus one
//!   flat targets array per direction, so neighbor iteration is a slice.
//! - **Built once**: construction goes through [`GraphBuilder`], which
//!   deduplicates arcs and drops self-loops. After `build()` the graph is
//!   immutable.
//!
//! Neighbor iteration order is the insertion order of arcs, deduplicated.

#![allow(
    clippy::cast_possible_truncation,
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
)]

use std::collections::HashMap;
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Csr
// ---------------------------------------------------------------------------

/// Compressed sparse row adjacency: `offsets[i]..offsets[i + 1]` indexes the
/// neighbors of node `i` inside `targets`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Csr {
    offsets: Vec<u32>,
    targets: Vec<u32>,
}

impl Csr {
    /// Build from per-node adjacency lists.
    ///
    /// # Panics
    ///
    /// Panics if the total arc count exceeds `u32::MAX`.
    #[must_use]
    pub fn from_adjacency(adjacency: &[Vec<u32>]) -> Self {
        let total: usize = adjacency.iter().map(Vec::len).sum();
        let mut offsets = Vec::with_capacity(adjacency.len() + 1);
        let mut targets = Vec::with_capacity(total);
        offsets.push(0);
        for row in adjacency {
            targets.extend_from_slice(row);
            let end = u32::try_from(targets.len()).expect("arc count exceeds u32 range");
            offsets.push(end);
        }
        Self { offsets, targets }
    }

    /// Reassemble from raw arrays (used by the model deserializer).
    ///
    /// Returns `None` if the arrays are not a well-formed CSR over
    /// `node_count` nodes: wrong offset length, non-monotone offsets, a
    /// final offset that does not match `targets.len()`, or an
    /// out-of-range target.
    #[must_use]
    pub fn from_parts(node_count: usize, offsets: Vec<u32>, targets: Vec<u32>) -> Option<Self> {
        if offsets.len() != node_count + 1 || offsets.first() != Some(&0) {
            return None;
        }
        if offsets.windows(2).any(|w| w[0] > w[1]) {
            return None;
        }
        if offsets.last().copied().map(|end| end as usize) != Some(targets.len()) {
            return None;
        }
        let bound = u32::try_from(node_count).ok()?;
        if targets.iter().any(|&t| t >= bound) {
            return None;
        }
        Some(Self { offsets, targets })
    }

    /// The neighbors of `node`, in insertion order.
    #[must_use]
    pub fn neighbors(&self, node: u32) -> &[u32] {
        let start = self.offsets[node as usize] as usize;
        let end = self.offsets[node as usize + 1] as usize;
        &self.targets[start..end]
    }

    /// Number of neighbors of `node`.
    #[must_use]
    pub fn degree(&self, node: u32) -> usize {
        self.neighbors(node).len()
    }

    /// Total number of arcs.
    #[must_use]
    pub fn arc_count(&self) -> usize {
        self.targets.len()
    }

    /// Number of nodes covered by this adjacency.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// The raw offsets array (serialization only).
    #[must_use]
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// The raw targets array (serialization only).
    #[must_use]
    pub fn targets(&self) -> &[u32] {
        &self.targets
    }

    /// The reverse adjacency: one arc `v → u` per arc `u → v` here.
    ///
    /// Arcs are emitted by scanning nodes in id order, so the reverse
    /// neighbor lists are in global arc order, deterministic for a given
    /// forward CSR.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let n = self.node_count();
        let mut rows: Vec<Vec<u32>> = vec![Vec::new(); n];
        for u in 0..n {
            let from = u32::try_from(u).expect("node count exceeds u32 range");
            for &v in self.neighbors(from) {
                rows[v as usize].push(from);
            }
        }
        Self::from_adjacency(&rows)
    }
}

// ---------------------------------------------------------------------------
// PackageGraph
// ---------------------------------------------------------------------------

/// An immutable directed dependency network over package names.
///
/// Ids are dense and stable for the lifetime of the graph. The graph stores
/// both directions of adjacency so that dependants and dependencies are
/// equally cheap to walk.
#[derive(Debug, Clone)]
pub struct PackageGraph {
    names: Vec<Box<str>>,
    index: HashMap<Box<str>, u32>,
    fwd: Csr,
    rev: Csr,
}

impl PackageGraph {
    /// Build a graph from `(package, dependant)` arc pairs.
    ///
    /// Names are auto-registered in order of first appearance. Duplicate
    /// arcs and self-loops are dropped.
    #[must_use]
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut builder = GraphBuilder::new();
        for (from, to) in edges {
            builder.add_edge(from, to);
        }
        builder.build()
    }

    /// Reassemble a graph from its serialized arrays.
    ///
    /// Returns `None` when the arrays are inconsistent (duplicate names,
    /// malformed CSR, mismatched reverse adjacency length). Content-level
    /// trust is the caller's problem; the model file guards it with a
    /// checksum.
    #[must_use]
    pub fn from_parts(names: Vec<Box<str>>, fwd: Csr, rev: Csr) -> Option<Self> {
        let n = names.len();
        if fwd.node_count() != n || rev.node_count() != n || fwd.arc_count() != rev.arc_count() {
            return None;
        }
        let mut index = HashMap::with_capacity(n);
        for (id, name) in names.iter().enumerate() {
            let id = u32::try_from(id).ok()?;
            if index.insert(name.clone(), id).is_some() {
                return None;
            }
        }
        Some(Self {
            names,
            index,
            fwd,
            rev,
        })
    }

    /// Number of packages.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    /// Number of arcs (after dedup and self-loop removal).
    #[must_use]
    pub fn arc_count(&self) -> usize {
        self.fwd.arc_count()
    }

    /// Whether a package with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The id of `name`, if registered.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.index.get(name).copied()
    }

    /// The name of a package id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range; ids come from this graph, so an
    /// out-of-range id is a caller bug.
    #[must_use]
    pub fn name_of(&self, id: u32) -> &str {
        &self.names[id as usize]
    }

    /// All package names in id order.
    pub fn names(&self) -> impl ExactSizeIterator<Item = &str> {
        self.names.iter().map(AsRef::as_ref)
    }

    /// Direct dependants of `id`: the packages its defects propagate to.
    #[must_use]
    pub fn out_neighbors(&self, id: u32) -> &[u32] {
        self.fwd.neighbors(id)
    }

    /// Direct dependencies of `id`: the packages whose defects reach it in
    /// one arc.
    #[must_use]
    pub fn in_neighbors(&self, id: u32) -> &[u32] {
        self.rev.neighbors(id)
    }

    /// Out-degree of `id`.
    #[must_use]
    pub fn out_degree(&self, id: u32) -> usize {
        self.fwd.degree(id)
    }

    /// In-degree of `id`.
    #[must_use]
    pub fn in_degree(&self, id: u32) -> usize {
        self.rev.degree(id)
    }

    /// Forward CSR (serialization only).
    #[must_use]
    pub fn forward_csr(&self) -> &Csr {
        &self.fwd
    }

    /// Reverse CSR (serialization only).
    #[must_use]
    pub fn reverse_csr(&self) -> &Csr {
        &self.rev
    }
}

// ---------------------------------------------------------------------------
// GraphBuilder
// ---------------------------------------------------------------------------

/// Accumulates nodes and arcs, then freezes them into a [`PackageGraph`].
///
/// Normalization happens here: arcs are deduplicated (first insertion wins
/// the ordering slot) and self-loops are silently dropped, so the stored
/// graph is always simple.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    names: Vec<Box<str>>,
    index: HashMap<Box<str>, u32>,
    adjacency: Vec<Vec<u32>>,
    seen_arcs: HashSet<(u32, u32)>,
}

impl GraphBuilder {
    /// New empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, returning its id. Idempotent.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` packages are registered.
    pub fn add_node(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = u32::try_from(self.names.len()).expect("package count exceeds u32 range");
        let boxed: Box<str> = name.into();
        self.names.push(boxed.clone());
        self.index.insert(boxed, id);
        self.adjacency.push(Vec::new());
        id
    }

    /// Add the arc `from → to`, registering both names as needed.
    ///
    /// Self-loops and repeated arcs are dropped.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let u = self.add_node(from);
        let v = self.add_node(to);
        if u == v {
            return;
        }
        if self.seen_arcs.insert((u, v)) {
            self.adjacency[u as usize].push(v);
        }
    }

    /// Number of packages registered so far.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    /// Freeze into an immutable graph.
    #[must_use]
    pub fn build(self) -> PackageGraph {
        let fwd = Csr::from_adjacency(&self.adjacency);
        let rev = fwd.reversed();
        tracing::debug!(
            nodes = self.names.len(),
            arcs = fwd.arc_count(),
            "package graph built"
        );
        PackageGraph {
            names: self.names,
            index: self.index,
            fwd,
            rev,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

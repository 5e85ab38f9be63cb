//! SCC condensation of a package graph.
//!
//! # Overview
//!
//! Cyclic dependency clusters are collapsed into single nodes so that every
//! downstream algorithm runs on a DAG. [`Condensation::build`] runs Tarjan's
//! algorithm with an explicit stack (dependency networks can be deeper than
//! the thread stack allows), then materializes:
//!
//! - the node → SCC map,
//! - per-SCC member lists (ascending node id, for determinism),
//! - the deduplicated quotient adjacency, forward and reverse,
//! - a reverse-topological ordering of SCCs, and
//! - per-SCC arc counts (intra-SCC arcs, and total arcs sourced in the SCC)
//!   used by the Impact sweep.
//!
//! # Ordering invariant
//!
//! Tarjan emits each SCC only after every SCC reachable from it, so SCC ids
//! in pop order are already reverse-topological: every quotient arc `S → T`
//! satisfies `T < S`. The builder checks this and fails with
//! [`GraphError::InvariantViolation`] if it ever does not hold.

#![allow(clippy::cast_possible_truncation, clippy::must_use_candidate)]

use fixedbitset::FixedBitSet;

use crate::error::GraphError;
use crate::store::{Csr, PackageGraph};

const UNVISITED: u32 = u32::MAX;

// ---------------------------------------------------------------------------
// Condensation
// ---------------------------------------------------------------------------

/// The SCC-quotient DAG of a [`PackageGraph`].
///
/// SCC ids are dense in `[0, C)` and assigned in Tarjan pop order, so
/// ascending id order is reverse-topological (sinks first).
#[derive(Debug, Clone)]
pub struct Condensation {
    scc_of: Vec<u32>,
    member_offsets: Vec<u32>,
    members: Vec<u32>,
    fwd: Csr,
    rev: Csr,
    rev_topo: Vec<u32>,
    intra_arcs: Vec<u64>,
    arcs_from: Vec<u64>,
}

impl Condensation {
    /// Build the condensation of `graph`.
    ///
    /// # Errors
    ///
    /// [`GraphError::InvariantViolation`] if internal bookkeeping breaks;
    /// this never happens for graphs produced by `GraphBuilder` and
    /// indicates a bug.
    pub fn build(graph: &PackageGraph) -> Result<Self, GraphError> {
        let scc_of = tarjan(graph)?;
        let scc_count = scc_of.iter().map(|&s| s as usize + 1).max().unwrap_or(0);
        Self::assemble(graph, scc_of, scc_count)
    }

    /// Reassemble from deserialized arrays, deriving what §6 of the model
    /// format leaves implicit (member lists, reverse quotient adjacency,
    /// per-SCC out-arc totals).
    ///
    /// # Errors
    ///
    /// [`GraphError::InvariantViolation`] when the arrays disagree with the
    /// graph. The caller maps that onto its corrupted-model error.
    pub fn from_parts(
        graph: &PackageGraph,
        scc_of: Vec<u32>,
        fwd: Csr,
        rev_topo: Vec<u32>,
        intra_arcs: Vec<u64>,
    ) -> Result<Self, GraphError> {
        let scc_count = fwd.node_count();
        if scc_of.len() != graph.node_count() {
            return Err(GraphError::invariant("SCC membership length mismatch"));
        }
        if rev_topo.len() != scc_count || intra_arcs.len() != scc_count {
            return Err(GraphError::invariant("SCC array length mismatch"));
        }
        let rebuilt = Self::assemble(graph, scc_of, scc_count)?;
        if rebuilt.fwd != fwd || rebuilt.rev_topo != rev_topo || rebuilt.intra_arcs != intra_arcs {
            return Err(GraphError::invariant(
                "serialized condensation disagrees with graph",
            ));
        }
        Ok(rebuilt)
    }

    fn assemble(
        graph: &PackageGraph,
        scc_of: Vec<u32>,
        scc_count: usize,
    ) -> Result<Self, GraphError> {
        let n = graph.node_count();

        // Member lists via counting sort; scanning nodes in id order keeps
        // each list ascending.
        let mut sizes = vec![0u32; scc_count];
        for &s in &scc_of {
            if s as usize >= scc_count {
                return Err(GraphError::invariant("SCC id out of range"));
            }
            sizes[s as usize] += 1;
        }
        let mut member_offsets = Vec::with_capacity(scc_count + 1);
        member_offsets.push(0u32);
        for &len in &sizes {
            let last = *member_offsets.last().unwrap_or(&0);
            member_offsets.push(last + len);
        }
        let mut cursor: Vec<u32> = member_offsets[..scc_count].to_vec();
        let mut members = vec![0u32; n];
        for node in 0..n as u32 {
            let s = scc_of[node as usize] as usize;
            members[cursor[s] as usize] = node;
            cursor[s] += 1;
        }

        // Quotient arcs, deduplicated with a stamp array; arc counts in the
        // same pass.
        let mut quotient: Vec<Vec<u32>> = vec![Vec::new(); scc_count];
        let mut stamp = vec![UNVISITED; scc_count];
        let mut intra_arcs = vec![0u64; scc_count];
        let mut arcs_from = vec![0u64; scc_count];
        for s in 0..scc_count as u32 {
            let start = member_offsets[s as usize] as usize;
            let end = member_offsets[s as usize + 1] as usize;
            for &node in &members[start..end] {
                for &succ in graph.out_neighbors(node) {
                    arcs_from[s as usize] += 1;
                    let t = scc_of[succ as usize];
                    if t == s {
                        intra_arcs[s as usize] += 1;
                    } else {
                        if t > s {
                            return Err(GraphError::invariant(
                                "quotient arc against reverse-topological order",
                            ));
                        }
                        if stamp[t as usize] != s {
                            stamp[t as usize] = s;
                            quotient[s as usize].push(t);
                        }
                    }
                }
            }
        }

        let fwd = Csr::from_adjacency(&quotient);
        let rev = fwd.reversed();
        let rev_topo: Vec<u32> = (0..scc_count as u32).collect();
        tracing::debug!(
            sccs = scc_count,
            quotient_arcs = fwd.arc_count(),
            "condensation built"
        );
        Ok(Self {
            scc_of,
            member_offsets,
            members,
            fwd,
            rev,
            rev_topo,
            intra_arcs,
            arcs_from,
        })
    }

    /// Number of SCCs.
    pub fn scc_count(&self) -> usize {
        self.member_offsets.len() - 1
    }

    /// The SCC id of a node.
    pub fn scc_of(&self, node: u32) -> u32 {
        self.scc_of[node as usize]
    }

    /// The full node → SCC map (serialization only).
    pub fn scc_map(&self) -> &[u32] {
        &self.scc_of
    }

    /// Members of an SCC, ascending node id.
    pub fn members(&self, scc: u32) -> &[u32] {
        let start = self.member_offsets[scc as usize] as usize;
        let end = self.member_offsets[scc as usize + 1] as usize;
        &self.members[start..end]
    }

    /// Number of packages in an SCC.
    pub fn scc_len(&self, scc: u32) -> usize {
        self.members(scc).len()
    }

    /// Quotient successors of an SCC (unique, first-encounter order).
    pub fn successors(&self, scc: u32) -> &[u32] {
        self.fwd.neighbors(scc)
    }

    /// Quotient predecessors of an SCC.
    pub fn predecessors(&self, scc: u32) -> &[u32] {
        self.rev.neighbors(scc)
    }

    /// SCC ids in reverse-topological order (sinks first).
    pub fn rev_topo(&self) -> &[u32] {
        &self.rev_topo
    }

    /// Arcs between members of this SCC.
    pub fn intra_arcs(&self, scc: u32) -> u64 {
        self.intra_arcs[scc as usize]
    }

    /// The intra-arc table (serialization only).
    pub fn intra_arcs_table(&self) -> &[u64] {
        &self.intra_arcs
    }

    /// Total arcs whose source lies in this SCC (intra plus outgoing).
    pub fn arcs_from(&self, scc: u32) -> u64 {
        self.arcs_from[scc as usize]
    }

    /// Quotient forward CSR (serialization only).
    pub fn forward_csr(&self) -> &Csr {
        &self.fwd
    }

    /// All nodes forward-reachable from `scc` at the quotient level,
    /// inclusive, as SCC ids. Plain BFS; used by the per-package views.
    pub fn reachable_sccs(&self, scc: u32, reverse: bool) -> Vec<u32> {
        let mut seen = FixedBitSet::with_capacity(self.scc_count());
        let mut queue = vec![scc];
        seen.insert(scc as usize);
        let mut head = 0;
        while head < queue.len() {
            let s = queue[head];
            head += 1;
            let next = if reverse {
                self.predecessors(s)
            } else {
                self.successors(s)
            };
            for &t in next {
                if !seen.contains(t as usize) {
                    seen.insert(t as usize);
                    queue.push(t);
                }
            }
        }
        queue
    }
}

// ---------------------------------------------------------------------------
// Iterative Tarjan
// ---------------------------------------------------------------------------

struct Frame {
    node: u32,
    next_edge: usize,
}

/// Tarjan's SCC algorithm with an explicit DFS stack.
///
/// Returns the node → SCC map with SCC ids in pop order.
fn tarjan(graph: &PackageGraph) -> Result<Vec<u32>, GraphError> {
    let n = graph.node_count();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0u32; n];
    let mut on_stack = FixedBitSet::with_capacity(n);
    let mut scc_of = vec![UNVISITED; n];
    let mut stack: Vec<u32> = Vec::new();
    let mut frames: Vec<Frame> = Vec::new();
    let mut next_index = 0u32;
    let mut next_scc = 0u32;

    let discover = |node: u32,
                        index: &mut Vec<u32>,
                        lowlink: &mut Vec<u32>,
                        stack: &mut Vec<u32>,
                        on_stack: &mut FixedBitSet,
                        frames: &mut Vec<Frame>,
                        next_index: &mut u32| {
        index[node as usize] = *next_index;
        lowlink[node as usize] = *next_index;
        *next_index += 1;
        stack.push(node);
        on_stack.insert(node as usize);
        frames.push(Frame { node, next_edge: 0 });
    };

    for root in 0..n as u32 {
        if index[root as usize] != UNVISITED {
            continue;
        }
        discover(
            root,
            &mut index,
            &mut lowlink,
            &mut stack,
            &mut on_stack,
            &mut frames,
            &mut next_index,
        );

        while let Some(frame) = frames.last_mut() {
            let v = frame.node;
            let out = graph.out_neighbors(v);
            if let Some(&w) = out.get(frame.next_edge) {
                frame.next_edge += 1;
                if index[w as usize] == UNVISITED {
                    discover(
                        w,
                        &mut index,
                        &mut lowlink,
                        &mut stack,
                        &mut on_stack,
                        &mut frames,
                        &mut next_index,
                    );
                } else if on_stack.contains(w as usize) {
                    lowlink[v as usize] = lowlink[v as usize].min(index[w as usize]);
                }
                continue;
            }

            // All edges of `v` explored: retire the frame.
            frames.pop();
            if let Some(parent) = frames.last() {
                let p = parent.node as usize;
                lowlink[p] = lowlink[p].min(lowlink[v as usize]);
            }
            if lowlink[v as usize] == index[v as usize] {
                loop {
                    let Some(w) = stack.pop() else {
                        return Err(GraphError::invariant("Tarjan stack underflow"));
                    };
                    on_stack.set(w as usize, false);
                    scc_of[w as usize] = next_scc;
                    if w == v {
                        break;
                    }
                }
                next_scc += 1;
            }
        }
    }

    if scc_of.iter().any(|&s| s == UNVISITED) {
        return Err(GraphError::invariant("node left without an SCC"));
    }
    Ok(scc_of)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

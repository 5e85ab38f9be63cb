//! Per-package read view over a network model.
//!
//! A [`PackageView`] is a borrowed handle: the model id plus a back
//! reference. Every operation is an O(1) lookup followed by O(result)
//! materialization; transitive sets walk the condensation, not the raw
//! graph, so cycle members are visited once.

#![allow(clippy::must_use_candidate)]

use std::collections::BTreeMap;

use crate::coupling;
use crate::error::Result;
use crate::model::Network;

/// A read-only view of one package.
///
/// Obtained from `Network::view`; borrows the model and never outlives it.
#[derive(Clone, Copy, Debug)]
pub struct PackageView<'a> {
    net: &'a Network,
    id: u32,
}

impl<'a> PackageView<'a> {
    pub(crate) fn new(net: &'a Network, id: u32) -> Self {
        Self { net, id }
    }

    /// The package name.
    pub fn name(&self) -> &'a str {
        self.net.graph().name_of(self.id)
    }

    /// Packages this one directly depends on (in-neighbors: their defects
    /// arrive here in one arc).
    pub fn direct_dependencies(&self) -> Vec<&'a str> {
        self.resolve(self.net.graph().in_neighbors(self.id))
    }

    /// Packages that directly depend on this one (out-neighbors).
    pub fn direct_dependants(&self) -> Vec<&'a str> {
        self.resolve(self.net.graph().out_neighbors(self.id))
    }

    /// Every package that transitively depends on this one, ascending id
    /// order, self excluded.
    pub fn transitive_dependants(&self) -> Vec<&'a str> {
        self.closure(false)
    }

    /// Every package this one transitively depends on, ascending id order,
    /// self excluded.
    pub fn transitive_dependencies(&self) -> Vec<&'a str> {
        self.closure(true)
    }

    /// Packages affected by a defect here, self included.
    pub fn reach(&self) -> u64 {
        let scc = self.net.condensation().scc_of(self.id);
        self.net.propagation().reach[scc as usize]
    }

    /// Arcs inside this package's defect-propagation closure.
    pub fn impact(&self) -> u64 {
        let scc = self.net.condensation().scc_of(self.id);
        self.net.propagation().impact[scc as usize]
    }

    /// Packages whose defect can arrive here, self included.
    pub fn surface(&self) -> u64 {
        let scc = self.net.condensation().scc_of(self.id);
        self.net.surface()[scc as usize]
    }

    /// Members of this package's SCC (including the package itself),
    /// ascending id order.
    pub fn scc(&self) -> Vec<&'a str> {
        let cond = self.net.condensation();
        self.resolve(cond.members(cond.scc_of(self.id)))
    }

    /// The coupling interface of this package over `target`: the direct
    /// dependencies of `target` through which defects from here arrive.
    ///
    /// Empty when `target` is not a transitive dependant of this package.
    ///
    /// # Errors
    ///
    /// `NotFound` if `target` is not in the model.
    pub fn coupling_interface_to(&self, target: &str) -> Result<Vec<&'a str>> {
        let target = self.net.view(target)?;
        Ok(coupling::interface(self.net, self.id, target.id))
    }

    /// The coupling interface of `source` over this package.
    ///
    /// # Errors
    ///
    /// `NotFound` if `source` is not in the model.
    pub fn coupling_interface_from(&self, source: &str) -> Result<Vec<&'a str>> {
        let source = self.net.view(source)?;
        Ok(coupling::interface(self.net, source.id, self.id))
    }

    /// The transitive coupling of this package over `target`: the size of
    /// the coupling interface.
    ///
    /// # Errors
    ///
    /// `NotFound` if `target` is not in the model.
    pub fn transitive_coupling_to(&self, target: &str) -> Result<usize> {
        let target = self.net.view(target)?;
        Ok(coupling::transitive_coupling(self.net, self.id, target.id))
    }

    /// The full coupling profile of this package: every transitive
    /// dependency mapped to its coupling interface over this package.
    pub fn coupling_profile(&self) -> BTreeMap<&'a str, Vec<&'a str>> {
        coupling::profile(self.net, self.id)
    }

    // -- internals ----------------------------------------------------------

    fn resolve(&self, ids: &[u32]) -> Vec<&'a str> {
        ids.iter().map(|&v| self.net.graph().name_of(v)).collect()
    }

    fn closure(&self, reverse: bool) -> Vec<&'a str> {
        let cond = self.net.condensation();
        let start = cond.scc_of(self.id);
        let mut ids: Vec<u32> = cond
            .reachable_sccs(start, reverse)
            .into_iter()
            .flat_map(|s| cond.members(s).iter().copied())
            .filter(|&v| v != self.id)
            .collect();
        ids.sort_unstable();
        ids.into_iter()
            .map(|v| self.net.graph().name_of(v))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

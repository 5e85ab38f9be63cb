#![forbid(unsafe_code)]
//! Dependency graph store and condensation builder for olivia.
//!
//! This crate holds the data-structure layer of the engine:
//!
//! - [`store::PackageGraph`]: an immutable directed graph over package
//!   names, with dense `u32` ids and CSR adjacency in both directions.
//! - [`condense::Condensation`]: the SCC-quotient DAG of a package graph,
//!   produced by an iterative Tarjan pass, with a reverse-topological
//!   ordering and per-SCC arc counts.
//! - [`sccset::SccSet`]: an adaptive sparse/dense set over SCC ids, the
//!   working representation for descendant-set sweeps.
//!
//! Everything here is built once and never mutated. File formats and
//! metric computation live in `olivia-core`.

pub mod condense;
pub mod error;
pub mod sccset;
pub mod store;

pub use condense::Condensation;
pub use error::GraphError;
pub use sccset::SccSet;
pub use store::{GraphBuilder, PackageGraph};

#![forbid(unsafe_code)]
//! olivia-core: vulnerability analysis for package dependency networks.
//!
//! # Overview
//!
//! A dependency network is a directed graph whose arcs carry defect flow:
//! `u → v` means `v` directly depends on `u`. [`Network`] composes the
//! immutable graph and its SCC condensation (from `olivia-graph`) with a
//! lazily filled metric cache, and answers three families of questions:
//!
//! - **Neighborhoods**: what does a package depend on, or get depended on
//!   by, directly or transitively ([`PackageView`]).
//! - **Propagation cost**: Reach, Impact, Surface, and degree counts per
//!   package ([`MetricKind`], [`MetricStats`]), plus transitive-coupling
//!   interfaces.
//! - **Immunization**: how much does the expected failure cost drop when a
//!   set of packages stops propagating defects
//!   ([`immunization_delta`]).
//!
//! # Example
//!
//! ```
//! use olivia_core::{Algorithm, MetricKind, Network, immunization_delta};
//!
//! # fn main() -> olivia_core::Result<()> {
//! let net = Network::from_edges([("libc", "openssl"), ("openssl", "reqwest")])?;
//! let reach = net.get_metric(&MetricKind::Reach)?;
//! assert_eq!(reach.get("libc"), Some(3.0));
//!
//! let delta = immunization_delta(&net, &["libc"], &MetricKind::Reach, Algorithm::Analytic)?;
//! assert!(delta > 0.0);
//! # Ok(())
//! # }
//! ```
//!
//! Once built, a model is immutable; only derived metric results are added
//! to its cache, each computed exactly once. Models round-trip through
//! [`Network::save`] and [`Network::load`].

mod coupling;
pub mod error;
pub mod io;
pub mod metric;
pub mod model;
pub mod progress;
pub mod view;
pub mod vuln;

pub use error::{Error, Result};
pub use metric::{MetricCompute, MetricKind, MetricStats, Summary, SweepDirection};
pub use model::Network;
pub use olivia_graph::{Condensation, GraphBuilder, GraphError, PackageGraph};
pub use progress::{PROGRESS_INTERVAL, ProgressObserver};
pub use view::PackageView;
pub use vuln::{Algorithm, failure_vulnerability, immunization_delta};

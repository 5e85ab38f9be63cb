//! Per-package metric results.
//!
//! # Overview
//!
//! A [`MetricStats`] maps every package name of a network to one numeric
//! value. It supports element-wise arithmetic between results over the same
//! universe, scalar broadcasting, ranking, and a lazily computed summary.
//!
//! Values live in a `BTreeMap` so every fold (sum, mean, comparisons) runs
//! in ascending-name order: results are bit-identical across runs for the
//! same inputs.

#![allow(clippy::must_use_candidate, clippy::cast_precision_loss)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Aggregate view of a metric result, computed once on first request.
///
/// For an empty universe every field is `0.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sum over all packages, folded in ascending-name order.
    pub sum: f64,
}

// ---------------------------------------------------------------------------
// MetricStats
// ---------------------------------------------------------------------------

/// A package-name → value mapping produced by the metric engine, or built
/// by a caller from any name → number mapping (e.g. an external centrality
/// measure to feed into ranking or arithmetic).
#[derive(Debug, Clone, Default)]
pub struct MetricStats {
    values: BTreeMap<Box<str>, f64>,
    summary: OnceLock<Summary>,
}

impl PartialEq for MetricStats {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl MetricStats {
    /// Build from an arbitrary mapping. Duplicate names keep the last value.
    pub fn from_values<N: Into<Box<str>>>(values: impl IntoIterator<Item = (N, f64)>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
            summary: OnceLock::new(),
        }
    }

    /// Number of packages covered.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the universe is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// All values in ascending-name order.
    pub fn values(&self) -> &BTreeMap<Box<str>, f64> {
        &self.values
    }

    /// Min/max/mean/sum, computed once and cached.
    pub fn summary(&self) -> Summary {
        *self.summary.get_or_init(|| {
            if self.values.is_empty() {
                return Summary {
                    min: 0.0,
                    max: 0.0,
                    mean: 0.0,
                    sum: 0.0,
                };
            }
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            let mut sum = 0.0;
            for &v in self.values.values() {
                min = min.min(v);
                max = max.max(v);
                sum += v;
            }
            Summary {
                min,
                max,
                mean: sum / self.values.len() as f64,
                sum,
            }
        })
    }

    // -- element-wise arithmetic --------------------------------------------

    /// Element-wise sum.
    ///
    /// # Errors
    ///
    /// [`Error::DomainMismatch`] unless both results cover exactly the same
    /// package names.
    pub fn add(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, |a, b| a + b)
    }

    /// Element-wise difference.
    ///
    /// # Errors
    ///
    /// [`Error::DomainMismatch`] on differing universes.
    pub fn sub(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, |a, b| a - b)
    }

    /// Element-wise product.
    ///
    /// # Errors
    ///
    /// [`Error::DomainMismatch`] on differing universes.
    pub fn mul(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, |a, b| a * b)
    }

    /// Element-wise quotient. Division follows IEEE 754: dividing by zero
    /// yields an infinity or NaN rather than an error.
    ///
    /// # Errors
    ///
    /// [`Error::DomainMismatch`] on differing universes.
    pub fn div(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, |a, b| a / b)
    }

    /// Element-wise exponentiation (`self[p] ^ rhs[p]`).
    ///
    /// # Errors
    ///
    /// [`Error::DomainMismatch`] on differing universes.
    pub fn pow(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, f64::powf)
    }

    // -- scalar broadcasting ------------------------------------------------

    /// Add `scalar` to every value.
    pub fn add_scalar(&self, scalar: f64) -> Self {
        self.map(|v| v + scalar)
    }

    /// Subtract `scalar` from every value.
    pub fn sub_scalar(&self, scalar: f64) -> Self {
        self.map(|v| v - scalar)
    }

    /// Multiply every value by `scalar`.
    pub fn mul_scalar(&self, scalar: f64) -> Self {
        self.map(|v| v * scalar)
    }

    /// Divide every value by `scalar` (IEEE semantics for zero).
    pub fn div_scalar(&self, scalar: f64) -> Self {
        self.map(|v| v / scalar)
    }

    /// Raise every value to `scalar`.
    pub fn pow_scalar(&self, scalar: f64) -> Self {
        self.map(|v| v.powf(scalar))
    }

    // -- ranking ------------------------------------------------------------

    /// The `k` packages with the largest values, ties broken by ascending
    /// name. With `subset`, ranking is restricted to those names; subset
    /// entries outside the universe are ignored.
    pub fn top(&self, k: usize, subset: Option<&[&str]>) -> Vec<(String, f64)> {
        self.ranked(k, subset, |a, b| {
            b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
        })
    }

    /// The `k` packages with the smallest values; same tie-break and subset
    /// rules as [`MetricStats::top`].
    pub fn bottom(&self, k: usize, subset: Option<&[&str]>) -> Vec<(String, f64)> {
        self.ranked(k, subset, |a, b| {
            a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0))
        })
    }

    // -- internals ----------------------------------------------------------

    fn zip_with(&self, rhs: &Self, op: impl Fn(f64, f64) -> f64) -> Result<Self> {
        self.check_universe(rhs)?;
        let values = self
            .values
            .iter()
            .map(|(name, &a)| (name.clone(), op(a, rhs.values[name])))
            .collect();
        Ok(Self {
            values,
            summary: OnceLock::new(),
        })
    }

    fn map(&self, op: impl Fn(f64) -> f64) -> Self {
        Self {
            values: self
                .values
                .iter()
                .map(|(name, &v)| (name.clone(), op(v)))
                .collect(),
            summary: OnceLock::new(),
        }
    }

    fn check_universe(&self, rhs: &Self) -> Result<()> {
        if self.values.len() == rhs.values.len()
            && self.values.keys().eq(rhs.values.keys())
        {
            return Ok(());
        }
        let mine: BTreeSet<&str> = self.values.keys().map(AsRef::as_ref).collect();
        let theirs: BTreeSet<&str> = rhs.values.keys().map(AsRef::as_ref).collect();
        let only_left = mine.difference(&theirs).next();
        let only_right = theirs.difference(&mine).next();
        Err(Error::DomainMismatch {
            detail: match (only_left, only_right) {
                (Some(l), _) => format!("'{l}' present only on the left"),
                (_, Some(r)) => format!("'{r}' present only on the right"),
                _ => "universes differ".to_string(),
            },
        })
    }

    fn ranked(
        &self,
        k: usize,
        subset: Option<&[&str]>,
        cmp: impl Fn(&(&str, f64), &(&str, f64)) -> std::cmp::Ordering,
    ) -> Vec<(String, f64)> {
        let mut entries: Vec<(&str, f64)> = match subset {
            Some(names) => {
                let wanted: BTreeSet<&str> = names.iter().copied().collect();
                wanted
                    .into_iter()
                    .filter_map(|name| self.get(name).map(|v| (name, v)))
                    .collect()
            }
            None => self.values.iter().map(|(n, &v)| (n.as_ref(), v)).collect(),
        };
        entries.sort_by(|a, b| cmp(a, b));
        entries.truncate(k);
        entries
            .into_iter()
            .map(|(n, v)| (n.to_string(), v))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(pairs: &[(&str, f64)]) -> MetricStats {
        MetricStats::from_values(pairs.iter().map(|&(n, v)| (n, v)))
    }

    #[test]
    fn summary_is_lazy_and_stable() {
        let s = stats(&[("a", 2.0), ("b", 4.0), ("c", 6.0)]);
        let first = s.summary();
        assert_eq!(first.min, 2.0);
        assert_eq!(first.max, 6.0);
        assert_eq!(first.mean, 4.0);
        assert_eq!(first.sum, 12.0);
        assert_eq!(s.summary(), first);
    }

    #[test]
    fn empty_summary_is_zeroed() {
        let s = MetricStats::default();
        let sum = s.summary();
        assert_eq!(sum.min, 0.0);
        assert_eq!(sum.mean, 0.0);
    }

    #[test]
    fn elementwise_ops() {
        let a = stats(&[("x", 1.0), ("y", 2.0)]);
        let b = stats(&[("x", 10.0), ("y", 20.0)]);
        assert_eq!(a.add(&b).expect("add").get("y"), Some(22.0));
        assert_eq!(b.sub(&a).expect("sub").get("x"), Some(9.0));
        assert_eq!(a.mul(&b).expect("mul").get("y"), Some(40.0));
        assert_eq!(b.div(&a).expect("div").get("y"), Some(10.0));
        assert_eq!(a.pow(&b).expect("pow").get("x"), Some(1.0));
    }

    #[test]
    fn addition_commutes_and_associates() {
        let a = stats(&[("x", 1.5), ("y", 2.0)]);
        let b = stats(&[("x", 3.0), ("y", 4.5)]);
        let c = stats(&[("x", 0.25), ("y", 8.0)]);
        assert_eq!(a.add(&b).expect("ab"), b.add(&a).expect("ba"));
        let left = a.add(&b).expect("ab").add(&c).expect("abc");
        let right = a.add(&b.add(&c).expect("bc")).expect("abc");
        assert_eq!(left, right);
        assert_eq!(a.mul(&b).expect("ab"), b.mul(&a).expect("ba"));
    }

    #[test]
    fn scalar_identities() {
        let a = stats(&[("x", 1.5), ("y", -2.0)]);
        assert_eq!(a.add_scalar(0.0), a);
        assert_eq!(a.mul_scalar(1.0), a);
        assert_eq!(a.pow_scalar(1.0), a);
        assert_eq!(a.sub_scalar(1.0).get("x"), Some(0.5));
        assert_eq!(a.div_scalar(2.0).get("y"), Some(-1.0));
    }

    #[test]
    fn domain_mismatch_rejected() {
        let a = stats(&[("x", 1.0)]);
        let b = stats(&[("x", 1.0), ("y", 2.0)]);
        let err = a.add(&b).expect_err("mismatch");
        assert!(matches!(err, Error::DomainMismatch { .. }));
        let c = stats(&[("z", 1.0)]);
        let err = a.add(&c).expect_err("mismatch");
        assert!(matches!(err, Error::DomainMismatch { .. }));
    }

    #[test]
    fn top_breaks_ties_by_name() {
        let s = stats(&[("pear", 3.0), ("apple", 3.0), ("fig", 9.0), ("lime", 1.0)]);
        let top = s.top(3, None);
        assert_eq!(
            top,
            vec![
                ("fig".to_string(), 9.0),
                ("apple".to_string(), 3.0),
                ("pear".to_string(), 3.0),
            ]
        );
    }

    #[test]
    fn bottom_and_oversized_k() {
        let s = stats(&[("a", 5.0), ("b", 1.0)]);
        assert_eq!(
            s.bottom(10, None),
            vec![("b".to_string(), 1.0), ("a".to_string(), 5.0)]
        );
    }

    #[test]
    fn subset_ranking_ignores_unknowns() {
        let s = stats(&[("a", 5.0), ("b", 1.0), ("c", 3.0)]);
        let top = s.top(2, Some(&["b", "c", "ghost"]));
        assert_eq!(
            top,
            vec![("c".to_string(), 3.0), ("b".to_string(), 1.0)]
        );
    }
}

//! Adaptive set of SCC ids for descendant-set sweeps.
//!
//! # Overview
//!
//! The metric sweeps keep one descendant set per SCC. On sub-critical
//! networks most of those sets are tiny; on super-critical ones a few are
//! enormous. A fixed representation wastes memory either way, so
//! [`SccSet`] starts as a sorted sparse vector and promotes itself to a
//! dense bitset once the sparse form would cost more than `C` bits.
//!
//! The promotion threshold compares the sparse footprint (32 bits per
//! element) against the dense footprint (1 bit per possible element), so a
//! set promotes at roughly `len ≥ universe / 32`.

#![allow(clippy::cast_possible_truncation, clippy::must_use_candidate)]

use fixedbitset::FixedBitSet;

// ---------------------------------------------------------------------------
// SccSet
// ---------------------------------------------------------------------------

/// A set of SCC ids drawn from a universe `[0, universe)`, stored sparse or
/// dense depending on density.
#[derive(Debug, Clone)]
pub enum SccSet {
    /// Sorted, deduplicated element vector.
    Sparse(Vec<u32>),
    /// One bit per possible element.
    Dense(FixedBitSet),
}

impl SccSet {
    /// New empty set.
    pub const fn new() -> Self {
        Self::Sparse(Vec::new())
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Sparse(v) => v.len(),
            Self::Dense(bits) => bits.count_ones(..),
        }
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Sparse(v) => v.is_empty(),
            Self::Dense(bits) => bits.count_ones(..) == 0,
        }
    }

    /// Membership test.
    pub fn contains(&self, id: u32) -> bool {
        match self {
            Self::Sparse(v) => v.binary_search(&id).is_ok(),
            Self::Dense(bits) => bits.contains(id as usize),
        }
    }

    /// Insert `id`, promoting to dense if the sparse form outgrows the
    /// threshold for `universe`.
    pub fn insert(&mut self, id: u32, universe: usize) {
        match self {
            Self::Sparse(v) => {
                if let Err(pos) = v.binary_search(&id) {
                    v.insert(pos, id);
                    if Self::wants_dense(v.len(), universe) {
                        self.promote(universe);
                    }
                }
            }
            Self::Dense(bits) => bits.insert(id as usize),
        }
    }

    /// Union `other` into `self`.
    ///
    /// Each quotient arc triggers exactly one union during a sweep, so this
    /// is the hot path; the dense/dense case is a word-wise OR.
    pub fn union_with(&mut self, other: &Self, universe: usize) {
        match other {
            Self::Sparse(elems) => {
                if let Self::Sparse(mine) = self {
                    if Self::wants_dense(mine.len() + elems.len(), universe) {
                        self.promote(universe);
                    } else {
                        *mine = merge_sorted(mine, elems);
                        return;
                    }
                }
                let Self::Dense(bits) = self else {
                    unreachable!("promoted above")
                };
                for &id in elems {
                    bits.insert(id as usize);
                }
            }
            Self::Dense(theirs) => {
                self.promote(universe);
                let Self::Dense(bits) = self else {
                    unreachable!("promoted above")
                };
                bits.union_with(theirs);
            }
        }
    }

    /// Iterate elements in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        match self {
            Self::Sparse(v) => Iter::Sparse(v.iter()),
            Self::Dense(bits) => Iter::Dense(bits.ones()),
        }
    }

    /// Force the dense representation.
    pub fn promote(&mut self, universe: usize) {
        if let Self::Sparse(v) = self {
            let mut bits = FixedBitSet::with_capacity(universe);
            for &id in v.iter() {
                bits.insert(id as usize);
            }
            *self = Self::Dense(bits);
        }
    }

    fn wants_dense(sparse_len: usize, universe: usize) -> bool {
        sparse_len * 32 >= universe
    }
}

impl Default for SccSet {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_sorted(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

// ---------------------------------------------------------------------------
// Iter
// ---------------------------------------------------------------------------

/// Iterator over a set's elements, ascending.
pub enum Iter<'a> {
    Sparse(std::slice::Iter<'a, u32>),
    Dense(fixedbitset::Ones<'a>),
}

impl Iterator for Iter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        match self {
            Self::Sparse(it) => it.next().copied(),
            Self::Dense(it) => it.next().map(|i| i as u32),
        }
    }
}

impl<'a> IntoIterator for &'a SccSet {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn elems(set: &SccSet) -> Vec<u32> {
        set.iter().collect()
    }

    #[test]
    fn insert_keeps_sorted_dedup() {
        let mut s = SccSet::new();
        for id in [5, 1, 5, 3, 1] {
            s.insert(id, 1_000_000);
        }
        assert_eq!(elems(&s), vec![1, 3, 5]);
        assert_eq!(s.len(), 3);
        assert!(s.contains(3));
        assert!(!s.contains(2));
    }

    #[test]
    fn promotes_when_dense_is_cheaper() {
        let mut s = SccSet::new();
        // universe 64: threshold is 2 elements (2 * 32 >= 64).
        s.insert(0, 64);
        assert!(matches!(s, SccSet::Sparse(_)));
        s.insert(7, 64);
        assert!(matches!(s, SccSet::Dense(_)));
        assert_eq!(elems(&s), vec![0, 7]);
    }

    #[test]
    fn sparse_sparse_union() {
        let mut a = SccSet::new();
        let mut b = SccSet::new();
        for id in [1, 4, 9] {
            a.insert(id, 1_000_000);
        }
        for id in [2, 4, 10] {
            b.insert(id, 1_000_000);
        }
        a.union_with(&b, 1_000_000);
        assert_eq!(elems(&a), vec![1, 2, 4, 9, 10]);
    }

    #[test]
    fn union_promotes_across_threshold() {
        let mut a = SccSet::new();
        let mut b = SccSet::new();
        a.insert(0, 256);
        for id in [10, 20, 30, 40, 50, 60, 70] {
            b.insert(id, 1 << 20);
        }
        a.union_with(&b, 256);
        assert!(matches!(a, SccSet::Dense(_)));
        assert_eq!(elems(&a), vec![0, 10, 20, 30, 40, 50, 60, 70]);
    }

    #[test]
    fn dense_union_into_sparse() {
        let mut dense = SccSet::new();
        for id in 0..32 {
            dense.insert(id, 128);
        }
        assert!(matches!(dense, SccSet::Dense(_)));
        let mut s = SccSet::new();
        s.insert(100, 128);
        s.union_with(&dense, 128);
        assert_eq!(s.len(), 33);
        assert!(s.contains(100));
        assert!(s.contains(31));
    }

    #[test]
    fn empty_set() {
        let s = SccSet::new();
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
        assert_eq!(elems(&s), Vec::<u32>::new());
    }

    proptest::proptest! {
        /// Whatever mix of representations the operations pass through, the
        /// result must match a reference `BTreeSet`.
        #[test]
        fn behaves_like_btreeset(
            universe in 1usize..200,
            inserts in proptest::collection::vec(0u32..200, 0..64),
            unioned in proptest::collection::vec(0u32..200, 0..64),
        ) {
            use std::collections::BTreeSet;

            let clip = |ids: &[u32]| -> Vec<u32> {
                ids.iter().copied().filter(|&i| (i as usize) < universe).collect()
            };
            let mut set = SccSet::new();
            let mut reference = BTreeSet::new();
            for id in clip(&inserts) {
                set.insert(id, universe);
                reference.insert(id);
            }
            let mut other = SccSet::new();
            for id in clip(&unioned) {
                other.insert(id, universe);
                reference.insert(id);
            }
            set.union_with(&other, universe);

            proptest::prop_assert_eq!(elems(&set), reference.iter().copied().collect::<Vec<_>>());
            for id in 0..u32::try_from(universe).expect("small universe") {
                proptest::prop_assert_eq!(set.contains(id), reference.contains(&id));
            }
        }
    }
}

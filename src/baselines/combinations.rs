//! # k-combination index generator
//!
//! Streams every distinct `k`-subset of `{0, …, n-1}` as a strictly increasing index list, in
//! lexicographic order. [`crate::baselines::BaselineCollection::update`] maps each subset to
//! the node slots of one correlation group.
//!
//! ## Invariants
//! - Exactly `C(n, k)` subsets are yielded; none twice.
//! - Inside a subset indices are strictly increasing, so the name built from a subset is
//!   canonical and symmetric orderings of the same stations never appear.
//! - `k == 0` or `k > n` yields nothing.
//!
//! ## Complexity
//! - Time: `O(k)` amortized per subset.
//! - Space: the generator owns a single `k`-sized index buffer.

use smallvec::SmallVec;

/// Index buffer of one correlation group. Groups of up to four stations stay on the stack.
pub type GroupIndices = SmallVec<[usize; 4]>;

/// Lexicographic generator of `k`-subsets of `0..n`.
///
/// Arguments
/// -----------------
/// * `n` – Size of the ground set (node count).
/// * `k` – Size of each subset (correlation order).
///
/// Return
/// ----------
/// * Implements `Iterator<Item = GroupIndices>`.
///
/// See also
/// ------------
/// * [`binomial`] – Number of subsets the generator yields.
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    current: GroupIndices,
    exhausted: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Combinations {
            n,
            current: (0..k).collect(),
            exhausted: k == 0 || k > n,
        }
    }

    /// Move `current` to the next subset in lexicographic order.
    fn advance(&mut self) {
        let k = self.current.len();
        // rightmost index that can still be incremented
        let pivot = (0..k).rev().find(|&i| self.current[i] < self.n - k + i);
        match pivot {
            Some(i) => {
                self.current[i] += 1;
                for j in i + 1..k {
                    self.current[j] = self.current[j - 1] + 1;
                }
            }
            None => self.exhausted = true,
        }
    }
}

impl Iterator for Combinations {
    type Item = GroupIndices;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let item = self.current.clone();
        self.advance();
        Some(item)
    }
}

/// Binomial coefficient `C(n, k)`, 0 when `k > n`.
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    (0..k).fold(1usize, |acc, i| acc * (n - i) / (i + 1))
}

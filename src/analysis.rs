//! The analysis registry (component C6): lattice data attached to classes,
//! refined by `make`/`join` and allowed to mutate the graph via `modify`.

use std::cmp::Ordering;
use std::fmt::Debug;

use crate::egraph::EGraph;
use crate::id::ID;
use crate::language::Language;

/// Result of [`Analysis::join`], indicating whether the merged value differs
/// from each of its two inputs.
///
/// The fields may be conservative: `true` is always a safe answer, `false`
/// is only safe when the implementation can prove no change occurred.
/// `DidMerge`s compose with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DidMerge(pub bool, pub bool);

impl std::ops::BitOr for DidMerge {
    type Output = DidMerge;

    fn bitor(mut self, rhs: Self) -> Self::Output {
        self.0 |= rhs.0;
        self.1 |= rhs.1;
        self
    }
}

/// A semi-lattice value attached to every e-class, refined as the graph
/// grows (component C6, §4.6).
///
/// `make`/`join` must together form a join-semilattice: `join` commutative,
/// associative, idempotent, and monotone with respect to the information
/// order `make` values are compared under. Violating this is a *lattice
/// misuse* error (§7) and is only caught by property tests, not at runtime.
pub trait Analysis<L: Language>: Sized {
    /// Per-class lattice value. Must implement `Default` so a [`crate::eclass::EClass`]
    /// can hold a well-defined placeholder for a class whose data has not
    /// yet been computed under a lazy analysis (see `is_lazy`).
    type Data: Debug + Default;

    /// Computes the lattice value for a freshly-interned node from its
    /// children's already-known analysis data. Must not call `add` (the
    /// node being made is, by definition, still being inserted).
    fn make(egraph: &mut EGraph<L, Self>, enode: &L) -> Self::Data;

    /// The semi-lattice join, merging `b` into `a` in place.
    fn join(&mut self, a: &mut Self::Data, b: Self::Data) -> DidMerge;

    /// Side-effecting hook run after a class's data changes. May call
    /// `egraph.merge(..)` (e.g. constant folding collapsing a class into a
    /// literal's class) but must never call `egraph.rebuild()` — rebuild is
    /// not reentrant.
    #[allow(unused_variables)]
    fn modify(egraph: &mut EGraph<L, Self>, id: ID) {}

    /// If `true`, this analysis is not populated by `add` or by `repair`'s
    /// eager-make pass; its `Data` stays at `Default::default()` until a
    /// caller computes it on demand.
    fn is_lazy(&self) -> bool {
        false
    }
}

/// The trivial analysis: every class carries `()`.
impl<L: Language> Analysis<L> for () {
    type Data = ();

    fn make(_egraph: &mut EGraph<L, Self>, _enode: &L) -> Self::Data {}

    fn join(&mut self, _a: &mut Self::Data, _b: Self::Data) -> DidMerge {
        DidMerge(false, false)
    }
}

/// Implements [`Analysis::join`] for a totally-ordered `Data` by keeping the
/// maximum.
pub fn merge_max<T: Ord>(to: &mut T, from: T) -> DidMerge {
    match (*to).cmp(&from) {
        Ordering::Less => {
            *to = from;
            DidMerge(true, false)
        }
        Ordering::Equal => DidMerge(false, false),
        Ordering::Greater => DidMerge(false, true),
    }
}

/// Implements [`Analysis::join`] for a totally-ordered `Data` by keeping the
/// minimum.
pub fn merge_min<T: Ord>(to: &mut T, from: T) -> DidMerge {
    match (*to).cmp(&from) {
        Ordering::Less => DidMerge(false, true),
        Ordering::Equal => DidMerge(false, false),
        Ordering::Greater => {
            *to = from;
            DidMerge(true, false)
        }
    }
}

/// Implements [`Analysis::join`] for `Option<T>`, always preferring `Some`
/// over `None` and delegating to `merge_fn` when both sides are bound.
pub fn merge_option<T>(
    to: &mut Option<T>,
    from: Option<T>,
    merge_fn: impl FnOnce(&mut T, T) -> DidMerge,
) -> DidMerge {
    match (to.as_mut(), from) {
        (None, None) => DidMerge(false, false),
        (None, from @ Some(_)) => {
            *to = from;
            DidMerge(true, false)
        }
        (Some(_), None) => DidMerge(false, true),
        (Some(a), Some(b)) => merge_fn(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(3, 5, 5, DidMerge(true, false) ; "keeps larger from rhs")]
    #[test_case(5, 3, 5, DidMerge(false, true) ; "keeps larger from lhs")]
    #[test_case(4, 4, 4, DidMerge(false, false) ; "equal values report no change")]
    fn merge_max_behaves(mut to: i32, from: i32, expect_value: i32, expect: DidMerge) {
        let got = merge_max(&mut to, from);
        assert_eq!(to, expect_value);
        assert_eq!(got, expect);
    }

    #[test_case(3, 5, 3, DidMerge(false, true) ; "keeps smaller from lhs")]
    #[test_case(5, 3, 3, DidMerge(true, false) ; "keeps smaller from rhs")]
    fn merge_min_behaves(mut to: i32, from: i32, expect_value: i32, expect: DidMerge) {
        let got = merge_min(&mut to, from);
        assert_eq!(to, expect_value);
        assert_eq!(got, expect);
    }

    #[test]
    fn merge_option_prefers_some_over_none() {
        let mut to: Option<i32> = None;
        let merged = merge_option(&mut to, Some(7), merge_max);
        assert_eq!(to, Some(7));
        assert_eq!(merged, DidMerge(true, false));

        let mut to: Option<i32> = Some(7);
        let merged = merge_option(&mut to, None, merge_max);
        assert_eq!(to, Some(7));
        assert_eq!(merged, DidMerge(false, true));
    }

    #[test]
    fn merge_option_delegates_when_both_bound() {
        let mut to = Some(3);
        let merged = merge_option(&mut to, Some(9), merge_max);
        assert_eq!(to, Some(9));
        assert_eq!(merged, DidMerge(true, false));
    }
}

//! Shared hashing aliases (component-agnostic plumbing used by C3/C4/C5).
//!
//! `fxhash` is the same non-cryptographic hasher the teacher lineage uses
//! for its hashcons and class tables; e-node keys are already structurally
//! distinct, so there's nothing to gain from a DoS-resistant hasher here.

pub(crate) type BuildHasher = fxhash::FxBuildHasher;
pub(crate) type HashMap<K, V, B = BuildHasher> = std::collections::HashMap<K, V, B>;
pub(crate) type HashSet<K, B = BuildHasher> = std::collections::HashSet<K, B>;

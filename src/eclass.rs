//! Combined class memory (C4) and parent index (C5) storage: one
//! [`EClass`] per live union-find root.

use crate::id::ID;

/// An equivalence class: its own id, its member nodes (`M[id]`), the
/// (parent-node, owning-class) pairs that reference it (`P[id]`), and its
/// analysis data.
#[derive(Debug, Clone)]
pub struct EClass<L, D> {
    pub id: ID,
    pub nodes: Vec<L>,
    pub parents: Vec<(L, ID)>,
    pub data: D,
}

impl<L, D> EClass<L, D> {
    pub fn new(id: ID, node: L, data: D) -> Self {
        EClass {
            id,
            nodes: vec![node],
            parents: Vec::new(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, L> {
        self.nodes.iter()
    }
}

impl<'a, L, D> IntoIterator for &'a EClass<L, D> {
    type Item = &'a L;
    type IntoIter = std::slice::Iter<'a, L>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

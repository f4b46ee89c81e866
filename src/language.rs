//! The term surface callers must supply (component C2's input contract, and
//! the `Language` surface named in the external-interfaces section).
//!
//! This is the generic seam the original lineage hardcoded to a single
//! concrete node enum; here it is a type parameter so the core e-graph is
//! reusable across host languages, the way upstream `egg` is.

use std::fmt::Debug;
use std::hash::Hash;

use indexmap::IndexSet;

use crate::id::ID;
use crate::utils::HashMap;

/// A term constructor applied to zero or more child class ids.
///
/// Implementors provide structural equality/ordering/hashing over
/// `(operator, children)`, and must keep `operands`/`operands_mut` in sync:
/// both must enumerate exactly the child ids, in the same order.
pub trait Language: Debug + Clone + Eq + Ord + Hash {
    /// Short-circuits the search for congruent nodes: two nodes can only be
    /// congruent (candidates for `matches`) if their discriminants agree.
    type Discriminant: Debug + Clone + Eq + Hash;

    fn discriminant(&self) -> Self::Discriminant;

    /// True if `self` and `other` have the same operator, ignoring children.
    fn matches(&self, other: &Self) -> bool;

    fn operands(&self) -> &[ID];

    fn operands_mut(&mut self) -> &mut [ID];

    fn for_each_operand<F: FnMut(ID)>(&self, f: F) {
        self.operands().iter().copied().for_each(f)
    }

    fn for_each_operand_mut<F: FnMut(&mut ID)>(&mut self, f: F) {
        self.operands_mut().iter_mut().for_each(f)
    }

    fn try_for_each_operand<E, F>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(ID) -> Result<(), E>,
        E: Clone,
    {
        self.fold(Ok(()), |res, id| res.and_then(|_| f(id)))
    }

    /// Number of children. Uses `fold` so implementors only need to provide
    /// `operands`.
    fn len(&self) -> usize {
        self.fold(0, |len, _| len + 1)
    }

    fn is_leaf(&self) -> bool {
        self.all(|_| false)
    }

    fn update_operands<F: FnMut(ID) -> ID>(&mut self, mut f: F) {
        self.for_each_operand_mut(|id| *id = f(*id))
    }

    /// Returns a copy of `self` with every child id rewritten by `f`.
    fn map_operands<F: FnMut(ID) -> ID>(mut self, f: F) -> Self {
        self.update_operands(f);
        self
    }

    fn fold<F, T>(&self, init: T, mut f: F) -> T
    where
        F: FnMut(T, ID) -> T,
        T: Clone,
    {
        let mut acc = init;
        self.for_each_operand(|id| acc = f(acc.clone(), id));
        acc
    }

    fn all<F: FnMut(ID) -> bool>(&self, mut f: F) -> bool {
        self.fold(true, |acc, id| acc && f(id))
    }

    fn any<F: FnMut(ID) -> bool>(&self, mut f: F) -> bool {
        self.fold(false, |acc, id| acc || f(id))
    }

    /// Builds a [`RecExpr`] rooted at `self`, resolving each child id through
    /// `get_node`. `get_node` must be a pure function of its argument (same
    /// id, same node, every time it's called).
    fn build_recexpr<F>(&self, mut get_node: F) -> RecExpr<Self>
    where
        F: FnMut(ID) -> Self,
    {
        self.try_build_recexpr::<_, std::convert::Infallible>(|id| Ok(get_node(id)))
            .unwrap()
    }

    fn try_build_recexpr<F, Err>(&self, mut get_node: F) -> Result<RecExpr<Self>, Err>
    where
        F: FnMut(ID) -> Result<Self, Err>,
    {
        let mut set = IndexSet::<Self>::default();
        let mut ids = HashMap::<ID, ID>::default();
        let mut todo = self.operands().to_vec();

        while let Some(id) = todo.last().copied() {
            if ids.contains_key(&id) {
                todo.pop();
                continue;
            }

            let node = get_node(id)?;

            let mut has_all_children = true;
            for child in node.operands() {
                if !ids.contains_key(child) {
                    has_all_children = false;
                    todo.push(*child);
                }
            }

            if has_all_children {
                let node = node.map_operands(|id| ids[&id]);
                let new_id = set.insert_full(node).0;
                ids.insert(id, ID::new(new_id));
                todo.pop();
            }
        }

        let mut nodes: Vec<Self> = set.into_iter().collect();
        nodes.push(self.clone().map_operands(|id| ids[&id]));
        Ok(RecExpr::from(nodes))
    }
}

/// A flattened, post-order host term: a `Vec` of nodes where every child id
/// refers to an earlier index. This is the host-term surface §6 requires;
/// because it stores nodes in post-order already, `EGraph::add_expr` needs no
/// separate recursive walker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecExpr<L> {
    nodes: Vec<L>,
}

impl<L> Default for RecExpr<L> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<L> AsRef<[L]> for RecExpr<L> {
    fn as_ref(&self) -> &[L] {
        &self.nodes
    }
}

impl<L> From<Vec<L>> for RecExpr<L> {
    fn from(nodes: Vec<L>) -> Self {
        Self { nodes }
    }
}

impl<L> From<RecExpr<L>> for Vec<L> {
    fn from(expr: RecExpr<L>) -> Self {
        expr.nodes
    }
}

impl<L: Language> RecExpr<L> {
    /// Appends `node` and returns its (post-order) index as an [`ID`].
    ///
    /// `node`'s children must already refer to earlier entries.
    pub fn add(&mut self, node: L) -> ID {
        debug_assert!(
            node.all(|id| id.val() < self.nodes.len()),
            "node {node:?} has children not yet present in this expression: {self:?}",
        );
        self.nodes.push(node);
        ID::new(self.nodes.len() - 1)
    }

    /// Removes duplicate structurally-equal subterms, returning an
    /// equivalent, possibly-smaller expression.
    pub fn compact(mut self) -> Self {
        let mut ids: HashMap<ID, ID> = HashMap::default();
        let mut set = IndexSet::new();
        for (i, node) in self.nodes.drain(..).enumerate() {
            let node = node.map_operands(|id| ids[&id]);
            let new_id = set.insert_full(node).0;
            ids.insert(ID::new(i), ID::new(new_id));
        }
        self.nodes.extend(set);
        self
    }

    /// True iff every child id refers to a strictly earlier node, i.e. there
    /// are no cycles in the flattened representation.
    pub fn is_dag(&self) -> bool {
        for (i, node) in self.nodes.iter().enumerate() {
            for &child in node.operands() {
                if child.val() >= i {
                    return false;
                }
            }
        }
        true
    }

    pub fn last_id(&self) -> Option<ID> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(ID::new(self.nodes.len() - 1))
        }
    }
}

impl<L> std::ops::Index<ID> for RecExpr<L> {
    type Output = L;
    fn index(&self, id: ID) -> &L {
        &self.nodes[id.val()]
    }
}

impl<L> std::ops::IndexMut<ID> for RecExpr<L> {
    fn index_mut(&mut self, id: ID) -> &mut L {
        &mut self.nodes[id.val()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toy::Toy;

    #[test]
    fn leaf_has_no_operands() {
        assert!(Toy::Num(1).is_leaf());
        assert!(Toy::Var("x").is_leaf());
        assert_eq!(Toy::Num(1).len(), 0);
    }

    #[test]
    fn application_reports_children() {
        let add = Toy::Add([ID::new(0), ID::new(1)]);
        assert!(!add.is_leaf());
        assert_eq!(add.len(), 2);
        assert_eq!(add.operands(), &[ID::new(0), ID::new(1)]);
    }

    #[test]
    fn rec_expr_add_rejects_forward_references() {
        let mut expr = RecExpr::<Toy>::default();
        let a = expr.add(Toy::Num(1));
        assert_eq!(a, ID::new(0));
        let b = expr.add(Toy::Var("x"));
        let add = expr.add(Toy::Add([a, b]));
        assert_eq!(expr[add], Toy::Add([a, b]));
        assert!(expr.is_dag());
    }

    #[test]
    fn compact_dedups_structurally_equal_subterms() {
        let mut expr = RecExpr::<Toy>::default();
        let a1 = expr.add(Toy::Var("x"));
        let a2 = expr.add(Toy::Var("x"));
        expr.add(Toy::Add([a1, a2]));
        let before = expr.as_ref().len();
        let compacted = expr.compact();
        assert!(compacted.as_ref().len() < before);
    }
}

//! The e-graph itself: hashcons (C3), mutation API (C7), and the deferred
//! rebuilder (C8), wired on top of [`crate::unionfind::UnionFind`] (C1) and
//! [`crate::eclass::EClass`] (C4+C5).

use std::fmt::{self, Debug, Formatter};

use indexmap::IndexMap;
use log::{debug, info, trace};

use crate::analysis::Analysis;
use crate::eclass::EClass;
use crate::id::ID;
use crate::language::{Language, RecExpr};
use crate::unionfind::UnionFind;
use crate::utils::{HashMap, HashSet};

/// Replaces every child id of `node` with its current union-find root.
/// Pure function of `uf`; does not touch the e-graph's other tables.
fn canonicalize<L: Language>(node: &L, uf: &UnionFind) -> L {
    let mut node = node.clone();
    canonicalize_in_place(&mut node, uf);
    node
}

/// In-place counterpart of [`canonicalize`].
fn canonicalize_in_place<L: Language>(node: &mut L, uf: &UnionFind) {
    node.update_operands(|id| uf.find(id));
}

/// An e-graph over language `L`, carrying a single [`Analysis`] `N`.
///
/// Multiple independent analyses are composed by implementing `Analysis`
/// for a tuple/product type whose `Data` is itself a tuple, rather than by
/// registering a dynamic collection of analyses (see `DESIGN.md`).
pub struct EGraph<L: Language, N: Analysis<L>> {
    pub analysis: N,
    unionfind: UnionFind,
    /// Hashcons `H`: canonical node -> class id.
    memo: HashMap<L, ID>,
    /// Class memory `M` and parent index `P`, combined per class.
    classes: HashMap<ID, EClass<L, N::Data>>,
    /// Dirty worklist `D`.
    pending: Vec<ID>,
    root: ID,
    clean: bool,
}

impl<L: Language, N: Analysis<L>> EGraph<L, N> {
    pub fn new(analysis: N) -> Self {
        EGraph {
            analysis,
            unionfind: UnionFind::new(),
            memo: HashMap::default(),
            classes: HashMap::default(),
            pending: Vec::new(),
            root: ID::new(0),
            clean: true,
        }
    }

    /// Builds a graph from `expr`, inserting it and setting it as the root.
    pub fn new_from_term(analysis: N, expr: &RecExpr<L>) -> (Self, ID) {
        let mut egraph = Self::new(analysis);
        let root = egraph.add_expr(expr);
        egraph.root = root;
        (egraph, root)
    }

    pub fn root(&self) -> ID {
        self.root
    }

    pub fn is_clean(&self) -> bool {
        self.clean
    }

    pub fn number_of_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn total_number_of_nodes(&self) -> usize {
        self.classes.values().map(EClass::len).sum()
    }

    pub fn class(&self, id: ID) -> &EClass<L, N::Data> {
        let id = self.find(id);
        &self.classes[&id]
    }

    pub fn classes(&self) -> impl Iterator<Item = &EClass<L, N::Data>> {
        self.classes.values()
    }

    /// `U.find` (component C1).
    pub fn find(&self, id: ID) -> ID {
        self.unionfind.find(id)
    }

    /// Interns `enode`, canonicalizing it first (components C2+C3+C4+C5).
    ///
    /// Idempotent: interning the same node twice returns the same id and
    /// performs no further mutation on the second call.
    pub fn add(&mut self, mut enode: L) -> ID {
        canonicalize_in_place(&mut enode, &self.unionfind);

        if let Some(&existing) = self.memo.get(&enode) {
            let id = self.unionfind.find(existing);
            trace!("add: {enode:?} already interned as {id}");
            return id;
        }

        let id = self.unionfind.make();
        trace!("add: interning {enode:?} as {id}");

        let mut distinct_children: Vec<ID> = enode
            .operands()
            .iter()
            .map(|&child| self.unionfind.find(child))
            .collect();
        distinct_children.sort_unstable();
        distinct_children.dedup();
        for child in distinct_children {
            self.classes
                .get_mut(&child)
                .expect("child class must already be interned")
                .parents
                .push((enode.clone(), id));
        }

        let data = if self.analysis.is_lazy() {
            N::Data::default()
        } else {
            N::make(self, &enode)
        };
        self.classes.insert(id, EClass::new(id, enode.clone(), data));
        self.memo.insert(enode, id);

        if !self.analysis.is_lazy() {
            N::modify(self, id);
        }
        self.unionfind.find(id)
    }

    /// Interns a whole flattened host term, translating child ids as it
    /// walks `expr` in its stored post-order.
    pub fn add_expr(&mut self, expr: &RecExpr<L>) -> ID {
        let nodes = expr.as_ref();
        let mut new_ids: Vec<ID> = Vec::with_capacity(nodes.len());
        for node in nodes {
            let node = node.clone().map_operands(|id| new_ids[id.val()]);
            new_ids.push(self.add(node));
        }
        *new_ids
            .last()
            .expect("RecExpr passed to add_expr must not be empty")
    }

    /// Asserts `a` and `b` denote the same value, unioning their classes.
    ///
    /// Does *not* restore the congruence invariant; callers must call
    /// [`EGraph::rebuild`] before relying on canonical lookups elsewhere in
    /// the graph.
    pub fn merge(&mut self, a: ID, b: ID) -> ID {
        let ra = self.unionfind.find(a);
        let rb = self.unionfind.find(b);
        if ra == rb {
            return ra;
        }

        let kept = self.unionfind.union(ra, rb);
        let other = if kept == ra { rb } else { ra };
        debug!("merge: folding class {other} into {kept}");

        self.clean = false;
        self.pending.push(kept);

        let mut other_class = self
            .classes
            .remove(&other)
            .expect("merged-away class must exist");

        // Remove hashcons entries keyed by the pre-canonical node forms
        // before either side is rewritten, then re-canonicalize and
        // re-insert both sides under `kept`.
        for node in other_class.nodes.iter().chain(
            self.classes
                .get(&kept)
                .expect("surviving class must exist")
                .nodes
                .iter(),
        ) {
            self.memo.remove(node);
        }

        for node in &mut other_class.nodes {
            canonicalize_in_place(node, &self.unionfind);
            self.memo.insert(node.clone(), kept);
        }
        for node in self
            .classes
            .get_mut(&kept)
            .expect("surviving class must exist")
            .nodes
            .iter_mut()
        {
            canonicalize_in_place(node, &self.unionfind);
            self.memo.insert(node.clone(), kept);
        }

        if self.root == other {
            self.root = kept;
        }

        let other_parents = other_class.parents;
        let other_data = other_class.data;
        let mut other_nodes = other_class.nodes;

        let merged = {
            let kept_class = self
                .classes
                .get_mut(&kept)
                .expect("surviving class must exist");
            kept_class.nodes.append(&mut other_nodes);
            kept_class.parents.extend(other_parents);
            self.analysis.join(&mut kept_class.data, other_data)
        };

        if merged.0 || merged.1 {
            self.pending.push(kept);
        }

        kept
    }

    /// Restores invariants 1-6 by draining the dirty worklist (component
    /// C8). Returns the number of outer-loop passes it took.
    pub fn rebuild(&mut self) -> usize {
        let mut n_rebuilds = 0;
        while !self.pending.is_empty() {
            n_rebuilds += 1;
            let mut todo: Vec<ID> = std::mem::take(&mut self.pending)
                .into_iter()
                .map(|id| self.unionfind.find(id))
                .collect();
            todo.sort_unstable();
            todo.dedup();
            trace!("rebuild: pass {n_rebuilds}, {} classes to repair", todo.len());
            for id in todo {
                self.repair(id);
            }
        }

        self.rebuild_classes();

        if !self.unionfind.is_empty() {
            self.root = self.unionfind.find(self.root);
        }

        self.clean = true;
        info!("rebuild: converged after {n_rebuilds} pass(es)");
        n_rebuilds
    }

    /// Re-canonicalizes and deduplicates every class's *own* member nodes
    /// (`M`), and rebuilds the hashcons from the result.
    ///
    /// `repair` only re-canonicalizes a node where it appears as a parent
    /// copy recorded in some child's `P` list; it never writes the result
    /// back into the owning class's own `nodes` vec. A class whose child
    /// merges without the class itself being merged (e.g. `top = f(fa, b)`
    /// when only `fa`'s child merges) would otherwise keep a stale,
    /// non-canonical node in `M` forever, and `merge`'s node-list splice
    /// would leave duplicate nodes behind when two classes collapse into
    /// one. Congruences themselves are still discovered entirely through
    /// the `P`-index chasing in `repair`; this pass cannot surface a merge
    /// that `repair` didn't already find, it only restores invariants 1-3
    /// for member nodes once the union-find has fully settled. Mirrors
    /// `egg`'s dedicated `rebuild_classes` pass.
    fn rebuild_classes(&mut self) {
        for class in self.classes.values_mut() {
            for node in &mut class.nodes {
                canonicalize_in_place(node, &self.unionfind);
            }
            class.nodes.sort_unstable();
            class.nodes.dedup();
        }

        self.memo.clear();
        for (&id, class) in &self.classes {
            for node in &class.nodes {
                self.memo.insert(node.clone(), id);
            }
        }
    }

    fn repair(&mut self, id: ID) {
        let id = self.unionfind.find(id);

        let mut parents = std::mem::take(
            &mut self
                .classes
                .get_mut(&id)
                .expect("class under repair must exist")
                .parents,
        );

        // Step 1: re-hashcons parents against the current union-find state.
        for (node, _) in &parents {
            self.memo.remove(node);
        }
        for (node, child) in &mut parents {
            canonicalize_in_place(node, &self.unionfind);
            *child = self.unionfind.find(*child);
            self.memo.insert(node.clone(), *child);
        }

        // Step 2: deduplicate congruent parents, merging any that collide
        // (upwards merging). `merge` may recursively repair/enqueue.
        let mut new_parents: IndexMap<L, ID> =
            IndexMap::with_capacity_and_hasher(parents.len(), Default::default());
        for (node, child) in parents {
            let child = self.unionfind.find(child);
            if let Some(&existing) = new_parents.get(&node) {
                self.merge(child, existing);
            }
            let child = self.unionfind.find(child);
            new_parents.insert(node, child);
        }

        let id = self.unionfind.find(id);
        self.classes
            .get_mut(&id)
            .expect("class under repair must exist")
            .parents = new_parents.into_iter().collect();

        // Step 3: propagate the analysis, if it isn't lazy.
        if self.analysis.is_lazy() {
            return;
        }

        N::modify(self, id);
        let id = self.unionfind.find(id);

        let parents = self
            .classes
            .get(&id)
            .expect("class under repair must exist")
            .parents
            .clone();
        for (node, child) in parents {
            let child = self.unionfind.find(child);
            let made = N::make(self, &node);
            let class = self
                .classes
                .get_mut(&child)
                .expect("parent class must exist");
            let did_merge = self.analysis.join(&mut class.data, made);
            if did_merge.0 {
                self.pending.push(child);
            }
        }
    }

    /// Iterative DFS from `find(id)` over every node's children, tolerant
    /// of cycles (component C7's `reachable`).
    pub fn reachable(&self, id: ID) -> HashSet<ID> {
        let start = self.unionfind.find(id);
        let mut seen: HashSet<ID> = HashSet::default();
        let mut stack = vec![start];
        seen.insert(start);

        while let Some(id) = stack.pop() {
            for node in &self.classes[&id].nodes {
                for &child in node.operands() {
                    let child = self.unionfind.find(child);
                    if seen.insert(child) {
                        stack.push(child);
                    }
                }
            }
        }

        seen
    }
}

impl<L: Language + Debug, N: Analysis<L>> Debug for EGraph<L, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("EGraph")
            .field("classes", &self.classes.len())
            .field("memo", &self.memo.len())
            .field("pending", &self.pending.len())
            .field("root", &self.root)
            .field("clean", &self.clean)
            .finish()
    }
}

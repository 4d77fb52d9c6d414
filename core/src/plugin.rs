//! The plugin registry and the two traits a theory implements: [`Plugin`] (per-term operations)
//! and [`SortOps`] (per-sort operations, principally decision-making). Dispatch is through this
//! table, never through virtual inheritance baked into `Term` itself (`spec.md` §9).

use crate::actions::Actions;
use crate::atom::Atom;
use crate::ids::{AtomId, PluginId, TermId};
use crate::term::{Term, TermView, Value};
use std::collections::HashMap;

/// The result of a generalised watch callback (`spec.md` §4.3): whether the watch registration
/// that triggered the callback should be kept or dropped.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum WatchResult {
    Keep,
    Remove,
}

/// Per-term operations a theory plugin implements.
pub trait Plugin {
    /// A short name, used in `Debug`/tracing output.
    fn name(&self) -> &str;

    /// Called once when a freshly hash-consed term owned by this plugin is first registered with
    /// the core; an opportunity to register initial watches.
    fn init(&mut self, actions: &mut dyn Actions, term: TermId, view: &TermView);

    /// Called when a term `watch` that `term` registered interest in becomes assigned
    /// (`spec.md` §4.3's "generalised watches"). Returning `Remove` drops this (`term`, `watch`)
    /// registration; `Keep` leaves it in place for future assignments of `watch` (relevant after
    /// backtracking re-triggers it).
    fn update_watches(&mut self, actions: &mut dyn Actions, term: TermId, watch: TermId) -> WatchResult;

    /// Called by garbage collection when `term` has been proven unreachable; an opportunity to
    /// release any plugin-side resources (e.g. entries in auxiliary maps keyed by `term`).
    fn delete(&mut self, term: TermId);

    /// The immediate subterms of `view`, used by GC reachability marking.
    fn subterms(&self, view: &TermView) -> Vec<TermId>;

    /// If this plugin can evaluate `view` purely from its subterms' current values (without
    /// search), returns the implied value.
    fn eval(&self, view: &TermView, sub_value: &dyn Fn(TermId) -> Option<Value>) -> Option<Value>;

    /// A structural hash of `view`, used to bucket candidates in the hash-consing table
    /// (`spec.md` §3: "constructing the same view twice yields the same term").
    fn hash_view(&self, view: &TermView) -> u64;

    /// Structural equality between two views of this plugin, used to resolve hash collisions in
    /// the consing table.
    fn view_eq(&self, a: &TermView, b: &TermView) -> bool;
}

/// Per-sort operations: everything that depends only on a term's *sort*, not its specific view,
/// chiefly decision-making (`spec.md` §4.6: "if semantic, call the type's `decide(actions, t)`").
pub trait SortOps {
    /// Picks a value for `term` of this sort (`spec.md` §4.6). Called only for unassigned
    /// semantic-variable terms reached by the decision heap.
    fn decide(&self, actions: &mut dyn Actions, term: TermId) -> Value;

    /// Structural equality of two values of this sort.
    fn eq(&self, a: &Value, b: &Value) -> bool;

    /// The initial `decide_state` payload for a freshly-registered semantic variable of this sort.
    fn mk_state(&self, term: TermId) -> Box<dyn crate::var::DecideState>;

    /// Renders a value of this sort for diagnostics.
    fn print(&self, value: &Value) -> String;
}

/// A plugin's hash-consing table: buckets candidate terms by structural hash, then resolves
/// collisions with `Plugin::view_eq` (`spec.md` §9, mirroring the teacher's `RefPool`).
#[derive(Default)]
struct ConsTable {
    buckets: HashMap<u64, Vec<TermId>>,
}

impl ConsTable {
    fn insert(&mut self, hash: u64, term: TermId) {
        self.buckets.entry(hash).or_default().push(term);
    }

    fn candidates(&self, hash: u64) -> &[TermId] {
        self.buckets.get(&hash).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Owns every registered plugin, the term/atom arenas, and the per-plugin hash-consing tables.
/// This is the home of `mk_term`/`mk_clause`/`attach`/`detach` (`spec.md` §4.1).
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
    sorts: HashMap<(PluginId, u16), Box<dyn SortOps>>,
    cons_tables: Vec<ConsTable>,
    pub terms: crate::collections::ref_store::RefVec<TermId, Term>,
    pub atoms: crate::collections::ref_store::RefVec<AtomId, Atom>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        PluginRegistry {
            plugins: Vec::new(),
            sorts: HashMap::new(),
            cons_tables: Vec::new(),
            terms: Default::default(),
            atoms: Default::default(),
        }
    }

    /// Registers a new plugin, returning its freshly allocated id.
    pub fn register_plugin(&mut self, plugin: Box<dyn Plugin>) -> PluginId {
        assert!(
            (self.plugins.len() as u32) < PluginId::MAX_PLUGINS,
            "plugin registry exhausted"
        );
        let id = PluginId::new(self.plugins.len() as u8);
        self.plugins.push(plugin);
        self.cons_tables.push(ConsTable::default());
        id
    }

    pub fn register_sort(&mut self, plugin: PluginId, sort_index: u16, ops: Box<dyn SortOps>) {
        self.sorts.insert((plugin, sort_index), ops);
    }

    pub fn plugin(&self, id: PluginId) -> &dyn Plugin {
        self.plugins[id.to_u8() as usize].as_ref()
    }

    pub fn plugin_mut(&mut self, id: PluginId) -> &mut dyn Plugin {
        self.plugins[id.to_u8() as usize].as_mut()
    }

    /// Direct access to the plugin vector, used by the propagation loop to temporarily swap a
    /// plugin out (so its `update_watches` can be called with a disjoint mutable borrow of the
    /// rest of the registry via `Actions`), mirroring [`PluginRegistry::take_sort_ops`].
    pub fn plugins_mut(&mut self) -> &mut Vec<Box<dyn Plugin>> {
        &mut self.plugins
    }

    pub fn sort_ops(&self, plugin: PluginId, sort_index: u16) -> Option<&dyn SortOps> {
        self.sorts.get(&(plugin, sort_index)).map(|b| b.as_ref())
    }

    /// Temporarily removes a sort's operation table, so its `decide` can be called with a mutable
    /// borrow of the rest of the registry (via `Actions`) without aliasing. Pair with
    /// [`PluginRegistry::restore_sort_ops`].
    pub fn take_sort_ops(&mut self, plugin: PluginId, sort_index: u16) -> Box<dyn SortOps> {
        self.sorts
            .remove(&(plugin, sort_index))
            .expect("semantic variable's sort has no registered SortOps")
    }

    pub fn restore_sort_ops(&mut self, plugin: PluginId, sort_index: u16, ops: Box<dyn SortOps>) {
        self.sorts.insert((plugin, sort_index), ops);
    }

    /// Hashes `view` under `plugin`'s hash-consing table.
    pub(crate) fn cons_hash(&self, plugin: PluginId, view: &TermView) -> u64 {
        self.plugin(plugin).hash_view(view)
    }

    /// Looks up a structurally-equal, already-consed term for `view` under `plugin`, if any
    /// (`spec.md` §3: "constructing the same view twice yields the same term").
    pub(crate) fn cons_find(&self, plugin: PluginId, hash: u64, view: &TermView) -> Option<TermId> {
        let table_idx = plugin.to_u8() as usize;
        self.cons_tables[table_idx]
            .candidates(hash)
            .iter()
            .copied()
            .find(|&candidate| self.plugin(plugin).view_eq(&self.terms[candidate].view, view))
    }

    pub(crate) fn cons_insert(&mut self, plugin: PluginId, hash: u64, id: TermId) {
        self.cons_tables[plugin.to_u8() as usize].insert(hash, id);
    }

    /// Allocates a fresh term in the arena, without consing or calling `Plugin::init` (the caller,
    /// [`crate::driver::Solver::mk_term`], does the consing and calls `init` afterwards with a
    /// disjoint borrow of the plugin — see its doc comment for why that two-step split is needed).
    pub(crate) fn alloc_term(&mut self, plugin: PluginId, view: TermView, sort: crate::term::Sort) -> TermId {
        let local_index = self.terms.len() as u32;
        let id = TermId::new(plugin, local_index);
        let mut term = Term::new(id, view, sort);
        term.flags.set_added(true);
        let pushed = self.terms.push(term);
        debug_assert_eq!(pushed, id);
        id
    }

    /// Allocates the atom pair for a freshly-registered boolean term, per `spec.md` §3's
    /// lifecycle note ("registered with the core, which allocates the atom pair for Boolean
    /// terms").
    pub fn mk_bool_atoms(&mut self, term: TermId) -> (AtomId, AtomId) {
        let local = self.atoms.len() as u32 / 2;
        let pos = AtomId::positive(local);
        let neg = pos.negate();
        let pushed_pos = self.atoms.push(Atom::new(pos, term));
        let pushed_neg = self.atoms.push(Atom::new(neg, term));
        debug_assert_eq!(pushed_pos, pos);
        debug_assert_eq!(pushed_neg, neg);
        self.terms[term].var = crate::var::Var::Bool {
            pos_atom: pos,
            neg_atom: neg,
        };
        (pos, neg)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A placeholder plugin with no behaviour, used only to fill the momentary hole left when a real
/// plugin is swapped out of the registry so its own `update_watches` can be called
/// (`propagate::run_generalised_watches`). Never registered as a real plugin.
pub(crate) struct NullPlugin;

impl NullPlugin {
    pub(crate) fn boxed() -> Box<dyn Plugin> {
        Box::new(NullPlugin)
    }
}

impl Plugin for NullPlugin {
    fn name(&self) -> &str {
        "null"
    }
    fn init(&mut self, _actions: &mut dyn Actions, _term: TermId, _view: &TermView) {
        unreachable!("NullPlugin is never registered, only used as a swap placeholder")
    }
    fn update_watches(&mut self, _actions: &mut dyn Actions, _term: TermId, _watch: TermId) -> WatchResult {
        unreachable!("NullPlugin is never registered, only used as a swap placeholder")
    }
    fn delete(&mut self, _term: TermId) {}
    fn subterms(&self, _view: &TermView) -> Vec<TermId> {
        vec![]
    }
    fn eval(&self, _view: &TermView, _sub_value: &dyn Fn(TermId) -> Option<Value>) -> Option<Value> {
        None
    }
    fn hash_view(&self, _view: &TermView) -> u64 {
        0
    }
    fn view_eq(&self, _a: &TermView, _b: &TermView) -> bool {
        false
    }
}

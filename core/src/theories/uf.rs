//! Uninterpreted functions with congruence (`spec.md` §2's third bundled theory): function symbols
//! applied to domain elements, plus equality between two such applications. Function arguments are
//! restricted to leaf elements (no nested applications) — enough to demonstrate congruence-driven
//! equality propagation through the plugin contract without a full union-find congruence closure,
//! which `spec.md` §1 leaves to the theory plugin's internals, out of scope here.
//!
//! Builds on the same opaque-domain-element idea as [`crate::theories::uninterpreted_sort`], adding
//! `App` (function application) and congruence: two applications of the same symbol to
//! element-wise-equal arguments always denote the same value, computed lazily and memoised the
//! first time a particular `(symbol, args)` combination is seen.

use crate::actions::Actions;
use crate::driver::Solver;
use crate::ids::{PluginId, TermId};
use crate::plugin::{Plugin, SortOps, WatchResult};
use crate::term::{Sort, TermView, Value};
use crate::var::DecideState;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

const TAG_ELEM: u16 = 0;
const TAG_APP: u16 = 1;
const TAG_EQ: u16 = 2;
pub const SORT_ELEM: u16 = 0;

struct ElemPayload(u32);
struct AppPayload { symbol: u32, args: Vec<TermId> }
struct EqPayload { lhs: TermId, rhs: TermId }

struct ElemState {
    counter: Arc<AtomicI64>,
}

/// The "is this an `App` or a plain element" shape of a single UF-sorted term, recorded at `init`
/// since `update_watches`/congruence lookups only ever receive a `TermId`.
#[derive(Clone)]
enum Shape {
    Elem,
    App { symbol: u32, args: Vec<TermId> },
}

pub struct UfPlugin {
    counter: Arc<AtomicI64>,
    shapes: HashMap<TermId, Shape>,
    eqs: HashMap<TermId, (TermId, TermId)>,
    /// Congruence table: the canonical value assigned the first time a given `(symbol, arg values)`
    /// combination is observed, memoised so later observations of the same combination agree
    /// (`spec.md` §2's congruence requirement: "equal arguments imply equal results").
    congruence: RefCell<HashMap<(u32, Vec<i64>), i64>>,
    next_value: Arc<AtomicI64>,
}

impl UfPlugin {
    pub fn new() -> Self {
        UfPlugin {
            counter: Arc::new(AtomicI64::new(0)),
            shapes: HashMap::new(),
            eqs: HashMap::new(),
            congruence: RefCell::new(HashMap::new()),
            next_value: Arc::new(AtomicI64::new(i64::MIN / 2)),
        }
    }

    /// A fresh domain element. `external_id` only seeds the hash bucket — elements are never
    /// consed against one another (see `view_eq`), so two calls always yield distinct terms even
    /// with the same `external_id`.
    pub fn mk_elem(solver: &mut Solver, plugin: PluginId, external_id: u32) -> TermId {
        solver.mk_term(plugin, TermView::new(TAG_ELEM, ElemPayload(external_id)), Sort::Plugin(plugin, SORT_ELEM))
    }

    /// `symbol(args...)`, itself a term of the same uninterpreted sort. `args` must each be a leaf
    /// element (this plugin does not support nested applications).
    pub fn mk_app(solver: &mut Solver, plugin: PluginId, symbol: u32, args: Vec<TermId>) -> TermId {
        solver.mk_term(plugin, TermView::new(TAG_APP, AppPayload { symbol, args }), Sort::Plugin(plugin, SORT_ELEM))
    }

    pub fn mk_eq(solver: &mut Solver, plugin: PluginId, lhs: TermId, rhs: TermId) -> TermId {
        solver.mk_term(plugin, TermView::new(TAG_EQ, EqPayload { lhs, rhs }), Sort::Bool)
    }

    /// The congruence-canonical value of `(symbol, args)`, assigning a fresh one the first time this
    /// exact combination is seen and memoising it for all future observations.
    fn congruence_value(&self, symbol: u32, args: Vec<i64>) -> i64 {
        let key = (symbol, args);
        if let Some(&v) = self.congruence.borrow().get(&key) {
            return v;
        }
        let fresh = self.next_value.fetch_add(1, Ordering::Relaxed);
        self.congruence.borrow_mut().insert(key, fresh);
        fresh
    }

    /// The current value denoted by `term`, resolving `App`s through the congruence table rather
    /// than the trail (an `App` term is never itself assigned — it has no `Var`, only a derived
    /// value). Returns `None` if any argument is still unassigned.
    fn current_value(&self, actions: &dyn Actions, term: TermId) -> Option<i64> {
        match self.shapes.get(&term)? {
            Shape::Elem => match actions.value_of(term) {
                Some(Value::Semantic(v)) => Some(v),
                _ => None,
            },
            Shape::App { symbol, args } => {
                let mut arg_values = Vec::with_capacity(args.len());
                for &a in args {
                    match actions.value_of(a) {
                        Some(Value::Semantic(v)) => arg_values.push(v),
                        _ => return None,
                    }
                }
                Some(self.congruence_value(*symbol, arg_values))
            }
        }
    }
}

impl Default for UfPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for UfPlugin {
    fn name(&self) -> &str {
        "uf"
    }

    fn init(&mut self, actions: &mut dyn Actions, term: TermId, view: &TermView) {
        match view.tag {
            TAG_ELEM => {
                self.shapes.insert(term, Shape::Elem);
                actions.register_semantic_var(term);
            }
            TAG_APP => {
                let AppPayload { symbol, args } = view.downcast_ref::<AppPayload>().unwrap();
                self.shapes.insert(term, Shape::App { symbol: *symbol, args: args.clone() });
                // `App` itself is never assigned (`Var::None`); it is awakened only so an `Eq`
                // watching one of its arguments can recompute through it.
            }
            TAG_EQ => {
                let EqPayload { lhs, rhs } = view.downcast_ref::<EqPayload>().unwrap();
                for &leaf in self.leaves_of(*lhs).iter().chain(self.leaves_of(*rhs).iter()) {
                    actions.watch(term, leaf);
                }
                self.eqs.insert(term, (*lhs, *rhs));
            }
            _ => unreachable!(),
        }
    }

    fn update_watches(&mut self, actions: &mut dyn Actions, term: TermId, _watch: TermId) -> WatchResult {
        let Some(&(lhs, rhs)) = self.eqs.get(&term) else {
            return WatchResult::Keep;
        };
        if actions.value_of(term).is_some() {
            return WatchResult::Keep;
        }
        if let (Some(a), Some(b)) = (self.current_value(actions, lhs), self.current_value(actions, rhs)) {
            let mut subs = self.leaves_of(lhs);
            subs.extend(self.leaves_of(rhs));
            actions.propagate_bool_eval(term, a == b, subs);
        }
        WatchResult::Keep
    }

    fn delete(&mut self, term: TermId) {
        self.shapes.remove(&term);
        self.eqs.remove(&term);
    }

    fn subterms(&self, view: &TermView) -> Vec<TermId> {
        match view.tag {
            TAG_APP => view.downcast_ref::<AppPayload>().unwrap().args.clone(),
            TAG_EQ => {
                let EqPayload { lhs, rhs } = view.downcast_ref::<EqPayload>().unwrap();
                vec![*lhs, *rhs]
            }
            _ => vec![],
        }
    }

    fn eval(&self, view: &TermView, sub_value: &dyn Fn(TermId) -> Option<Value>) -> Option<Value> {
        // Only the element-only case is resolvable through the narrow `sub_value` interface; `Eq`
        // over an `App` needs the plugin's own congruence table and is instead resolved eagerly in
        // `update_watches`, which has full `Actions` access.
        match view.tag {
            TAG_EQ => {
                let EqPayload { lhs, rhs } = view.downcast_ref::<EqPayload>().unwrap();
                match (sub_value(*lhs), sub_value(*rhs)) {
                    (Some(Value::Semantic(a)), Some(Value::Semantic(b))) => Some(Value::Bool(a == b)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn hash_view(&self, view: &TermView) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut h = std::collections::hash_map::DefaultHasher::new();
        view.tag.hash(&mut h);
        match view.tag {
            TAG_ELEM => view.downcast_ref::<ElemPayload>().unwrap().0.hash(&mut h),
            TAG_APP => {
                let AppPayload { symbol, args } = view.downcast_ref::<AppPayload>().unwrap();
                symbol.hash(&mut h);
                for a in args {
                    a.to_u32().hash(&mut h);
                }
            }
            TAG_EQ => {
                let EqPayload { lhs, rhs } = view.downcast_ref::<EqPayload>().unwrap();
                lhs.to_u32().hash(&mut h);
                rhs.to_u32().hash(&mut h);
            }
            _ => unreachable!(),
        }
        h.finish()
    }

    fn view_eq(&self, a: &TermView, b: &TermView) -> bool {
        if a.tag != b.tag {
            return false;
        }
        match a.tag {
            // Each `mk_elem` call denotes a fresh, distinct element; never consed against another.
            TAG_ELEM => false,
            TAG_APP => {
                let aa = a.downcast_ref::<AppPayload>().unwrap();
                let ba = b.downcast_ref::<AppPayload>().unwrap();
                aa.symbol == ba.symbol && aa.args == ba.args
            }
            TAG_EQ => {
                let ea = a.downcast_ref::<EqPayload>().unwrap();
                let eb = b.downcast_ref::<EqPayload>().unwrap();
                ea.lhs == eb.lhs && ea.rhs == eb.rhs
            }
            _ => false,
        }
    }
}

impl UfPlugin {
    /// The leaf element terms feeding into `term` (itself if an element, its arguments if an
    /// application), used to pick watch targets and justification subterms.
    fn leaves_of(&self, term: TermId) -> Vec<TermId> {
        match self.shapes.get(&term) {
            Some(Shape::App { args, .. }) => args.clone(),
            _ => vec![term],
        }
    }
}

impl SortOps for UfPlugin {
    fn decide(&self, _actions: &mut dyn Actions, _term: TermId) -> Value {
        Value::Semantic(self.counter.fetch_add(1, Ordering::Relaxed))
    }

    fn eq(&self, a: &Value, b: &Value) -> bool {
        matches!((a, b), (Value::Semantic(x), Value::Semantic(y)) if x == y)
    }

    fn mk_state(&self, _term: TermId) -> Box<dyn DecideState> {
        Box::new(ElemState { counter: self.counter.clone() })
    }

    fn print(&self, value: &Value) -> String {
        match value {
            Value::Semantic(v) => format!("e{v}"),
            Value::Bool(b) => format!("{b}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SolveResult;

    #[test]
    fn congruence_forces_equal_applications_when_arguments_are_equal() {
        let mut s = Solver::new();
        let p = s.register_plugin(Box::new(UfPlugin::new()));
        s.register_sort(p, SORT_ELEM, Box::new(UfPlugin::new()));
        let a = UfPlugin::mk_elem(&mut s, p, 0);
        let b = UfPlugin::mk_elem(&mut s, p, 1);
        let fa = UfPlugin::mk_app(&mut s, p, 42, vec![a]);
        let fb = UfPlugin::mk_app(&mut s, p, 42, vec![b]);
        let eq_args = UfPlugin::mk_eq(&mut s, p, a, b);
        let eq_apps = UfPlugin::mk_eq(&mut s, p, fa, fb);
        let eq_args_true = s.atom_of(eq_args, true);
        s.add_hypothesis(&[eq_args_true]);
        let result = s.solve(|| false).unwrap();
        assert_eq!(result, SolveResult::Sat);
        assert_eq!(s.term_value(eq_apps).and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn distinct_elements_give_distinct_applications() {
        let mut s = Solver::new();
        let p = s.register_plugin(Box::new(UfPlugin::new()));
        s.register_sort(p, SORT_ELEM, Box::new(UfPlugin::new()));
        let a = UfPlugin::mk_elem(&mut s, p, 0);
        let b = UfPlugin::mk_elem(&mut s, p, 1);
        let fa = UfPlugin::mk_app(&mut s, p, 7, vec![a]);
        let fb = UfPlugin::mk_app(&mut s, p, 7, vec![b]);
        let eq_args = UfPlugin::mk_eq(&mut s, p, a, b);
        let eq_apps = UfPlugin::mk_eq(&mut s, p, fa, fb);
        let eq_args_false = s.atom_of(eq_args, false);
        s.add_hypothesis(&[eq_args_false]);
        let result = s.solve(|| false).unwrap();
        assert_eq!(result, SolveResult::Sat);
        assert_eq!(s.term_value(eq_apps).and_then(|v| v.as_bool()), Some(false));
    }
}

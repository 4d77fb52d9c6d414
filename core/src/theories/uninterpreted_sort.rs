//! A bare uninterpreted sort (`spec.md` §2/§6): opaque domain elements with no structure beyond
//! identity, plus a boolean equality atom between two elements. Demonstrates the `SortOps` half of
//! the plugin contract (`decide`/`eq`/`mk_state`/`print`) in isolation from [`crate::theories::uf`]'s
//! function symbols and congruence.

use crate::actions::Actions;
use crate::driver::Solver;
use crate::ids::{PluginId, TermId};
use crate::plugin::{Plugin, SortOps, WatchResult};
use crate::term::{Sort, TermView, Value};
use crate::var::DecideState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

const TAG_ELEM: u16 = 0;
const TAG_EQ: u16 = 1;
pub const SORT_ELEM: u16 = 0;

struct ElemPayload(u32);
struct EqPayload { lhs: TermId, rhs: TermId }

/// The decision state of one element variable: a shared counter handing out fresh, pairwise-distinct
/// domain values on `decide` (`spec.md` §4.6's "plugin-defined" initial polarity/value). Sharing the
/// counter across all elements of the sort means two undecided elements default to *different*
/// values unless something forces them equal — the natural "no information yet" prior for an
/// uninterpreted sort. `DecideState` requires `Send + Sync`, hence `Arc<AtomicI64>` rather than the
/// simpler `Rc<Cell<_>>`.
struct ElemState {
    counter: Arc<AtomicI64>,
}

pub struct UninterpretedSortPlugin {
    counter: Arc<AtomicI64>,
    eqs: HashMap<TermId, (TermId, TermId)>,
}

impl UninterpretedSortPlugin {
    pub fn new() -> Self {
        UninterpretedSortPlugin {
            counter: Arc::new(AtomicI64::new(0)),
            eqs: HashMap::new(),
        }
    }

    pub fn mk_elem(solver: &mut Solver, plugin: PluginId, external_id: u32) -> TermId {
        solver.mk_term(
            plugin,
            TermView::new(TAG_ELEM, ElemPayload(external_id)),
            Sort::Plugin(plugin, SORT_ELEM),
        )
    }

    pub fn mk_eq(solver: &mut Solver, plugin: PluginId, lhs: TermId, rhs: TermId) -> TermId {
        solver.mk_term(plugin, TermView::new(TAG_EQ, EqPayload { lhs, rhs }), Sort::Bool)
    }
}

impl Default for UninterpretedSortPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for UninterpretedSortPlugin {
    fn name(&self) -> &str {
        "uninterpreted_sort"
    }

    fn init(&mut self, actions: &mut dyn Actions, term: TermId, view: &TermView) {
        match view.tag {
            TAG_ELEM => actions.register_semantic_var(term),
            TAG_EQ => {
                let EqPayload { lhs, rhs } = view.downcast_ref::<EqPayload>().unwrap();
                actions.watch(term, *lhs);
                actions.watch(term, *rhs);
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
        if let (Some(Value::Semantic(a)), Some(Value::Semantic(b))) = (actions.value_of(lhs), actions.value_of(rhs)) {
            actions.propagate_bool_eval(term, a == b, vec![lhs, rhs]);
        }
        WatchResult::Keep
    }

    fn delete(&mut self, term: TermId) {
        self.eqs.remove(&term);
    }

    fn subterms(&self, view: &TermView) -> Vec<TermId> {
        match view.tag {
            TAG_EQ => {
                let EqPayload { lhs, rhs } = view.downcast_ref::<EqPayload>().unwrap();
                vec![*lhs, *rhs]
            }
            _ => vec![],
        }
    }

    fn eval(&self, view: &TermView, sub_value: &dyn Fn(TermId) -> Option<Value>) -> Option<Value> {
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
            TAG_ELEM => a.downcast_ref::<ElemPayload>().unwrap().0 == b.downcast_ref::<ElemPayload>().unwrap().0,
            TAG_EQ => {
                let ea = a.downcast_ref::<EqPayload>().unwrap();
                let eb = b.downcast_ref::<EqPayload>().unwrap();
                ea.lhs == eb.lhs && ea.rhs == eb.rhs
            }
            _ => false,
        }
    }
}

impl SortOps for UninterpretedSortPlugin {
    fn decide(&self, _actions: &mut dyn Actions, term: TermId) -> Value {
        let _ = term;
        Value::Semantic(self.counter.fetch_add(1, Ordering::Relaxed))
    }

    fn eq(&self, a: &Value, b: &Value) -> bool {
        matches!((a, b), (Value::Semantic(x), Value::Semantic(y)) if x == y)
    }

    fn mk_state(&self, _term: TermId) -> Box<dyn DecideState> {
        Box::new(ElemState {
            counter: self.counter.clone(),
        })
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
    fn equal_elements_satisfy_a_positive_equality_hypothesis() {
        let mut s = Solver::new();
        let p = s.register_plugin(Box::new(UninterpretedSortPlugin::new()));
        s.register_sort(p, SORT_ELEM, Box::new(UninterpretedSortPlugin::new()));
        let a = UninterpretedSortPlugin::mk_elem(&mut s, p, 0);
        let b = UninterpretedSortPlugin::mk_elem(&mut s, p, 1);
        let eq = UninterpretedSortPlugin::mk_eq(&mut s, p, a, b);
        let eq_true = s.atom_of(eq, true);
        s.add_hypothesis(&[eq_true]);
        let result = s.solve(|| false).unwrap();
        assert_eq!(result, SolveResult::Sat);
        let av = s.term_value(a).and_then(|v| if let Value::Semantic(x) = v { Some(*x) } else { None });
        let bv = s.term_value(b).and_then(|v| if let Value::Semantic(x) = v { Some(*x) } else { None });
        assert_eq!(av, bv);
    }
}

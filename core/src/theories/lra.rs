//! Linear real arithmetic over fixed-point `i64` leaves (`spec.md` §2's second bundled theory):
//! flat linear sums compared against a bound. Terms are kept flat (`spec.md` excludes "the specific
//! theory plugins' internal decision procedures" from scope, and a naive nested-expression tree
//! would need `Plugin::eval` to recurse through derived, never-assigned compound terms — the core's
//! narrow `Actions` interface only resolves subterms that are actually on the trail). Flattening at
//! construction time, the way the teacher's [`model::lang::linear::LinearSum`] represents sums,
//! sidesteps that recursion entirely: a `Leq` term's only subterms are its leaf variables.
//!
//! Grounded on `examples/plaans-aries/model/src/lang/linear.rs`'s `LinearSum`/`IAtomScaled` shape,
//! re-expressed against this core's `Plugin`/`SortOps` contract.

use crate::actions::Actions;
use crate::driver::Solver;
use crate::ids::{PluginId, TermId};
use crate::plugin::{Plugin, SortOps, WatchResult};
use crate::term::{Sort, TermView, Value};
use crate::var::DecideState;
use std::cell::RefCell;
use std::collections::HashMap;

const TAG_VAR: u16 = 0;
const TAG_LEQ: u16 = 1;
pub const SORT_REAL: u16 = 0;

/// One `factor * var` summand of a [`LinearSum`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ScaledVar {
    pub factor: i64,
    pub var: TermId,
}

/// A flat sum `c_0*x_0 + c_1*x_1 + ... `, the teacher's `LinearSum` generalised to this core's
/// `TermId` leaves instead of the teacher's `IAtom`.
#[derive(Clone, PartialEq, Eq)]
pub struct LinearSum {
    pub terms: Vec<ScaledVar>,
}

impl LinearSum {
    pub fn single(var: TermId) -> Self {
        LinearSum {
            terms: vec![ScaledVar { factor: 1, var }],
        }
    }
}

struct VarPayload;
struct LeqPayload { sum: LinearSum, bound: i64 }

fn sum_value(sum: &LinearSum, value_of: impl Fn(TermId) -> Option<i64>) -> Option<i64> {
    let mut total: i64 = 0;
    for sv in &sum.terms {
        total += sv.factor * value_of(sv.var)?;
    }
    Some(total)
}

/// A leaf real variable's decide state. Unused by `decide` itself (dispatch goes through the sort's
/// `SortOps`, keyed by sort rather than by term — see [`LraPlugin::decide`]), but still installed by
/// `register_semantic_var` per `spec.md` §3's `Var::Semantic{decide_state}`.
struct RealVarState;

/// Per-variable candidate counters, stepping `0, 1, -1, 2, -2, ...` on each `decide` so a
/// deterministic decision always proposes a value not already tried for that variable, guaranteeing
/// search progress across repeated conflict/backtrack/re-decide on a toy, incomplete decision
/// procedure (`spec.md` §1 excludes the internal decision procedure's completeness from scope; this
/// plugin only has to *terminate*, not *decide* optimally).
fn next_candidate(step: i64) -> i64 {
    if step % 2 == 0 {
        step / 2
    } else {
        -(step / 2) - 1
    }
}

pub struct LraPlugin {
    leqs: HashMap<TermId, (LinearSum, i64)>,
    decision_steps: RefCell<HashMap<TermId, i64>>,
}

impl LraPlugin {
    pub fn new() -> Self {
        LraPlugin {
            leqs: HashMap::new(),
            decision_steps: RefCell::new(HashMap::new()),
        }
    }

    /// A fresh real-sorted leaf variable, identified by `external_id`.
    pub fn mk_var(solver: &mut Solver, plugin: PluginId, _external_id: u32) -> TermId {
        solver.mk_term(plugin, TermView::new(TAG_VAR, VarPayload), Sort::Plugin(plugin, SORT_REAL))
    }

    /// `sum <= bound`, a boolean term.
    pub fn mk_leq(solver: &mut Solver, plugin: PluginId, sum: LinearSum, bound: i64) -> TermId {
        solver.mk_term(plugin, TermView::new(TAG_LEQ, LeqPayload { sum, bound }), Sort::Bool)
    }
}

impl Default for LraPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for LraPlugin {
    fn name(&self) -> &str {
        "lra"
    }

    fn init(&mut self, actions: &mut dyn Actions, term: TermId, view: &TermView) {
        match view.tag {
            TAG_VAR => actions.register_semantic_var(term),
            TAG_LEQ => {
                let LeqPayload { sum, bound } = view.downcast_ref::<LeqPayload>().unwrap();
                for sv in &sum.terms {
                    actions.watch(term, sv.var);
                }
                self.leqs.insert(term, (sum.clone(), *bound));
            }
            _ => unreachable!(),
        }
    }

    fn update_watches(&mut self, actions: &mut dyn Actions, term: TermId, _watch: TermId) -> WatchResult {
        let Some((sum, bound)) = self.leqs.get(&term).cloned() else {
            return WatchResult::Keep;
        };
        if actions.value_of(term).is_some() {
            return WatchResult::Keep;
        }
        let assigned: Vec<TermId> = sum.terms.iter().map(|sv| sv.var).collect();
        let value_of = |v: TermId| match actions.value_of(v) {
            Some(Value::Semantic(x)) => Some(x),
            _ => None,
        };
        if let Some(total) = sum_value(&sum, value_of) {
            actions.propagate_bool_eval(term, total <= bound, assigned);
        }
        WatchResult::Keep
    }

    fn delete(&mut self, term: TermId) {
        self.leqs.remove(&term);
    }

    fn subterms(&self, view: &TermView) -> Vec<TermId> {
        match view.downcast_ref::<LeqPayload>() {
            Some(LeqPayload { sum, .. }) => sum.terms.iter().map(|sv| sv.var).collect(),
            None => vec![],
        }
    }

    fn eval(&self, view: &TermView, sub_value: &dyn Fn(TermId) -> Option<Value>) -> Option<Value> {
        let LeqPayload { sum, bound } = view.downcast_ref::<LeqPayload>()?;
        let total = sum_value(sum, |v| match sub_value(v) {
            Some(Value::Semantic(x)) => Some(x),
            _ => None,
        })?;
        Some(Value::Bool(total <= *bound))
    }

    fn hash_view(&self, view: &TermView) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut h = std::collections::hash_map::DefaultHasher::new();
        view.tag.hash(&mut h);
        match view.tag {
            TAG_VAR => {}
            TAG_LEQ => {
                let LeqPayload { sum, bound } = view.downcast_ref::<LeqPayload>().unwrap();
                bound.hash(&mut h);
                for sv in &sum.terms {
                    sv.factor.hash(&mut h);
                    sv.var.to_u32().hash(&mut h);
                }
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
            TAG_VAR => false,
            TAG_LEQ => {
                let la = a.downcast_ref::<LeqPayload>().unwrap();
                let lb = b.downcast_ref::<LeqPayload>().unwrap();
                la.bound == lb.bound && la.sum == lb.sum
            }
            _ => false,
        }
    }
}

impl SortOps for LraPlugin {
    fn decide(&self, _actions: &mut dyn Actions, term: TermId) -> Value {
        let mut steps = self.decision_steps.borrow_mut();
        let step = steps.entry(term).or_insert(0);
        let value = next_candidate(*step);
        *step += 1;
        Value::Semantic(value)
    }

    fn eq(&self, a: &Value, b: &Value) -> bool {
        matches!((a, b), (Value::Semantic(x), Value::Semantic(y)) if x == y)
    }

    fn mk_state(&self, _term: TermId) -> Box<dyn DecideState> {
        Box::new(RealVarState)
    }

    fn print(&self, value: &Value) -> String {
        match value {
            Value::Semantic(v) => format!("{v}"),
            Value::Bool(b) => format!("{b}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SolveResult;

    #[test]
    fn leq_evaluates_once_both_variables_are_assigned() {
        let mut s = Solver::new();
        let p = s.register_plugin(Box::new(LraPlugin::new()));
        s.register_sort(p, SORT_REAL, Box::new(LraPlugin::new()));
        let x = LraPlugin::mk_var(&mut s, p, 0);
        let y = LraPlugin::mk_var(&mut s, p, 1);
        let sum = LinearSum {
            terms: vec![ScaledVar { factor: 1, var: x }, ScaledVar { factor: -1, var: y }],
        };
        let leq = LraPlugin::mk_leq(&mut s, p, sum, 0);
        let leq_true = s.atom_of(leq, true);
        s.add_hypothesis(&[leq_true]);
        let result = s.solve(|| false).unwrap();
        assert_eq!(result, SolveResult::Sat);
        assert_eq!(s.term_value(leq).and_then(|v| v.as_bool()), Some(true));
    }
}

//! A minimal "pure propositional logic" theory (`spec.md` §2's fourth bundled theory): structured
//! `And`/`Or` connectives over plain boolean atoms, wired onto the generalised-watch mechanism
//! exactly as a richer theory would be (`spec.md` §4.3). Every connective is itself a boolean term
//! (and so already gets its core-allocated atom pair, per `spec.md` §3); this plugin only adds the
//! bidirectional propagation between a connective and its children.
//!
//! Grounded on the shape of the teacher's `reasoners::tautologies::Tautologies` (a small, focused
//! reasoner that only ever asserts literals, never decides) generalised to bidirectional
//! implication rather than one-way assertion.

use crate::actions::Actions;
use crate::driver::Solver;
use crate::ids::{PluginId, TermId};
use crate::plugin::{Plugin, WatchResult};
use crate::term::{Sort, TermView, Value};
use std::collections::HashMap;

const TAG_VAR: u16 = 0;
const TAG_AND: u16 = 1;
const TAG_OR: u16 = 2;

struct VarPayload(u32);
struct ConnPayload(Vec<TermId>);

fn connective_value(tag: u16, child_values: &[Option<bool>]) -> Option<bool> {
    match tag {
        TAG_AND => {
            if child_values.iter().any(|v| *v == Some(false)) {
                Some(false)
            } else if child_values.iter().all(|v| *v == Some(true)) {
                Some(true)
            } else {
                None
            }
        }
        TAG_OR => {
            if child_values.iter().any(|v| *v == Some(true)) {
                Some(true)
            } else if child_values.iter().all(|v| *v == Some(false)) {
                Some(false)
            } else {
                None
            }
        }
        _ => unreachable!("not a connective tag"),
    }
}

/// Structured boolean connectives (`And`, `Or`) over plain propositional atoms (`Var`).
#[derive(Default)]
pub struct BoolPlugin {
    /// Each connective's shape, recorded at `init` since `update_watches` only receives term ids,
    /// not views (`spec.md` §4.3: the core's side of the contract never exposes payloads outside
    /// `init`/`eval`/`subterms`).
    conns: HashMap<TermId, (u16, Vec<TermId>)>,
}

impl BoolPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh propositional atom with no internal structure, identified by `external_id` (e.g. a
    /// DIMACS variable number): two distinct `external_id`s always yield distinct terms.
    pub fn mk_var(solver: &mut Solver, plugin: PluginId, external_id: u32) -> TermId {
        solver.mk_term(plugin, TermView::new(TAG_VAR, VarPayload(external_id)), Sort::Bool)
    }

    pub fn mk_and(solver: &mut Solver, plugin: PluginId, children: Vec<TermId>) -> TermId {
        solver.mk_term(plugin, TermView::new(TAG_AND, ConnPayload(children)), Sort::Bool)
    }

    pub fn mk_or(solver: &mut Solver, plugin: PluginId, children: Vec<TermId>) -> TermId {
        solver.mk_term(plugin, TermView::new(TAG_OR, ConnPayload(children)), Sort::Bool)
    }
}

impl Plugin for BoolPlugin {
    fn name(&self) -> &str {
        "bool"
    }

    fn init(&mut self, actions: &mut dyn Actions, term: TermId, view: &TermView) {
        if let Some(ConnPayload(children)) = view.downcast_ref::<ConnPayload>() {
            for &c in children {
                actions.watch(term, c);
            }
            self.conns.insert(term, (view.tag, children.clone()));
        }
    }

    fn update_watches(&mut self, actions: &mut dyn Actions, term: TermId, _watch: TermId) -> WatchResult {
        let Some((tag, children)) = self.conns.get(&term).cloned() else {
            return WatchResult::Keep;
        };
        let child_values: Vec<Option<bool>> = children
            .iter()
            .map(|&c| actions.value_of(c).and_then(|v| v.as_bool()))
            .collect();
        let term_value = actions.value_of(term).and_then(|v| v.as_bool());

        match term_value {
            None => {
                if let Some(value) = connective_value(tag, &child_values) {
                    actions.propagate_bool_eval(term, value, children);
                }
            }
            Some(parent_value) => {
                // Downward propagation: a decided/propagated connective forces unassigned
                // children once it can only be true/false by all-or-none of them.
                let forced_child_value = match tag {
                    TAG_AND if parent_value => Some(true),
                    TAG_OR if !parent_value => Some(false),
                    _ => None,
                };
                if let Some(forced) = forced_child_value {
                    for (&c, v) in children.iter().zip(&child_values) {
                        if v.is_none() {
                            actions.propagate_bool_eval(c, forced, vec![term]);
                        }
                    }
                }
            }
        }
        WatchResult::Keep
    }

    fn delete(&mut self, term: TermId) {
        self.conns.remove(&term);
    }

    fn subterms(&self, view: &TermView) -> Vec<TermId> {
        match view.downcast_ref::<ConnPayload>() {
            Some(ConnPayload(children)) => children.clone(),
            None => vec![],
        }
    }

    fn eval(&self, view: &TermView, sub_value: &dyn Fn(TermId) -> Option<Value>) -> Option<Value> {
        let ConnPayload(children) = view.downcast_ref::<ConnPayload>()?;
        let child_values: Vec<Option<bool>> = children.iter().map(|&c| sub_value(c).and_then(|v| v.as_bool())).collect();
        connective_value(view.tag, &child_values).map(Value::Bool)
    }

    fn hash_view(&self, view: &TermView) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        view.tag.hash(&mut hasher);
        match view.tag {
            TAG_VAR => view.downcast_ref::<VarPayload>().unwrap().0.hash(&mut hasher),
            TAG_AND | TAG_OR => {
                for c in &view.downcast_ref::<ConnPayload>().unwrap().0 {
                    c.to_u32().hash(&mut hasher);
                }
            }
            _ => unreachable!(),
        }
        hasher.finish()
    }

    fn view_eq(&self, a: &TermView, b: &TermView) -> bool {
        if a.tag != b.tag {
            return false;
        }
        match a.tag {
            TAG_VAR => a.downcast_ref::<VarPayload>().unwrap().0 == b.downcast_ref::<VarPayload>().unwrap().0,
            TAG_AND | TAG_OR => a.downcast_ref::<ConnPayload>().unwrap().0 == b.downcast_ref::<ConnPayload>().unwrap().0,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SolveResult;

    #[test]
    fn and_of_two_true_vars_evaluates_true() {
        let mut s = Solver::new();
        let p = s.register_plugin(Box::new(BoolPlugin::new()));
        let a = BoolPlugin::mk_var(&mut s, p, 0);
        let b = BoolPlugin::mk_var(&mut s, p, 1);
        let conj = BoolPlugin::mk_and(&mut s, p, vec![a, b]);
        let a_true = s.atom_of(a, true);
        let b_true = s.atom_of(b, true);
        s.add_hypothesis(&[a_true]);
        s.add_hypothesis(&[b_true]);
        let result = s.solve(|| false).unwrap();
        assert_eq!(result, SolveResult::Sat);
        assert_eq!(s.term_value(conj).and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn or_forces_the_other_child_when_one_is_false() {
        let mut s = Solver::new();
        let p = s.register_plugin(Box::new(BoolPlugin::new()));
        let a = BoolPlugin::mk_var(&mut s, p, 0);
        let b = BoolPlugin::mk_var(&mut s, p, 1);
        let disj = BoolPlugin::mk_or(&mut s, p, vec![a, b]);
        let disj_true = s.atom_of(disj, true);
        let a_false = s.atom_of(a, false);
        s.add_hypothesis(&[disj_true]);
        s.add_hypothesis(&[a_false]);
        let result = s.solve(|| false).unwrap();
        assert_eq!(result, SolveResult::Sat);
        assert_eq!(s.term_value(b).and_then(|v| v.as_bool()), Some(true));
    }
}

//! The activity-driven decision heuristic (`spec.md` §4.6): a binary max-heap over terms keyed by
//! activity, decay-growing activity bumps, phase saving, and dispatch to a semantic sort's
//! `decide` for non-boolean terms.

use crate::driver::Solver;
use crate::ids::TermId;
use crate::term::{Reason, Value};
use env_param::EnvParam;

pub static ACTIVITY_RESCALE_THRESHOLD: EnvParam<f64> = EnvParam::new("MCSAT_ACTIVITY_RESCALE_THRESHOLD", "1e100");

impl Solver {
    /// Declares `term` to the decision heap and immediately enqueues it as a decision candidate.
    /// Called once, when the term is first registered (`spec.md` §3's lifecycle: "added to the
    /// decision heap").
    pub fn declare_decidable(&mut self, term: TermId) {
        if !self.heap.is_declared(term) {
            self.heap.declare_element(term, 0.0);
        }
        if !self.heap.is_enqueued(term) {
            self.heap.enqueue(term);
        }
    }

    /// Bumps `term`'s activity by the current (decay-growing) increment, rescaling every
    /// activity and the increment if it would overflow the threshold (`spec.md` §4.6).
    pub fn bump_activity(&mut self, term: TermId) {
        let new_activity = self.registry.terms[term].activity + self.activity_inc;
        self.registry.terms[term].activity = new_activity;
        if self.heap.is_declared(term) {
            self.heap.set_priority(term, new_activity);
        }
        if new_activity > ACTIVITY_RESCALE_THRESHOLD.get() {
            let inv = 1.0 / ACTIVITY_RESCALE_THRESHOLD.get();
            let n = self.registry.terms.len();
            for i in 0..n {
                self.registry.terms[TermId::from(i)].activity *= inv;
            }
            self.heap.change_all_priorities_in_place(|p| *p *= inv);
            self.activity_inc *= inv;
        }
        self.activity_inc /= crate::driver::ACTIVITY_DECAY.get();
    }

    /// Bumps a clause's activity on involvement in conflict analysis (`spec.md` §4.7).
    pub fn bump_clause_activity(&mut self, clause: crate::ids::ClauseId) {
        self.clauses.get_mut(clause).activity += self.clause_activity_inc;
        self.clause_activity_inc /= crate::driver::CLAUSE_ACTIVITY_DECAY.get();
    }

    /// The next unassigned decidable term, highest activity first, or `None` if every decidable
    /// term is assigned (i.e. the instance is satisfiable under the current trail).
    pub fn next_unassigned_term(&mut self) -> Option<TermId> {
        while let Some(&top) = self.heap.peek() {
            if self.registry.terms[top].is_assigned() {
                self.heap.pop();
                continue;
            }
            return Some(top);
        }
        None
    }

    /// Decides `term` (`spec.md` §4.6): if boolean, picks a polarity (phase-saved, defaulting to
    /// false) and asserts it with reason `Decision`; if semantic, dispatches to the owning sort's
    /// `decide`.
    pub fn decide(&mut self, term: TermId) {
        self.heap.pop();
        self.trail.save_state();
        let is_bool = self.registry.terms[term].var.is_bool();
        if is_bool {
            let polarity = self.phase_saving.get(term).copied().unwrap_or(false);
            self.assign_term(term, Value::Bool(polarity), Reason::Decision);
            tracing::trace!(?term, polarity, "decision");
        } else {
            let sort = self.registry.terms[term].sort;
            let (plugin, sort_index) = match sort {
                crate::term::Sort::Plugin(p, s) => (p, s),
                crate::term::Sort::Bool => unreachable!("boolean terms are never semantic variables"),
            };
            let ops = self.registry.take_sort_ops(plugin, sort_index);
            let value = {
                let mut actions = crate::propagate::DriverActions::new(self);
                ops.decide(&mut actions, term)
            };
            self.registry.restore_sort_ops(plugin, sort_index, ops);
            self.assign_term(term, value, Reason::Decision);
            tracing::trace!(?term, "semantic decision");
        }
    }
}

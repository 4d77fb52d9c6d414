//! The propagation fixpoint (`spec.md` §4.3): dequeues newly-assigned terms, running boolean BCP
//! first and then dispatching generalised watch callbacks, until the queue drains or a conflict is
//! raised. Also hosts [`DriverActions`], the concrete `Actions` the driver hands to plugins.

use crate::actions::{Actions, LemmaPayload};
use crate::backtrack::DecLvl;
use crate::clause::Premise;
use crate::driver::Solver;
use crate::ids::{AtomId, ClauseId, TermId};
use crate::term::{Reason, Value};
use crate::watch::WatchOutcome;

/// The concrete [`Actions`] implementation handed to plugins during `init`, `update_watches`, and
/// `decide` (`spec.md` §4.5). Plugin effects recorded here are applied to `solver` immediately:
/// there is no batching, since the core is single-threaded and non-reentrant (`spec.md` §5).
pub struct DriverActions<'s> {
    pub(crate) solver: &'s mut Solver,
}

impl<'s> DriverActions<'s> {
    pub fn new(solver: &'s mut Solver) -> Self {
        DriverActions { solver }
    }

    /// Builds and raises, as the pending conflict, the clause that a `propagate_bool_eval(t, b,
    /// subs)` call would have justified `t=b` with, used when `t` is already assigned to `!b`
    /// (`spec.md` §7 kind 3).
    fn raise_eval_conflict(&mut self, t: TermId, b: bool, subs: &[TermId]) {
        let mut atoms: Vec<AtomId> = subs
            .iter()
            .filter_map(|&s| {
                self.solver
                    .term_value(s)
                    .and_then(|v| v.as_bool())
                    .map(|sb| self.solver.bool_atom(s, sb).negate())
            })
            .collect();
        atoms.push(self.solver.bool_atom(t, b));
        let clause = self.solver.mk_clause(&atoms, Premise::Lemma(Box::new(())));
        self.solver.attach(clause);
        self.solver.pending_conflict = Some(clause);
    }
}

impl<'s> Actions for DriverActions<'s> {
    fn push_clause(&mut self, atoms: &[AtomId]) {
        let id = self.solver.mk_clause(atoms, Premise::Hyp);
        self.solver.attach(id);
    }

    fn propagate_bool_eval(&mut self, t: TermId, b: bool, subs: Vec<TermId>) {
        if let Some(existing) = self.solver.term_value(t).and_then(|v| v.as_bool()) {
            if existing != b {
                // Plugin misuse (`spec.md` §7 kind 3): `t` is already assigned to `!b`. Rather than
                // asserting the contradictory value, synthesise the clause this eval would have
                // justified and raise it as the conflict directly — every literal in it is false
                // under the current trail (`subs`' values negated, plus `t`'s now-false atom).
                self.raise_eval_conflict(t, b, &subs);
            }
            return;
        }
        self.solver.assign_term(t, Value::Bool(b), Reason::Eval(subs));
    }

    fn propagate_bool_lemma(&mut self, t: TermId, b: bool, others: Vec<AtomId>, lemma: LemmaPayload) {
        let atom = self.solver.bool_atom(t, b);
        if let Some(existing) = self.solver.term_value(t).and_then(|v| v.as_bool()) {
            if existing != b {
                // Same plugin-misuse conversion as `propagate_bool_eval`, but `others ∨ atom` was
                // already the clause we were about to justify the assertion with; it is now itself
                // the conflict, since `atom` is false under the current trail too.
                let mut atoms = others;
                atoms.push(atom);
                let clause = self.solver.mk_clause(&atoms, Premise::Lemma(lemma));
                self.solver.attach(clause);
                self.solver.pending_conflict = Some(clause);
            }
            return;
        }
        let mut atoms = others;
        atoms.push(atom);
        let clause = self.solver.mk_clause(&atoms, Premise::Lemma(lemma));
        self.solver.attach(clause);
        self.solver.assign_term(t, Value::Bool(b), Reason::Bcp(clause));
    }

    fn raise_conflict(&mut self, atoms: Vec<AtomId>, lemma: Option<LemmaPayload>) {
        let premise = match lemma {
            Some(l) => Premise::Lemma(l),
            None => Premise::Hyp,
        };
        let clause = self.solver.mk_clause(&atoms, premise);
        self.solver.pending_conflict = Some(clause);
    }

    fn on_backtrack(&mut self, f: Box<dyn FnOnce()>) {
        let level = self.solver.current_level();
        self.solver.hooks.push(crate::driver::BacktrackHook { level, f });
    }

    fn current_level(&self) -> DecLvl {
        self.solver.current_level()
    }

    fn register_semantic_var(&mut self, term: TermId) {
        let sort = self.solver.registry.terms[term].sort;
        let (plugin, sort_index) = match sort {
            crate::term::Sort::Plugin(p, s) => (p, s),
            crate::term::Sort::Bool => panic!("register_semantic_var called on a boolean term"),
        };
        let ops = self.solver.registry.take_sort_ops(plugin, sort_index);
        let state = ops.mk_state(term);
        self.solver.registry.restore_sort_ops(plugin, sort_index, ops);
        self.solver.registry.terms[term].var = crate::var::Var::Semantic { decide_state: state };
        self.solver.declare_decidable(term);
    }

    fn value_of(&self, term: TermId) -> Option<Value> {
        self.solver.term_value(term).copied()
    }

    fn watch(&mut self, watcher: TermId, watched: TermId) {
        self.solver.term_watches.register(watcher, watched);
    }
}

impl Solver {
    /// The atom of boolean term `t` with polarity `b`.
    pub(crate) fn bool_atom(&self, t: TermId, b: bool) -> AtomId {
        match self.registry.terms[t].var.atoms() {
            Some((pos, neg)) => {
                if b {
                    pos
                } else {
                    neg
                }
            }
            None => panic!("term is not a boolean variable"),
        }
    }

    /// Runs the propagation fixpoint (`spec.md` §4.3). Returns `Ok(())` once the queue drains with
    /// no conflict, or `Err(conflict_clause)` the moment one is raised.
    pub fn propagate(&mut self) -> Result<(), ClauseId> {
        loop {
            if let Some(c) = self.pending_conflict.take() {
                return Err(c);
            }
            let Some(term) = self.queue.pop_front() else {
                return Ok(());
            };
            if self.registry.terms[term].var.is_bool() {
                if let Err(c) = self.propagate_boolean(term) {
                    return Err(c);
                }
            }
            if let Err(c) = self.run_generalised_watches(term) {
                return Err(c);
            }
        }
    }

    /// Boolean constraint propagation for a term that just became assigned: walks the watch list
    /// of the now-false atom (`spec.md` §4.3).
    fn propagate_boolean(&mut self, term: TermId) -> Result<(), ClauseId> {
        let value = match self.term_value(term) {
            Some(Value::Bool(b)) => *b,
            _ => return Ok(()),
        };
        let (pos, neg) = self.registry.terms[term].var.atoms().expect("boolean term has no atoms");
        let false_atom = if value { neg } else { pos };
        let watchers = std::mem::take(&mut self.registry.atoms[false_atom].watched_by);
        let mut still_watching = Vec::with_capacity(watchers.len());
        let mut conflict = None;
        for clause in watchers {
            if conflict.is_some() {
                still_watching.push(clause);
                continue;
            }
            if !self.clauses.get(clause).flags.attached() {
                continue;
            }
            let registry = &self.registry;
            let outcome = crate::watch::rewatch(&mut self.clauses, clause, false_atom, |a| {
                let t = registry.atoms[a].term;
                crate::watch::atom_value(&registry.atoms[a], registry.terms[t].assignment.as_ref().map(|x| &x.value))
            });
            match outcome {
                WatchOutcome::Satisfied => still_watching.push(clause),
                WatchOutcome::Moved(new_watch) => {
                    self.registry.atoms[new_watch].add_watcher(clause);
                }
                WatchOutcome::Unit(other, c) => {
                    still_watching.push(clause);
                    let t = self.registry.atoms[other].term;
                    let b = other.is_positive();
                    self.assign_term(t, Value::Bool(b), Reason::Bcp(c));
                }
                WatchOutcome::Conflict(c) => {
                    still_watching.push(clause);
                    conflict = Some(c);
                }
            }
        }
        self.registry.atoms[false_atom].watched_by = still_watching;
        match conflict {
            Some(c) => Err(c),
            None => Ok(()),
        }
    }

    /// Dispatches generalised watch callbacks for `term` becoming assigned (`spec.md` §4.3's
    /// "generalised watches").
    fn run_generalised_watches(&mut self, term: TermId) -> Result<(), ClauseId> {
        let watchers = self.term_watches.watchers_of(term).to_vec();
        for watcher in watchers {
            let plugin = watcher.plugin();
            let mut actions = DriverActions::new(self);
            let mut plugin_box = {
                let idx = plugin.to_u8() as usize;
                std::mem::replace(&mut actions.solver.registry.plugins_mut()[idx], crate::plugin::NullPlugin::boxed())
            };
            let result = plugin_box.update_watches(&mut actions, watcher, term);
            actions.solver.registry.plugins_mut()[plugin.to_u8() as usize] = plugin_box;
            if let crate::plugin::WatchResult::Remove = result {
                self.term_watches.unregister(watcher, term);
            }
            if let Some(c) = self.pending_conflict.take() {
                return Err(c);
            }
        }
        Ok(())
    }
}

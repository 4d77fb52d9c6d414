//! The narrow interface through which plugins affect the solver (`spec.md` §4.5). Plugins never
//! mutate the trail, watch vectors, or clause database directly; every effect is mediated here, so
//! the core retains sole authority over what actually lands on the trail.

use crate::backtrack::DecLvl;
use crate::ids::{AtomId, TermId};

/// A theory tautology justifying a `propagate_bool_lemma` assertion, or a `raise_conflict` call:
/// an opaque proof object the owning plugin alone interprets when building the resolution proof
/// (`spec.md` §4.4: "plugins supply the `Lemma` payload").
pub type LemmaPayload = Box<dyn std::any::Any + Send + Sync>;

pub trait Actions {
    /// Adds a permanent clause, not erased on backtrack (`spec.md` §4.5).
    fn push_clause(&mut self, atoms: &[AtomId]);

    /// Asserts `t`'s boolean atom with polarity `b`, justified by the current values of `subs`
    /// (`spec.md` §4.5). `t` must be a boolean term.
    fn propagate_bool_eval(&mut self, t: TermId, b: bool, subs: Vec<TermId>);

    /// Asserts `t`'s boolean atom with polarity `b`, justified by the theory tautology
    /// `others ∨ (t=b)`, where every atom in `others` must currently be false (`spec.md` §4.5).
    fn propagate_bool_lemma(&mut self, t: TermId, b: bool, others: Vec<AtomId>, lemma: LemmaPayload);

    /// Raises a conflict over `atoms`, which must all currently be false (`spec.md` §4.5).
    fn raise_conflict(&mut self, atoms: Vec<AtomId>, lemma: Option<LemmaPayload>);

    /// Schedules `f` to run the next time the trail backtracks past the current level
    /// (`spec.md` §4.5). Hooks registered at the same level fire in LIFO order (`spec.md` §5).
    fn on_backtrack(&mut self, f: Box<dyn FnOnce()>);

    /// The current decision level (read-only).
    fn current_level(&self) -> DecLvl;

    /// Marks a freshly-created semantic (plugin-sort) term as an actual decision variable: fetches
    /// its sort's initial `decide_state` and adds it to the decision heap (`spec.md` §3's `Var`:
    /// "`SemanticVar{decide_state}`... `None` (term not yet registered for decision)"). A plugin
    /// calls this from `init` for the leaf variables of its theory, but not for purely derived/
    /// evaluable compound terms, which are left `Var::None` and only ever reached through `eval`.
    fn register_semantic_var(&mut self, term: TermId);

    /// The current value of `term`, if assigned — lets a plugin's `init`/`update_watches` read
    /// sibling subterms without needing a `&Solver` (`spec.md` §4.5's narrow action interface).
    fn value_of(&self, term: TermId) -> Option<crate::term::Value>;

    /// Registers a generalised watch (`spec.md` §4.3): `watcher` asks to be notified, via its
    /// owning plugin's `update_watches`, whenever `watched` becomes assigned.
    fn watch(&mut self, watcher: TermId, watched: TermId);
}

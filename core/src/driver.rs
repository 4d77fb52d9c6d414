//! The solver driver (`spec.md` §4 overview): owns every arena and piece of mutable state, and
//! implements the top-level decide/propagate/analyze/backtrack/learn/restart loop. Everything
//! else in this crate is either data this struct owns (`term`, `clause`, `atom`) or a method on it
//! defined in a sibling module (`propagate`, `conflict`, `decision`, `restart`, `reduce`).

use crate::atom::Atom;
use crate::backtrack::{DecLvl, Trail};
use crate::clause::{Clause, Clauses, Premise};
use crate::collections::heap::IdxHeap;
use crate::collections::ref_store::RefVec;
use crate::error::SolverError;
use crate::ids::{AtomId, ClauseId, TermId};
use crate::plugin::PluginRegistry;
use crate::term::{Reason, Value};
use crate::watch::TermWatches;
use env_param::EnvParam;
use std::collections::VecDeque;

pub static RESTART_BASE: EnvParam<u64> = EnvParam::new("MCSAT_RESTART_BASE", "100");
pub static CLAUSE_DB_GROWTH: EnvParam<f64> = EnvParam::new("MCSAT_CLAUSE_DB_GROWTH", "1.5");
pub static ACTIVITY_DECAY: EnvParam<f64> = EnvParam::new("MCSAT_ACTIVITY_DECAY", "0.95");
pub static CLAUSE_ACTIVITY_DECAY: EnvParam<f64> = EnvParam::new("MCSAT_CLAUSE_ACTIVITY_DECAY", "0.999");
pub static LOCKED_LBD_LEVEL: EnvParam<u32> = EnvParam::new("MCSAT_LOCKED_LBD_LEVEL", "4");

/// One entry of the trail: the term that was assigned, in assignment order (`spec.md` §4.2).
pub type TrailEvent = TermId;

/// The outcome of a completed or interrupted search (`spec.md` §1, §7). Unsatisfiability is not a
/// variant here: per `spec.md` §7 kind 1, a level-0 conflict is reported through
/// [`SolverError::UnsatAtLevelZero`] instead, carrying the final conflict clause the caller needs
/// to walk the proof — `solve` only returns `Ok` once it has a model or gives up.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveResult {
    Sat,
    Unknown,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Phase {
    Idle,
    Solving,
    Sat,
    Unsat,
}

/// A backtrack hook registered via `Actions::on_backtrack`, fired in LIFO order when the trail
/// backtracks past `level` (`spec.md` §4.5, §5).
pub(crate) struct BacktrackHook {
    pub(crate) level: DecLvl,
    pub(crate) f: Box<dyn FnOnce()>,
}

/// The solver driver: an MCSat-style search over a single trail shared by boolean atoms and theory
/// terms (`spec.md` §1).
pub struct Solver {
    pub(crate) registry: PluginRegistry,
    pub(crate) clauses: Clauses,
    pub(crate) trail: Trail<TrailEvent>,
    pub(crate) term_watches: TermWatches,
    pub(crate) queue: VecDeque<TermId>,
    pub(crate) heap: IdxHeap<TermId, f64>,
    pub(crate) activity_inc: f64,
    pub(crate) clause_activity_inc: f64,
    pub(crate) hooks: Vec<BacktrackHook>,
    pub(crate) phase_saving: crate::collections::ref_store::RefMap<TermId, bool>,
    phase: Phase,
    conflicts_since_restart: u64,
    restart_count: u64,
    learned_since_reduction: u64,
    next_reduction_threshold: f64,
    /// Hypothesis clauses pushed so far, tracked so `solve` can check them against the model for
    /// the soundness law in `spec.md` §8, and so assumptions can be popped back off.
    pub(crate) hypotheses: Vec<ClauseId>,
    /// Clauses learned by conflict analysis, the population clause-DB reduction sweeps
    /// (`spec.md` §4.7).
    pub(crate) learned_clauses: Vec<ClauseId>,
    /// Local assumptions currently active, most recent last (`spec.md` §9(a)).
    pub(crate) assumption_clauses: Vec<ClauseId>,
    /// A conflict raised by a plugin via `Actions::raise_conflict`, surfaced to `propagate` at the
    /// top of its loop (`spec.md` §4.5).
    pub(crate) pending_conflict: Option<ClauseId>,
}

impl Solver {
    pub fn new() -> Self {
        Solver {
            registry: PluginRegistry::new(),
            clauses: Clauses::new(),
            trail: Trail::new(),
            term_watches: TermWatches::new(),
            queue: VecDeque::new(),
            heap: IdxHeap::new(),
            activity_inc: 1.0,
            clause_activity_inc: 1.0,
            hooks: Vec::new(),
            phase_saving: Default::default(),
            phase: Phase::Idle,
            conflicts_since_restart: 0,
            restart_count: 0,
            learned_since_reduction: 0,
            next_reduction_threshold: 256.0,
            hypotheses: Vec::new(),
            learned_clauses: Vec::new(),
            assumption_clauses: Vec::new(),
            pending_conflict: None,
        }
    }

    pub fn current_level(&self) -> DecLvl {
        self.trail.current_decision_level()
    }

    /// Registers a theory plugin, returning the id it was assigned (`spec.md` §6: "register
    /// plugin").
    pub fn register_plugin(&mut self, plugin: Box<dyn crate::plugin::Plugin>) -> crate::ids::PluginId {
        self.registry.register_plugin(plugin)
    }

    /// Registers the operation table for a sort owned by `plugin` (`spec.md` §6's "A type (sort)
    /// additionally provides...").
    pub fn register_sort(&mut self, plugin: crate::ids::PluginId, sort_index: u16, ops: Box<dyn crate::plugin::SortOps>) {
        self.registry.register_sort(plugin, sort_index, ops)
    }

    pub fn atom(&self, id: AtomId) -> &Atom {
        &self.registry.atoms[id]
    }

    pub fn term_value(&self, term: TermId) -> Option<&Value> {
        self.registry.terms[term].assignment.as_ref().map(|a| &a.value)
    }

    pub fn atom_value(&self, atom: AtomId) -> Option<bool> {
        let term = self.registry.atoms[atom].term;
        crate::watch::atom_value(&self.registry.atoms[atom], self.term_value(term))
    }

    pub fn clause(&self, id: ClauseId) -> &Clause {
        self.clauses.get(id)
    }

    /// Every hypothesis pushed so far, in push order (`spec.md` §8's soundness law: a caller
    /// checking a `Sat` model against its own input needs this list back).
    pub fn hypotheses(&self) -> &[ClauseId] {
        &self.hypotheses
    }

    /// Registers a user hypothesis clause (`spec.md` §3 Premise::Hyp), attaching it immediately.
    /// Per `spec.md` §9 Open Question (a): hypotheses are always clauses; a single theory term can
    /// be asserted via [`Solver::add_unit_assumption`].
    pub fn add_hypothesis(&mut self, atoms: &[AtomId]) -> ClauseId {
        let id = self.mk_clause(atoms, Premise::Hyp);
        self.attach(id);
        self.force_unit(id);
        self.hypotheses.push(id);
        id
    }

    /// Convenience adaptor for callers that think in terms of a single theory term rather than a
    /// disjunction: asserts `atom` as a one-literal local assumption.
    pub fn add_unit_assumption(&mut self, atom: AtomId) -> ClauseId {
        self.push_assumption(&[atom])
    }

    /// Pushes a local assumption clause (`spec.md`'s `Local` premise), on top of the current
    /// assumption stack. Poppable with [`Solver::pop_assumption`].
    pub fn push_assumption(&mut self, atoms: &[AtomId]) -> ClauseId {
        let id = self.mk_clause(atoms, Premise::Local);
        self.attach(id);
        self.force_unit(id);
        self.assumption_clauses.push(id);
        id
    }

    /// Pops and detaches the most recently pushed local assumption.
    pub fn pop_assumption(&mut self) {
        if let Some(id) = self.assumption_clauses.pop() {
            self.detach(id);
        }
    }

    /// Hash-conses `view` into a term owned by `plugin` (`spec.md` §4.1's `mk_term`): returns the
    /// existing term if an equal view was already built, otherwise allocates one, registers its
    /// boolean atom pair if `sort` is `Bool`, and calls the owning plugin's `init`.
    ///
    /// `init` is called with the plugin temporarily removed from the registry and the new term's
    /// view temporarily moved out of the arena, so it can be handed a [`crate::propagate::DriverActions`]
    /// borrowing the whole solver (including the registry) without aliasing either the plugin or
    /// the view it is reading — the same disjoint-borrow trick `run_generalised_watches` uses for
    /// `update_watches`.
    pub fn mk_term(&mut self, plugin: crate::ids::PluginId, view: crate::term::TermView, sort: crate::term::Sort) -> TermId {
        let hash = self.registry.cons_hash(plugin, &view);
        if let Some(existing) = self.registry.cons_find(plugin, hash, &view) {
            return existing;
        }
        let id = self.registry.alloc_term(plugin, view, sort);
        self.registry.cons_insert(plugin, hash, id);
        if sort == crate::term::Sort::Bool {
            self.registry.mk_bool_atoms(id);
        }
        self.init_term(plugin, id);
        if sort == crate::term::Sort::Bool {
            self.declare_decidable(id);
        }
        id
    }

    fn init_term(&mut self, plugin: crate::ids::PluginId, id: TermId) {
        let idx = plugin.to_u8() as usize;
        let mut plugin_box = std::mem::replace(&mut self.registry.plugins_mut()[idx], crate::plugin::NullPlugin::boxed());
        let placeholder = crate::term::TermView::new(u16::MAX, ());
        let view_owned = std::mem::replace(&mut self.registry.terms[id].view, placeholder);
        {
            let mut actions = crate::propagate::DriverActions::new(self);
            plugin_box.init(&mut actions, id, &view_owned);
        }
        self.registry.terms[id].view = view_owned;
        self.registry.plugins_mut()[idx] = plugin_box;
    }

    /// The positive/negative atom of boolean term `t`, for callers (theory plugins, tests) that
    /// built `t` through [`Solver::mk_term`] with `Sort::Bool`.
    pub fn atom_of(&self, t: TermId, polarity: bool) -> AtomId {
        self.bool_atom(t, polarity)
    }

    pub(crate) fn mk_clause(&mut self, atoms: &[AtomId], premise: Premise) -> ClauseId {
        let atoms = match premise {
            // `Hyp`/`Local` atoms come straight from the caller and may repeat a literal (e.g. a
            // clause built by sampling variables with replacement); a duplicated literal must not
            // be allowed to land in the two watched slots, or `has_single_literal` would mistake
            // the clause for a unit and silently drop every other literal (`spec.md` §3 invariant 1).
            Premise::Simplify(_) | Premise::Hyp | Premise::Local => {
                let mut sorted = atoms.to_vec();
                sorted.sort_by_key(|a| a.local_index());
                sorted.dedup();
                sorted
            }
            _ => atoms.to_vec(),
        };
        self.clauses.push(&atoms, premise)
    }

    pub(crate) fn attach(&mut self, clause: ClauseId) {
        crate::watch::attach(&mut self.registry.atoms, &self.clauses, clause);
        self.clauses.get_mut(clause).flags.set_attached(true);
    }

    pub(crate) fn detach(&mut self, clause: ClauseId) {
        crate::watch::detach(&mut self.registry.atoms, &self.clauses, clause);
        self.clauses.get_mut(clause).flags.set_attached(false);
    }

    /// Forces a just-attached clause's sole literal the moment it has only one (`spec.md` §4.3: a
    /// unit clause has nothing else to wait on, so the two-watched-literal scheme alone would never
    /// wake it up). Raises a conflict immediately if the literal is already false.
    pub(crate) fn force_unit(&mut self, clause: ClauseId) {
        let c = self.clauses.get(clause);
        if !c.has_single_literal() {
            return;
        }
        let atom = c.watch1;
        let term = self.registry.atoms[atom].term;
        let polarity = atom.is_positive();
        match self.term_value(term).and_then(|v| v.as_bool()) {
            Some(existing) if existing != polarity => self.pending_conflict = Some(clause),
            Some(_) => {}
            None => self.assign_term(term, Value::Bool(polarity), Reason::Bcp(clause)),
        }
    }

    /// Undoes everything assigned past `level` (`spec.md` §4.2's `backtrack_to`): truncates the
    /// trail, clears each popped term's assignment, and runs every backtrack hook registered past
    /// `level`, in LIFO order (`spec.md` §5).
    pub fn backtrack_to(&mut self, level: DecLvl) {
        self.trail.restore(level.to_int(), |term| {
            self.registry.terms[term].assignment = None;
        });
        while let Some(last) = self.hooks.last() {
            if last.level > level {
                let hook = self.hooks.pop().unwrap();
                (hook.f)();
            } else {
                break;
            }
        }
        self.queue.clear();
    }

    /// Restarts to level 0 without discarding learned clauses (`spec.md` §4.7).
    pub fn restart(&mut self) {
        self.backtrack_to(DecLvl::ROOT);
        self.restart_count += 1;
        self.conflicts_since_restart = 0;
        tracing::debug!(restart_count = self.restart_count, "restart");
    }

    pub(crate) fn assign_term(&mut self, term: TermId, value: Value, reason: Reason) {
        let level = self.current_level();
        debug_assert!(
            self.registry.terms[term].assignment.is_none(),
            "term assigned twice without an intervening backtrack"
        );
        if let Value::Bool(b) = value {
            self.phase_saving.insert(term, b);
        }
        self.registry.terms[term].assignment = Some(crate::term::Assignment { value, level, reason });
        self.trail.push(term);
        self.queue.push_back(term);
    }

    /// The core entry point: runs the decide/propagate/analyze/backtrack loop until the instance
    /// is decided or `should_stop` reports the caller's deadline/interrupt flag tripped
    /// (`spec.md` §5, §7 kind 4).
    pub fn solve(&mut self, mut should_stop: impl FnMut() -> bool) -> Result<SolveResult, SolverError> {
        self.phase = Phase::Solving;
        loop {
            if should_stop() {
                return Ok(SolveResult::Unknown);
            }
            match self.propagate() {
                Ok(()) => {}
                Err(conflict_clause) => {
                    if self.current_level() == DecLvl::ROOT {
                        self.phase = Phase::Unsat;
                        let refutation = self.refute_at_root(conflict_clause);
                        return Err(SolverError::UnsatAtLevelZero(refutation));
                    }
                    let (mut learned_atoms, backtrack_level, steps, init) = self.analyze(conflict_clause);
                    self.backtrack_to(backtrack_level);
                    // `analyze` appends the asserting (UIP) literal last, but `Clauses::push` watches
                    // the first two atoms; the UIP literal is the only one left unassigned after the
                    // backtrack above, so it must be a watch or the clause would never fire its unit
                    // propagation (`spec.md` §3 invariant 2).
                    let last = learned_atoms.len() - 1;
                    learned_atoms.swap(0, last);
                    let learned = self.mk_clause(&learned_atoms, Premise::Steps { init, steps });
                    self.attach(learned);
                    if learned_atoms.len() == 1 {
                        self.force_unit(learned);
                    } else {
                        // The UIP literal (now at index 0) is the only literal left unassigned after
                        // the backtrack above; every other literal is false, so this clause is unit
                        // under the current trail and must fire now rather than wait for a watch it
                        // will never see flip (both of its watches were already assigned earlier).
                        let atom = learned_atoms[0];
                        let term = self.registry.atoms[atom].term;
                        if self.term_value(term).and_then(|v| v.as_bool()).is_none() {
                            let polarity = atom.is_positive();
                            self.assign_term(term, Value::Bool(polarity), Reason::Bcp(learned));
                        }
                    }
                    self.bump_clause_activity(learned);
                    self.learned_clauses.push(learned);
                    self.conflicts_since_restart += 1;
                    self.learned_since_reduction += 1;
                    if self.should_reduce() {
                        self.reduce();
                    }
                    if self.should_restart() {
                        self.restart();
                    }
                    continue;
                }
            }
            match self.next_unassigned_term() {
                None => {
                    self.phase = Phase::Sat;
                    return Ok(SolveResult::Sat);
                }
                Some(term) => {
                    self.decide(term);
                }
            }
        }
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

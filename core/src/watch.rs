//! The watch engine (`spec.md` §4.3): boolean two-watched-literal bookkeeping, plus the
//! generalised term-watches-term registry through which theories are woken up.

use crate::atom::Atom;
use crate::clause::Clauses;
use crate::ids::{AtomId, ClauseId, TermId};
use crate::term::Value;
use std::collections::HashMap;

/// The outcome of re-establishing a clause's watches after its currently-watched atom `a` became
/// false (`spec.md` §4.3).
pub enum WatchOutcome {
    /// The clause already had a true literal among its watches; nothing to do.
    Satisfied,
    /// A replacement watch was found; the clause moved to `new_watch`'s watch vector. The caller
    /// must remove `clause` from `false_atom`'s `watched_by` and add it to `new_watch`'s.
    Moved(AtomId),
    /// No replacement was found and the other watch is unassigned: propagate it with reason
    /// `Bcp(clause)`.
    Unit(AtomId, ClauseId),
    /// No replacement was found and the other watch is also false: conflict.
    Conflict(ClauseId),
}

/// Re-establishes watches for `clause` after atom `false_atom` (one of its two watched atoms) was
/// assigned false. `value_of` reads an atom's current truth value if assigned.
///
/// On `WatchOutcome::Moved`, the caller must remove `clause` from `false_atom`'s `watched_by` and
/// add it to the new watch's `watched_by` (the watch-list mutation itself is not done here, since
/// it requires mutable access to two `Atom`s at once while this function only borrows `clause`).
pub fn rewatch(
    clauses: &mut Clauses,
    clause: ClauseId,
    false_atom: AtomId,
    value_of: impl Fn(AtomId) -> Option<bool>,
) -> WatchOutcome {
    let c = clauses.get_mut(clause);
    debug_assert!(c.watch1 == false_atom || c.watch2 == false_atom);
    if c.watch1 == false_atom {
        c.swap_watches();
    }
    // now watch2 == false_atom, watch1 is the other watched atom
    let other = c.watch1;
    if value_of(other) == Some(true) {
        return WatchOutcome::Satisfied;
    }
    let replacement = (0..c.unwatched_lits().len()).find(|&i| value_of(c.unwatched_lits()[i]) != Some(false));
    if let Some(i) = replacement {
        let new_watch = c.unwatched_lits()[i];
        c.set_watch2(i);
        return WatchOutcome::Moved(new_watch);
    }
    if value_of(other).is_none() {
        WatchOutcome::Unit(other, clause)
    } else {
        WatchOutcome::Conflict(clause)
    }
}

/// Attaches `clause`'s first two atoms as its watches (`spec.md` §4.1's `attach`).
pub fn attach(atoms: &mut crate::collections::ref_store::RefVec<AtomId, Atom>, clauses: &Clauses, clause: ClauseId) {
    let c = clauses.get(clause);
    atoms[c.watch1].add_watcher(clause);
    if c.watch1 != c.watch2 {
        atoms[c.watch2].add_watcher(clause);
    }
}

/// Detaches `clause` from its two watch vectors (`spec.md` §4.1's `detach`).
pub fn detach(atoms: &mut crate::collections::ref_store::RefVec<AtomId, Atom>, clauses: &Clauses, clause: ClauseId) {
    let c = clauses.get(clause);
    atoms[c.watch1].remove_watcher(clause);
    if c.watch1 != c.watch2 {
        atoms[c.watch2].remove_watcher(clause);
    }
}

/// The generalised term-watches-term registry (`spec.md` §4.3): `t` registers that it wants to be
/// notified when `u` is assigned. Multiple terms may watch the same `u`; a term may watch several
/// `u`s. Backed by a plain hash map since, unlike atoms, not every term is watched.
#[derive(Default)]
pub struct TermWatches {
    watchers_of: HashMap<TermId, Vec<TermId>>,
}

impl TermWatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// `watcher` asks to be notified when `watched` is assigned.
    pub fn register(&mut self, watcher: TermId, watched: TermId) {
        let list = self.watchers_of.entry(watched).or_default();
        if !list.contains(&watcher) {
            list.push(watcher);
        }
    }

    /// Drops the (`watcher`, `watched`) registration, per a plugin's `update_watches` returning
    /// `Remove` (`spec.md` §4.3).
    pub fn unregister(&mut self, watcher: TermId, watched: TermId) {
        if let Some(list) = self.watchers_of.get_mut(&watched) {
            if let Some(pos) = list.iter().position(|&w| w == watcher) {
                list.swap_remove(pos);
            }
        }
    }

    /// The terms currently watching `watched`, in registration order (minus any swap-removed
    /// gaps). Order does not matter for correctness; it is deterministic for reproducible traces.
    pub fn watchers_of(&self, watched: TermId) -> &[TermId] {
        self.watchers_of.get(&watched).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Evaluates `atom`'s truth value given the current value of its parent term, if any.
pub fn atom_value(atom: &Atom, term_value: Option<&Value>) -> Option<bool> {
    atom.value(term_value)
}

//! Atoms: signed occurrences of boolean terms (`spec.md` §3). An atom's truth value is never
//! stored directly; it is derived from its parent term's assignment and its own polarity. What an
//! atom *does* own is the set of clauses currently watching it, the boolean two-watched-literal
//! analogue of `Term::watching_terms`.

use crate::ids::{AtomId, ClauseId, TermId};
use crate::term::Value;

pub struct Atom {
    pub id: AtomId,
    pub term: TermId,
    /// Clauses that currently hold this atom itself as one of their two watched literals
    /// (`spec.md` §4.3): when this atom becomes false, these are exactly the clauses that need
    /// rewatching. Swap-removed from as watches move; order is never meaningful.
    pub watched_by: Vec<ClauseId>,
}

impl Atom {
    pub fn new(id: AtomId, term: TermId) -> Self {
        Atom {
            id,
            term,
            watched_by: Vec::new(),
        }
    }

    /// This atom's truth value given its parent term's current boolean value, if assigned.
    pub fn value(&self, term_value: Option<&Value>) -> Option<bool> {
        let b = term_value?.as_bool()?;
        Some(if self.id.is_positive() { b } else { !b })
    }

    pub fn add_watcher(&mut self, clause: ClauseId) {
        self.watched_by.push(clause);
    }

    /// Removes `clause` from this atom's watch list. Swap-remove: watch order carries no meaning.
    pub fn remove_watcher(&mut self, clause: ClauseId) {
        if let Some(pos) = self.watched_by.iter().position(|&c| c == clause) {
            self.watched_by.swap_remove(pos);
        }
    }
}

//! Clauses: disjunctions of atoms, arena-allocated exactly as the teacher's
//! `reasoners::sat::clauses::Clauses` allocates `Clause`s — bump-allocated, individually immutable
//! once built, with batched (GC-driven) deallocation rather than per-clause `Drop` (`spec.md` §3,
//! §9).

use crate::ids::{AtomId, ClauseId};
use bumpalo::Bump;
use std::cell::RefCell;
use std::fmt::{Debug, Display, Formatter};

/// The justification recorded on a clause (`spec.md` §3).
pub enum Premise {
    /// A user-supplied hypothesis.
    Hyp,
    /// A one-atom clause standing for a local (pushable/poppable) assumption.
    Local,
    /// A theory tautology, justified by an opaque plugin-supplied proof object.
    Lemma(Box<dyn std::any::Any + Send + Sync>),
    /// The result of deduplicating/sorting another clause.
    Simplify(ClauseId),
    /// A resolution chain: `init` resolved through `steps` in order.
    Steps { init: ClauseId, steps: Vec<ResolutionStep> },
    /// An unsimplified resolution chain, rewritten to `Steps` during proof post-processing.
    RawSteps(Vec<ResolutionStep>),
}

impl Debug for Premise {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Premise::Hyp => write!(f, "Hyp"),
            Premise::Local => write!(f, "Local"),
            Premise::Lemma(_) => write!(f, "Lemma(..)"),
            Premise::Simplify(c) => write!(f, "Simplify({c:?})"),
            Premise::Steps { init, steps } => write!(f, "Steps{{init: {init:?}, steps: {} }}", steps.len()),
            Premise::RawSteps(steps) => write!(f, "RawSteps({})", steps.len()),
        }
    }
}

/// One step of a resolution proof: resolve the clause under construction against `other`, pivoting
/// on `pivot` (`spec.md`'s `Steps`).
#[derive(Copy, Clone, Debug)]
pub struct ResolutionStep {
    pub pivot: AtomId,
    pub other: ClauseId,
}

/// A thunk producing the literals of a lazily-constructed `Bcp_lazy` reason clause, forced at most
/// once and memoised in place (`spec.md` §5, "the sole suspension... is the lazy evaluation of
/// `Bcp_lazy` reason clauses, which runs exactly when conflict analysis first needs the reason").
pub struct LazyReason(RefCell<LazyState>);

enum LazyState {
    Pending(Option<Box<dyn FnOnce() -> Vec<AtomId> + Send>>),
    Forced(Vec<AtomId>),
}

impl LazyReason {
    pub fn new(thunk: impl FnOnce() -> Vec<AtomId> + Send + 'static) -> Self {
        LazyReason(RefCell::new(LazyState::Pending(Some(Box::new(thunk)))))
    }

    /// Forces the thunk on first call; subsequent calls return the memoised literals.
    pub fn force(&self) -> Vec<AtomId> {
        let mut state = self.0.borrow_mut();
        match &mut *state {
            LazyState::Forced(lits) => lits.clone(),
            LazyState::Pending(thunk) => {
                let thunk = thunk.take().expect("lazy reason thunk already taken");
                let lits = thunk();
                *state = LazyState::Forced(lits.clone());
                lits
            }
        }
    }
}

impl Debug for LazyReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &*self.0.borrow() {
            LazyState::Pending(_) => write!(f, "LazyReason(pending)"),
            LazyState::Forced(lits) => write!(f, "LazyReason(forced, {} lits)", lits.len()),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct ClauseFlags(u8);

impl ClauseFlags {
    const ATTACHED: u8 = 1 << 0;
    const VISITED: u8 = 1 << 1;
    const DELETED: u8 = 1 << 2;
    const GC_MARKED: u8 = 1 << 3;

    #[inline]
    fn get(self, bit: u8) -> bool {
        self.0 & bit != 0
    }
    #[inline]
    fn set(&mut self, bit: u8, value: bool) {
        if value {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    pub fn attached(self) -> bool {
        self.get(Self::ATTACHED)
    }
    pub fn set_attached(&mut self, v: bool) {
        self.set(Self::ATTACHED, v)
    }
    pub fn visited(self) -> bool {
        self.get(Self::VISITED)
    }
    pub fn set_visited(&mut self, v: bool) {
        self.set(Self::VISITED, v)
    }
    pub fn deleted(self) -> bool {
        self.get(Self::DELETED)
    }
    pub fn set_deleted(&mut self, v: bool) {
        self.set(Self::DELETED, v)
    }
    pub fn gc_marked(self) -> bool {
        self.get(Self::GC_MARKED)
    }
    pub fn set_gc_marked(&mut self, v: bool) {
        self.set(Self::GC_MARKED, v)
    }
}

/// A disjunction of atoms, with its first two atoms designated as watched (`spec.md` §3 invariant 2).
///
/// # Safety
///
/// `unwatched` erases the lifetime tying it to the owning `Clauses`'s bump arena. A `Clause` must
/// never be moved out of or cloned away from the `Clauses` that allocated it; it is only ever
/// accessed through `&Clauses`/`&mut Clauses`, whose arena outlives every clause it handed out.
pub struct Clause {
    pub watch1: AtomId,
    pub watch2: AtomId,
    unwatched: &'static mut [AtomId],
    pub name: Option<Box<str>>,
    pub tag: Option<Box<dyn std::any::Any + Send + Sync>>,
    pub activity: f64,
    pub flags: ClauseFlags,
    pub premise: Premise,
}

impl Clause {
    pub fn has_single_literal(&self) -> bool {
        self.watch1 == self.watch2
    }

    pub fn len(&self) -> usize {
        if self.has_single_literal() {
            1
        } else {
            2 + self.unwatched.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn unwatched_lits(&self) -> &[AtomId] {
        self.unwatched
    }

    pub fn swap_watches(&mut self) {
        std::mem::swap(&mut self.watch1, &mut self.watch2);
    }

    /// Puts the unwatched literal at `index` into watch slot 1, moving the previous watch1 into
    /// its place.
    pub fn set_watch1(&mut self, index: usize) {
        std::mem::swap(&mut self.watch1, &mut self.unwatched[index]);
    }
    pub fn set_watch2(&mut self, index: usize) {
        std::mem::swap(&mut self.watch2, &mut self.unwatched[index]);
    }

    /// All atoms of the clause, watches first.
    pub fn atoms(&self) -> impl Iterator<Item = AtomId> + '_ {
        let n = self.len();
        (0..n).map(move |i| match i {
            0 => self.watch1,
            1 => self.watch2,
            k => self.unwatched[k - 2],
        })
    }
}

impl Display for Clause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, a) in self.atoms().enumerate() {
            if i != 0 {
                write!(f, " ")?;
            }
            write!(f, "{a:?}")?;
        }
        write!(f, "]")
    }
}

impl Debug for Clause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

/// Bump-arena-backed dense clause storage, keyed by [`ClauseId`] (`spec.md` §9).
pub struct Clauses {
    clauses: crate::collections::ref_store::RefVec<ClauseId, Clause>,
    arena: Bump,
}

impl Clauses {
    pub fn new() -> Self {
        Clauses {
            clauses: Default::default(),
            arena: Bump::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: ClauseId) -> &Clause {
        &self.clauses[id]
    }

    pub fn get_mut(&mut self, id: ClauseId) -> &mut Clause {
        &mut self.clauses[id]
    }

    /// Allocates a new clause from `atoms` (must be non-empty; not deduplicated here — callers
    /// wanting dedup/sort should route through `Premise::Simplify`) and returns its id.
    pub fn push(&mut self, atoms: &[AtomId], premise: Premise) -> ClauseId {
        assert!(!atoms.is_empty(), "a clause must have at least one atom");
        let (watch1, watch2, unwatched) = if atoms.len() == 1 {
            (atoms[0], atoms[0], &mut [][..])
        } else {
            // SAFETY: the returned slice's lifetime is erased from 'arena to 'static; it is only
            // ever read back out through &Clause/&mut Clause borrowed from `self`, so it never
            // outlives `self.arena`.
            let rest: &'static mut [AtomId] =
                unsafe { std::mem::transmute::<&mut [AtomId], &'static mut [AtomId]>(self.arena.alloc_slice_copy(&atoms[2..])) };
            (atoms[0], atoms[1], rest)
        };
        let clause = Clause {
            watch1,
            watch2,
            unwatched,
            name: None,
            tag: None,
            activity: 0.0,
            flags: ClauseFlags::default(),
            premise,
        };
        self.clauses.push(clause)
    }
}

impl Default for Clauses {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<ClauseId> for Clauses {
    type Output = Clause;
    fn index(&self, id: ClauseId) -> &Clause {
        &self.clauses[id]
    }
}
impl std::ops::IndexMut<ClauseId> for Clauses {
    fn index_mut(&mut self, id: ClauseId) -> &mut Clause {
        &mut self.clauses[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(i: u32) -> AtomId {
        AtomId::positive(i)
    }

    #[test]
    fn push_and_read_back_literals() {
        let mut clauses = Clauses::new();
        let id = clauses.push(&[a(0), a(1), a(2)], Premise::Hyp);
        let c = clauses.get(id);
        assert_eq!(c.len(), 3);
        assert_eq!(c.watch1, a(0));
        assert_eq!(c.watch2, a(1));
        assert_eq!(c.unwatched_lits(), &[a(2)]);
    }

    #[test]
    fn unit_clause_has_equal_watches() {
        let mut clauses = Clauses::new();
        let id = clauses.push(&[a(5)], Premise::Local);
        let c = clauses.get(id);
        assert!(c.has_single_literal());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn lazy_reason_forces_once() {
        use std::cell::Cell;
        use std::rc::Rc;
        let calls = Rc::new(Cell::new(0));
        let calls2 = calls.clone();
        let lazy = LazyReason::new(move || {
            calls2.set(calls2.get() + 1);
            vec![a(0), a(1)]
        });
        assert_eq!(lazy.force(), vec![a(0), a(1)]);
        assert_eq!(lazy.force(), vec![a(0), a(1)]);
        assert_eq!(calls.get(), 1);
    }
}

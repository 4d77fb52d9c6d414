//! The term model (`spec.md` §3): the universal unit of reasoning. Every boolean atom, theory
//! expression and semantic variable is represented as a [`Term`], hash-consed per plugin so that
//! pointer/id-equality of two terms implies semantic equality (`spec.md` §9).

use crate::backtrack::DecLvl;
use crate::ids::{ClauseId, TermId};
use crate::var::Var;
use std::any::Any;
use std::fmt::{Debug, Formatter};

/// The sort (type) of a term: either the distinguished boolean sort, shared by all plugins and the
/// core, or a sort defined by a specific plugin (`spec.md` §3, "a type (Boolean or a plugin-defined
/// sort with its own operation table)").
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Sort {
    Bool,
    /// A plugin-defined sort, identified by the owning plugin and a plugin-local sort index (a
    /// single plugin may define more than one sort, e.g. an arithmetic plugin defining both `Int`
    /// and `Real`).
    Plugin(crate::ids::PluginId, u16),
}

/// The plugin-specific payload of a term, opaque to the core. The core only ever inspects a view
/// through the owning plugin's operation table (`spec.md` §9: "Dispatch is through the table, not
/// virtual inheritance").
pub struct TermView {
    /// A plugin-defined tag disambiguating the shape of `payload` (e.g. distinguishing `And` from
    /// `Plus` within the same plugin). Meaningless to the core; only the owning plugin interprets it.
    pub tag: u16,
    pub payload: Box<dyn Any + Send + Sync>,
}

impl TermView {
    pub fn new<P: Any + Send + Sync>(tag: u16, payload: P) -> Self {
        TermView {
            tag,
            payload: Box::new(payload),
        }
    }

    pub fn downcast_ref<P: Any>(&self) -> Option<&P> {
        self.payload.downcast_ref()
    }
}

/// The flags bitfield carried by every term (`spec.md` §3).
#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct TermFlags(u8);

impl TermFlags {
    const IS_ADDED: u8 = 1 << 0;
    const IS_DELETED: u8 = 1 << 1;
    const MARK_POS: u8 = 1 << 2;
    const MARK_NEG: u8 = 1 << 3;
    const SEEN: u8 = 1 << 4;
    const GC_MARKED: u8 = 1 << 5;
    const NEGATED: u8 = 1 << 6;

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

    pub fn is_added(self) -> bool {
        self.get(Self::IS_ADDED)
    }
    pub fn set_added(&mut self, v: bool) {
        self.set(Self::IS_ADDED, v)
    }
    pub fn is_deleted(self) -> bool {
        self.get(Self::IS_DELETED)
    }
    pub fn set_deleted(&mut self, v: bool) {
        self.set(Self::IS_DELETED, v)
    }
    pub fn mark_pos(self) -> bool {
        self.get(Self::MARK_POS)
    }
    pub fn set_mark_pos(&mut self, v: bool) {
        self.set(Self::MARK_POS, v)
    }
    pub fn mark_neg(self) -> bool {
        self.get(Self::MARK_NEG)
    }
    pub fn set_mark_neg(&mut self, v: bool) {
        self.set(Self::MARK_NEG, v)
    }
    pub fn seen(self) -> bool {
        self.get(Self::SEEN)
    }
    pub fn set_seen(&mut self, v: bool) {
        self.set(Self::SEEN, v)
    }
    pub fn gc_marked(self) -> bool {
        self.get(Self::GC_MARKED)
    }
    pub fn set_gc_marked(&mut self, v: bool) {
        self.set(Self::GC_MARKED, v)
    }
    pub fn negated(self) -> bool {
        self.get(Self::NEGATED)
    }
    pub fn set_negated(&mut self, v: bool) {
        self.set(Self::NEGATED, v)
    }
}

impl Debug for TermFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut names = vec![];
        if self.is_added() {
            names.push("added")
        }
        if self.is_deleted() {
            names.push("deleted")
        }
        if self.mark_pos() {
            names.push("mark+")
        }
        if self.mark_neg() {
            names.push("mark-")
        }
        if self.seen() {
            names.push("seen")
        }
        if self.gc_marked() {
            names.push("gc")
        }
        if self.negated() {
            names.push("negated")
        }
        write!(f, "{{{}}}", names.join(","))
    }
}

/// The value taken by an assigned term. Resolves `spec.md` §9 Open Question (b) in favor of the
/// newer, unified representation: a single `Option<Assignment>` on the term rather than two
/// separate boolean/semantic assignment slots.
#[derive(Copy, Clone, Debug)]
pub enum Value {
    Bool(bool),
    /// An opaque, plugin-interpreted value (e.g. a fixed-point encoded rational for a linear-arithmetic
    /// plugin, or a domain-element index for an uninterpreted-sort/UF plugin).
    Semantic(i64),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Semantic(_) => None,
        }
    }
}

/// Why a term got its current assignment (`spec.md` §3's "Premise"-adjacent notion for terms: the
/// justification of an *assignment*, as opposed to a clause's justification for being learnt).
#[derive(Debug)]
pub enum Reason {
    /// Chosen by the decision heuristic (`spec.md` §4.6).
    Decision,
    /// Unit-propagated by the named clause, which must contain this literal and have all its other
    /// literals false at a level ≤ this assignment's level (`spec.md` §3 invariant 3).
    Bcp(ClauseId),
    /// Same as `Bcp`, but the justifying clause is computed lazily and memoised in place on first
    /// use by conflict analysis (`spec.md` §9, "Lazy clause construction").
    BcpLazy(crate::clause::LazyReason),
    /// Asserted by a plugin's `propagate_bool_eval`: the listed terms' current values entail this
    /// one (`spec.md` §4.5). A full clausal justification is synthesised lazily if conflict
    /// analysis ever needs to resolve through it (`spec.md` §4.4).
    Eval(Vec<TermId>),
}

/// An assignment recorded on a term: its value, the decision level at which it was made, and why.
#[derive(Debug)]
pub struct Assignment {
    pub value: Value,
    pub level: DecLvl,
    pub reason: Reason,
}

/// The universal unit of reasoning (`spec.md` §3).
pub struct Term {
    pub id: TermId,
    pub view: TermView,
    pub sort: Sort,
    pub activity: f64,
    pub flags: TermFlags,
    pub var: Var,
    pub assignment: Option<Assignment>,
    /// Other terms whose owning plugin asked to be notified when this term becomes assigned
    /// (`spec.md` §3's "generalised watches"), lazily initialised: empty until first registration.
    pub watching_terms: Vec<TermId>,
}

impl Term {
    pub fn new(id: TermId, view: TermView, sort: Sort) -> Self {
        Term {
            id,
            view,
            sort,
            activity: 0.0,
            flags: TermFlags::default(),
            var: Var::None,
            assignment: None,
            watching_terms: Vec::new(),
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.assignment.is_some()
    }

    pub fn bool_value(&self) -> Option<bool> {
        self.assignment.as_ref().and_then(|a| a.value.as_bool())
    }

    pub fn level(&self) -> Option<DecLvl> {
        self.assignment.as_ref().map(|a| a.level)
    }
}

impl Debug for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[tag={}]", self.id, self.view.tag)
    }
}

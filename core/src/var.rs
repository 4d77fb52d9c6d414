//! The three flavors a term's "variable side" can take (`spec.md` §3): a plain non-variable term,
//! a boolean variable carrying its two atoms, or a semantic (theory) variable carrying plugin-owned
//! decision state.

use crate::ids::AtomId;
use std::any::Any;
use std::fmt::{Debug, Formatter};

/// The decision-relevant state attached to a semantic variable, owned and interpreted by the
/// plugin that created it (`spec.md` §4.6: "the plugin's sort-level `decide` is consulted").
pub trait DecideState: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync> DecideState for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub enum Var {
    /// Not itself a decision variable: a plain subterm with no direct boolean or semantic role.
    None,
    /// A boolean variable: carries the pair of atoms whose `term` is this one.
    Bool { pos_atom: AtomId, neg_atom: AtomId },
    /// A semantic (theory) variable, decided directly by its owning plugin's sort-level `decide`.
    Semantic { decide_state: Box<dyn DecideState> },
}

impl Var {
    pub fn is_bool(&self) -> bool {
        matches!(self, Var::Bool { .. })
    }

    pub fn atoms(&self) -> Option<(AtomId, AtomId)> {
        match self {
            Var::Bool { pos_atom, neg_atom } => Some((*pos_atom, *neg_atom)),
            _ => None,
        }
    }
}

impl Debug for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Var::None => write!(f, "Var::None"),
            Var::Bool { pos_atom, neg_atom } => write!(f, "Var::Bool({pos_atom:?}/{neg_atom:?})"),
            Var::Semantic { .. } => write!(f, "Var::Semantic(..)"),
        }
    }
}

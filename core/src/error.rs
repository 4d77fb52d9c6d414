//! The error taxonomy (`spec.md` §7). Internal invariant violations (kind 2) are deliberately not
//! part of this enum: they fail fast via `assert!`/`debug_assert!`, the same way the teacher
//! reports internal defects, rather than being threaded through `Result`.

use crate::ids::{AtomId, ClauseId};
use thiserror::Error;

/// A conflict raised by a plugin or by boolean propagation (`spec.md` §4.1, §7 kind 3: "plugin
/// misuse... converted to a conflict by treating the propagating clause/lemma as the conflict
/// clause").
#[derive(Debug, Error)]
pub enum Contradiction {
    /// Propagation derived a conflict justified by an existing clause.
    #[error("conflicting clause {0:?}")]
    Clause(ClauseId),
    /// A plugin asserted an atom already assigned to the opposite value; `conflicting` names the
    /// atom and `others` the premises that justify the new (contradictory) assertion.
    #[error("plugin asserted {asserted:?} already assigned to the opposite value")]
    PluginMisuse { asserted: AtomId, others: Vec<AtomId> },
    /// A plugin directly supplied the conflicting set of atoms (all false under the current trail).
    #[error("plugin-raised conflict over {0:?}")]
    Explanation(Vec<AtomId>),
}

/// Errors surfaced to the caller by the driver (`spec.md` §7). Only the driver surfaces results;
/// plugins only ever raise [`Contradiction`]s.
#[derive(Debug, Error)]
pub enum SolverError {
    /// A conflict was derived at decision level 0: the instance is unsatisfiable and the search is
    /// over (`spec.md` §7 kind 1).
    #[error("unsatisfiable at level 0, final conflict clause {0:?}")]
    UnsatAtLevelZero(ClauseId),
    /// The caller's deadline/interrupt flag tripped; the instance remains valid and may be
    /// re-entered (`spec.md` §7 kind 4, §5).
    #[error("solve interrupted before a verdict was reached")]
    Interrupted,
    /// A resolution step's pivot was not present in both operand clauses during proof traversal
    /// (`spec.md` §7 kind 5).
    #[error("malformed proof: pivot {pivot:?} absent from clause {clause:?}")]
    MalformedProof { pivot: AtomId, clause: ClauseId },
}

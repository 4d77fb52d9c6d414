//! Clause-database reduction (`spec.md` §4.7): periodically drop the least-active half of the
//! learned clauses (skipping binary clauses and clauses currently locked as a trail reason), then
//! sweep terms no longer reachable from any attached clause or the trail.

use crate::driver::{Solver, CLAUSE_DB_GROWTH};
use crate::ids::{ClauseId, TermId};
use crate::term::Reason;
use std::collections::HashSet;

impl Solver {
    /// Whether the learned-clause population has grown past the current (geometrically growing)
    /// threshold (`spec.md` §4.7).
    pub fn should_reduce(&self) -> bool {
        self.learned_clauses.len() as f64 >= self.next_reduction_threshold
    }

    /// A clause currently justifying some trail literal's assignment: reduction must never delete
    /// it (`spec.md` §4.7, "a clause is skipped if it is currently a reason for some trail
    /// literal").
    fn locked_clauses(&self) -> HashSet<ClauseId> {
        self.trail
            .trail
            .iter()
            .filter_map(|&t| match self.registry.terms[t].assignment.as_ref().map(|a| &a.reason) {
                Some(Reason::Bcp(c)) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// Runs one reduction pass: deletes the lower half (by activity) of unlocked, non-binary
    /// learned clauses, then sweeps terms unreachable from the surviving clauses and the trail
    /// (`spec.md` §4.7's "term GC piggybacks on reduction").
    pub fn reduce(&mut self) {
        let locked = self.locked_clauses();
        let mut candidates: Vec<ClauseId> = self
            .learned_clauses
            .iter()
            .copied()
            .filter(|c| !locked.contains(c) && self.clauses.get(*c).len() > 2)
            .collect();
        candidates.sort_by(|&a, &b| {
            self.clauses.get(a).activity.partial_cmp(&self.clauses.get(b).activity).unwrap()
        });
        let to_delete = candidates.len() / 2;
        let deleted: HashSet<ClauseId> = candidates[..to_delete].iter().copied().collect();
        for &c in &deleted {
            self.detach(c);
            self.clauses.get_mut(c).flags.set_deleted(true);
        }
        self.learned_clauses.retain(|c| !deleted.contains(c));
        self.next_reduction_threshold *= CLAUSE_DB_GROWTH.get();
        tracing::debug!(deleted = deleted.len(), remaining = self.learned_clauses.len(), "clause-db reduction");
        self.collect_garbage();
    }

    /// Marks every term reachable from an attached clause or the trail, then sweeps the rest,
    /// calling each owning plugin's `delete` hook (`spec.md` §3 invariant 6, §4.7).
    fn collect_garbage(&mut self) {
        let mut reachable: HashSet<TermId> = HashSet::new();
        let mut frontier: Vec<TermId> = Vec::new();

        for &t in &self.trail.trail {
            if reachable.insert(t) {
                frontier.push(t);
            }
        }
        let n_clauses = self.clauses.len();
        for i in 0..n_clauses {
            let id = ClauseId::from_u32(i as u32);
            if !self.clauses.get(id).flags.attached() {
                continue;
            }
            for atom in self.clauses.get(id).atoms().collect::<Vec<_>>() {
                let t = self.registry.atoms[atom].term;
                if reachable.insert(t) {
                    frontier.push(t);
                }
            }
        }
        while let Some(t) = frontier.pop() {
            let subterms = {
                let plugin_id = t.plugin();
                let view = &self.registry.terms[t].view;
                self.registry.plugin(plugin_id).subterms(view)
            };
            for s in subterms {
                if reachable.insert(s) {
                    frontier.push(s);
                }
            }
        }

        let n_terms = self.registry.terms.len();
        for i in 0..n_terms {
            let t = TermId::from(i);
            if self.registry.terms[t].flags.is_deleted() || !self.registry.terms[t].flags.is_added() {
                continue;
            }
            if !reachable.contains(&t) {
                let plugin_id = t.plugin();
                self.registry.plugin_mut(plugin_id).delete(t);
                self.registry.terms[t].flags.set_deleted(true);
            }
        }
    }
}

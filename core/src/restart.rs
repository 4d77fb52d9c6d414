//! Restart policy (`spec.md` §4.7): the Luby sequence scaled by a base conflict count. A restart
//! backtracks to level 0 without discarding learned clauses.

use crate::driver::{Solver, RESTART_BASE};

/// The `x`-th term (0-indexed) of the base-2 Luby sequence: 1,1,2,1,1,2,4,1,1,2,1,1,2,4,8,...
fn luby(x: u64) -> u64 {
    let mut size = 1u64;
    let mut seq = 0u32;
    while size < x + 1 {
        seq += 1;
        size = 2 * size + 1;
    }
    let mut x = x;
    while size - 1 != x {
        size = (size - 1) / 2;
        seq -= 1;
        x %= size;
    }
    1u64 << seq
}

impl Solver {
    /// Whether the search should restart now, based on the Luby sequence scaled by
    /// `RESTART_BASE` (`spec.md` §4.7).
    pub fn should_restart(&self) -> bool {
        let threshold = luby(self.restart_count_internal()) * RESTART_BASE.get();
        self.conflicts_since_restart_internal() >= threshold
    }

    pub(crate) fn restart_count_internal(&self) -> u64 {
        self.restart_count
    }
    pub(crate) fn conflicts_since_restart_internal(&self) -> u64 {
        self.conflicts_since_restart
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luby_matches_known_prefix() {
        let expected = [1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8];
        for (i, &e) in expected.iter().enumerate() {
            assert_eq!(luby(i as u64), e, "luby({i}) mismatch");
        }
    }
}

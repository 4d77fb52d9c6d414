//! Stable numeric identities for the arenas of the core: [`PluginId`], [`TermId`], [`AtomId`] and
//! [`ClauseId`].
//!
//! Following the teacher's convention for `SignedVar` (a variable index packed with a sign bit),
//! identities here are dense `u32`s with a bit of structure baked in rather than opaque newtypes:
//! a [`TermId`]'s high byte names the plugin that owns it (`spec.md` §3: "a stable integer id
//! whose high bits encode the owning plugin id"), and an [`AtomId`]'s low bit is its polarity, so
//! `AtomId::neg(a) == a ^ 1` holds by construction (`spec.md` §3's atom-id invariant).

use crate::create_ref_type;
use std::fmt::{Debug, Formatter};

/// Identifies a theory plugin (or the core's built-in boolean plugin) registered with the solver.
///
/// Plugin ids occupy the high byte of a [`TermId`], so at most 255 plugins may be registered
/// (id 255 is reserved to mark "no plugin" / an unregistered term).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PluginId(pub(crate) u8);

impl PluginId {
    pub const MAX_PLUGINS: u32 = 255;

    pub const fn new(id: u8) -> Self {
        PluginId(id)
    }

    pub const fn to_u8(self) -> u8 {
        self.0
    }
}

impl Debug for PluginId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "plugin#{}", self.0)
    }
}

/// A term identity: the owning plugin in the high byte, a dense per-plugin index in the low 24 bits.
///
/// Two terms with the same `TermId` are the same term by construction: the arena never reuses or
/// moves ids (`spec.md` §3, "Terms are never moved once created; deletion is deferred to garbage
/// collection").
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TermId(u32);

impl TermId {
    const INDEX_BITS: u32 = 24;
    const INDEX_MASK: u32 = (1 << Self::INDEX_BITS) - 1;

    pub fn new(plugin: PluginId, local_index: u32) -> Self {
        assert!(local_index <= Self::INDEX_MASK, "term arena exhausted for this plugin");
        TermId(((plugin.0 as u32) << Self::INDEX_BITS) | local_index)
    }

    pub const fn plugin(self) -> PluginId {
        PluginId((self.0 >> Self::INDEX_BITS) as u8)
    }

    pub const fn local_index(self) -> u32 {
        self.0 & Self::INDEX_MASK
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }
}

impl From<TermId> for usize {
    fn from(t: TermId) -> Self {
        t.0 as usize
    }
}
impl From<usize> for TermId {
    fn from(u: usize) -> Self {
        TermId(u as u32)
    }
}

impl Debug for TermId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{:?}:{}", self.plugin(), self.local_index())
    }
}

/// A signed occurrence of a boolean term (`spec.md`'s "Atom"): the parent term's dense index in
/// the high bits, polarity in the low bit. The positive atom of a term has an even id; negating
/// flips only the low bit, giving `not(a).id == a.id xor 1` for free.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct AtomId(u32);

impl AtomId {
    pub fn positive(local_index: u32) -> Self {
        AtomId(local_index << 1)
    }

    pub const fn negate(self) -> Self {
        AtomId(self.0 ^ 1)
    }

    pub const fn is_positive(self) -> bool {
        self.0 & 1 == 0
    }

    pub const fn local_index(self) -> u32 {
        self.0 >> 1
    }
}

impl From<AtomId> for usize {
    fn from(a: AtomId) -> Self {
        a.0 as usize
    }
}
impl From<usize> for AtomId {
    fn from(u: usize) -> Self {
        AtomId(u as u32)
    }
}

impl Debug for AtomId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_positive() {
            write!(f, "+a{}", self.local_index())
        } else {
            write!(f, "-a{}", self.local_index())
        }
    }
}

create_ref_type!(ClauseId);

impl Debug for ClauseId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.to_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_negation_is_xor_one() {
        let a = AtomId::positive(3);
        let na = a.negate();
        assert_eq!(na.0, a.0 ^ 1);
        assert_eq!(na.negate(), a);
        assert!(a.is_positive());
        assert!(!na.is_positive());
    }

    #[test]
    fn term_id_roundtrips_plugin_and_index() {
        let p = PluginId::new(7);
        let t = TermId::new(p, 123456);
        assert_eq!(t.plugin(), p);
        assert_eq!(t.local_index(), 123456);
    }
}

//! Reference theory plugins (`spec.md` §1: "the specific theory plugins' internal decision
//! procedures" are out of scope — only what they expose to the core is specified). These four
//! cover the theories `spec.md` §2 names as attaching through the plugin interface: pure
//! propositional structure, linear real arithmetic, uninterpreted functions and uninterpreted
//! sorts. Each is a small, self-contained illustration of the [`crate::plugin::Plugin`]/
//! [`crate::plugin::SortOps`] contract, not a competitive decision procedure.

pub mod bool_plugin;
pub mod lra;
pub mod uf;
pub mod uninterpreted_sort;

//! `mcsat-core`: an MCSat-style SMT solving core.
//!
//! A unified search that decides both boolean atoms and first-order theory terms on a single
//! trail, with theories attached as plugins through a narrow action interface. This crate provides
//! the engine: term/atom/clause representation, the trail, generalised-watch propagation,
//! resolution-based conflict analysis, activity-driven decisions, clause learning, restarts and
//! clause-database reduction. It does not provide a CLI, a textual parser front-end, or a
//! standalone proof checker.

pub mod actions;
pub mod atom;
pub mod backtrack;
pub mod clause;
pub mod collections;
pub mod conflict;
pub mod decision;
pub mod dimacs;
pub mod driver;
pub mod error;
pub mod ids;
pub mod plugin;
pub mod proof;
pub mod propagate;
pub mod reduce;
pub mod restart;
pub mod term;
pub mod theories;
pub mod var;
pub mod watch;

pub use driver::Solver;
pub use error::{Contradiction, SolverError};

//! Flattening of interaction definitions into engine tables.
//!
//! [`table::CompiledTables`] expands every target tuple of every definition into
//! all of its distinct orderings, so the engine can match an atom tuple by
//! plain equality. [`cutoffs`] aggregates the per-atom interaction radii used to
//! build neighbor lists.

pub mod cutoffs;
pub mod table;

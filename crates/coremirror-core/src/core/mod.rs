//! # Core Module
//!
//! Stateless building blocks shared by the synchronization engine.
//!
//! - **Particle system** ([`models`]) - atoms, their kinematics and charges, and the cell
//! - **Interaction definitions** ([`interactions`]) - kinds, targets, parameters, cutoffs
//!   and bond-order coordinators
//! - **Target-table compilation** ([`compile`]) - expansion of definitions into the
//!   per-permutation entries the engine consumes, and per-atom cutoff aggregation
//! - **Neighbor lists** ([`neighbors`]) - client-side neighbor lists with a skin
//!
//! Nothing in this module talks to an engine; everything here is plain data that
//! can be compared, cloned and tested in isolation.

pub mod compile;
pub mod interactions;
pub mod models;
pub mod neighbors;

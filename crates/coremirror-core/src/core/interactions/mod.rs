//! Interaction definitions and the catalogue of kinds they are built from.
//!
//! A [`potential::Potential`] names a kind from the [`registry::KindRegistry`],
//! selects target atoms by symbol, tag or index, and carries parameters and a
//! cutoff window. Potentials may be scaled by bond-order factors grouped in a
//! [`bond_order::Coordinator`]. Compact target patterns are expanded by
//! [`pattern`].

pub mod bond_order;
pub mod cutoff;
pub mod error;
pub mod kind;
pub mod pattern;
pub mod potential;
pub mod registry;
pub mod targets;

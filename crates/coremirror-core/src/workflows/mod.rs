//! # Workflows Module
//!
//! Procedures built from repeated evaluations of one engine through a
//! [`SyncController`](crate::engine::controller::SyncController).
//!
//! - **Charge Relaxation** ([`relaxation`]) - Damped charge dynamics driven by
//!   electronegativity differences until the charges equilibrate.
//! - **Numerical Derivatives** ([`numerical`]) - Central-difference forces,
//!   electronegativities and bond-order gradients for checking an engine.

pub mod numerical;
pub mod relaxation;

//! # Core Models Module
//!
//! Client-side representation of the particle system that is mirrored into the
//! engine: per-atom species, masses, tags, positions, momenta and charges, plus
//! the simulation [`structure::Cell`].
//!
//! ```ignore
//! use coremirror::core::models::structure::{Atom, AtomicStructure, Cell};
//! use nalgebra::Point3;
//!
//! let structure = AtomicStructure::new(
//!     vec![
//!         Atom::new("H", Point3::new(0.0, 0.0, 0.0)),
//!         Atom::new("H", Point3::new(0.74, 0.0, 0.0)),
//!     ],
//!     Cell::orthorhombic(2.0, 2.0, 2.0, [true; 3]),
//! );
//! ```

pub mod structure;

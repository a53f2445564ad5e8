//! # coremirror Core Library
//!
//! Client-side state management for stateful atomistic computation engines:
//! interaction definitions are compiled into flat tables, and a mirror of the
//! engine's contents lets every evaluation push only what actually changed.
//!
//! ## Architectural Philosophy
//!
//! The library keeps a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`AtomicStructure`,
//!   `Cell`), interaction definitions and their kind registry, target-table
//!   compilation, and neighbor-list construction.
//!
//! - **[`engine`]: The Synchronization Core.** The engine adapter boundary, the
//!   `StateMirror` of what an engine holds, the `SyncController` that diffs
//!   desired state against it, and the quantity cache.
//!
//! - **[`workflows`]: The Public API.** Procedures built from repeated engine
//!   evaluations, such as charge relaxation and finite-difference checks.

pub mod core;
pub mod engine;
pub mod workflows;

//! # Engine Module
//!
//! This module keeps a stateful computation engine consistent with the system a
//! client wants evaluated, while sending the engine as little data as possible.
//!
//! ## Overview
//!
//! The engine holds atoms, a cell, interaction tables and neighbor lists. A
//! [`handle::EngineHandle`] owns the engine together with a
//! [`mirror::StateMirror`] recording, dimension by dimension, what the engine
//! currently holds. A [`controller::SyncController`] owns one client's desired
//! state; each operation compares desired state with the mirror and pushes only
//! the dimensions that differ, in dependency order, before pulling results.
//!
//! ## Architecture
//!
//! - **Adapter Boundary** ([`adapter`]) - The calls an engine must accept
//! - **Synchronization** ([`controller`], [`mirror`], [`handle`]) - Diffing and push sequencing
//! - **Result Caching** ([`cache`]) - Derived quantities valid for the mirrored state
//! - **Configuration** ([`config`]) - Invalidation policy, neighbor radii and skin
//! - **Progress Monitoring** ([`progress`]) - Callbacks for long-running workflows
//! - **Error Handling** ([`error`]) - Validation, sequencing, conflict and engine failures
//! - **Test Double** ([`recording`]) - An in-memory engine that records every call

pub mod adapter;
pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod handle;
pub mod mirror;
pub mod progress;
pub mod recording;

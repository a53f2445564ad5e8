use super::adapter::EngineAdapter;
use super::mirror::StateMirror;
use tracing::debug;

/// Exclusive owner of one engine and of the mirror describing its contents.
///
/// Controllers borrow the handle mutably for each operation, so several
/// controllers can take turns on the same engine while every mutation still
/// goes through exactly one of them at a time. Releasing the handle (or
/// dropping it) frees the engine and clears the mirror.
#[derive(Debug)]
pub struct EngineHandle<A: EngineAdapter> {
    adapter: A,
    mirror: StateMirror,
    released: bool,
}

impl<A: EngineAdapter> EngineHandle<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            mirror: StateMirror::new(),
            released: false,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Direct access to the engine for inspection and test doubles, such as
    /// draining a recording engine's call log.
    ///
    /// Engine state changed through this reference is invisible to the mirror;
    /// state changes belong in [`SyncController`](super::controller::SyncController).
    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn mirror(&self) -> &StateMirror {
        &self.mirror
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut A, &mut StateMirror) {
        self.released = false;
        (&mut self.adapter, &mut self.mirror)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Frees all engine memory. The next synchronization starts from scratch.
    pub fn release(&mut self) {
        if !self.released {
            debug!("Releasing engine resources.");
            self.adapter.release();
            self.mirror.clear();
            self.released = true;
        }
    }
}

impl<A: EngineAdapter> Drop for EngineHandle<A> {
    fn drop(&mut self) {
        self.release();
    }
}

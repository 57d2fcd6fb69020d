//! Computation-engine step contract.
//!
//! The incremental computation engine that consumes mirrors lives outside this
//! crate. The notifier only needs one thing from it: a way to say "the mirrors
//! moved, recompute once".
//!
//! # Design Principles
//!
//! - The notifier steps the reactor once per drain, never once per row
//! - A step is only issued after every pollable in the drain has finished
//! - Pushing rows into a mirror never steps anything by itself

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Receives one step per drain cycle.
pub trait Reactor: Send + Sync + 'static {
    /// Recompute derived values from the current mirror contents.
    fn step(&self);
}

impl<R: Reactor + ?Sized> Reactor for Arc<R> {
    fn step(&self) {
        (**self).step();
    }
}

/// A reactor that ignores steps.
#[derive(Debug, Default)]
pub struct NullReactor;

impl Reactor for NullReactor {
    fn step(&self) {}
}

/// A reactor that counts steps, for tests.
#[derive(Debug, Default)]
pub struct RecordingReactor {
    steps: AtomicUsize,
}

impl RecordingReactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of steps received.
    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::SeqCst)
    }

    /// Resets the step count to zero.
    pub fn reset(&self) {
        self.steps.store(0, Ordering::SeqCst);
    }
}

impl Reactor for RecordingReactor {
    fn step(&self) {
        self.steps.fetch_add(1, Ordering::SeqCst);
    }
}

/// A reactor backed by a closure.
pub struct FnReactor<F>(F);

impl<F> FnReactor<F>
where
    F: Fn() + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Reactor for FnReactor<F>
where
    F: Fn() + Send + Sync + 'static,
{
    fn step(&self) {
        (self.0)()
    }
}

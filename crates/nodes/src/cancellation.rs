//! Cooperative cancellation signal shared between the job queue and the
//! step executor.
//!
//! Cancellation is observed *between* attempts, never used to abort an
//! in-flight action — spec explicitly forbids forcibly aborting a running
//! action (no guarantees against partial side effects).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

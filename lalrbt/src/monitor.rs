//! Cooperative cancellation.
//!
//! The backtracking engine polls a [`Monitor`] between trial attempts and
//! gives up with [`ParseError::Cancelled`](crate::ParseError::Cancelled) once
//! it reports cancellation. Nothing is preempted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub trait Monitor {
    fn is_cancelled(&self) -> bool;
}

impl Monitor for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// A cloneable cancellation handle; every clone observes the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl Monitor for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Cancels once a wall-clock deadline has passed.
#[derive(Clone, Copy, Debug)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }
}

impl Monitor for Deadline {
    fn is_cancelled(&self) -> bool {
        Instant::now() >= self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let seen_by_engine = flag.clone();
        assert!(!seen_by_engine.is_cancelled());
        flag.cancel();
        assert!(seen_by_engine.is_cancelled());
    }

    #[test]
    fn elapsed_deadline_cancels() {
        assert!(Deadline::at(Instant::now()).is_cancelled());
        assert!(!Deadline::after(Duration::from_secs(3600)).is_cancelled());
    }
}

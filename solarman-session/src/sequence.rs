//! Request sequence numbers

use std::sync::atomic::{AtomicU16, Ordering};

/// Issues the sequence number of every outgoing envelope
///
/// The counter increments by one per envelope and wraps at 16 bits, but 0 is
/// never handed out: the increment that would land on 0 yields 1 and leaves
/// the counter at 1.
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    counter: AtomicU16,
}

impl SequenceGenerator {
    /// Create a generator whose first number will be 1
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a generator whose next number follows `value`
    pub fn starting_at(value: u16) -> Self {
        Self {
            counter: AtomicU16::new(value),
        }
    }

    /// Take the next sequence number
    pub fn next(&self) -> u16 {
        let step = |current: u16| match current.wrapping_add(1) {
            0 => 1,
            n => n,
        };
        // The closure never returns None, so fetch_update cannot fail
        let previous = match self
            .counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some(step(c)))
        {
            Ok(previous) | Err(previous) => previous,
        };
        step(previous)
    }

    /// Last number handed out, 0 before the first call
    pub fn current(&self) -> u16 {
        self.counter.load(Ordering::Acquire)
    }
}

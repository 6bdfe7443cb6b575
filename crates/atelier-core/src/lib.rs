//! Atelier Core
//!
//! The shared state of the art-generation cycle: a process-wide iteration
//! counter and the vote ledger for the current iteration.
//!
//! # Core Insight
//!
//! The whole system is one counter and one map. Every HTTP request reads or
//! writes them while a background cycle advances the counter, so both are
//! owned objects with their guard on the inside - there is no way to touch
//! the underlying state without going through the method contract.
//!
//! # Concurrency
//!
//! - [`IterationCounter`] uses a reader/writer lock: concurrent reads
//!   proceed in parallel, an advance is exclusive.
//! - [`VoteLedger`] uses a single mutex, and the duplicate-vote check runs
//!   in the same critical section as the recording, so two concurrent first
//!   votes by the same address cannot both land.
//!
//! Neither type performs I/O or suspends while holding its lock.

mod counter;
mod error;
mod ledger;

pub use counter::IterationCounter;
pub use error::{Error, Result};
pub use ledger::{ImageId, VoteLedger};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_and_ledger_are_independent() {
        let counter = IterationCounter::new(0);
        let ledger = VoteLedger::new();

        counter.advance();
        ledger.record_votes("u1", &[ImageId(1)]).unwrap();
        counter.advance();

        // Advancing the counter says nothing about the ledger.
        assert_eq!(counter.get(), 2);
        assert!(ledger.has_voted("u1"));
    }
}

//! Fan-out orchestration: run every slot concurrently, substitute
//! fallbacks, and cut off whatever is still pending at the wait budget.
//!
//! Provider errors never escape this module. They are logged and kept
//! on [`SlotOutcome::failures`].

pub mod fanout;
pub mod slot;

pub use fanout::FanOut;
pub use slot::{Slot, SlotFailure, SlotOutcome};

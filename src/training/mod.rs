//! Training orchestration.

mod orchestrator;
pub mod poll;

pub use orchestrator::*;
pub use poll::{PollPolicy, Polled};

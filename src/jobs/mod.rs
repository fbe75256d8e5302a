//! Job execution and scheduling
//!
//! This module covers the recurring half of the system:
//! - Schedule parsing and next-run arithmetic
//! - Single-run execution (fetch, extract, clean, download, persist)
//! - The scheduling loop with its worker pool and running set

mod executor;
mod schedule;
mod scheduler;

pub use executor::{Executor, Job, JobOutcome};
pub use schedule::{Clock, ScheduleType, SystemClock};
pub use scheduler::Scheduler;

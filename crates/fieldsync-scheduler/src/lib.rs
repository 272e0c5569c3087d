//! Job scheduling for FieldSync.
//!
//! Many worker processes poll the same jobs table; the claim transaction in
//! [`queue`] guarantees each job is claimed exactly once and that no two
//! jobs of the same project are ever active together. Uses PostgreSQL row
//! locking with SKIP LOCKED, not an application-level lock manager.

pub mod dequeue;
pub mod error;
pub mod queue;
pub mod runner;
pub mod shutdown;

pub use dequeue::{DequeueLoop, POLL_INTERVAL, RunMode};
pub use error::SchedulerError;
pub use queue::{JobQueue, PgJobQueue};
pub use runner::JobRunner;
pub use shutdown::{ShutdownFlag, listen_for_signals};

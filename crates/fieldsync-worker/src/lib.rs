//! Job execution for FieldSync.
//!
//! The scheduler hands a claimed job id to a handler from this crate; the
//! harness in [`run`] owns the queued -> started -> terminal transitions,
//! and the actual work happens inside a per-job-type worker container.

pub mod container;
pub mod handlers;
pub mod run;

pub use container::{ContainerOutcome, ContainerRunner};
pub use handlers::ContainerHandler;
pub use run::{JobRun, JobStep};

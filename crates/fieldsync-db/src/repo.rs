//! Repository traits and implementations.

pub mod job;

pub use job::{JobRecord, JobRepo, PgJobRepo};

//! Job type and status enums.
//!
//! Both are stored as plain text in the database and parsed at the
//! boundaries, so a bad row surfaces as a dispatch error instead of a
//! decoding failure inside the claim transaction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// The kind of background work a job performs.
///
/// Determines which execution handler a claimed job is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Package a project for offline field work.
    Package,
    /// Apply a batch of uploaded deltas to a project.
    DeltaApply,
    /// Reprocess a project file after it changed.
    ProcessProjectfile,
}

impl JobType {
    pub const ALL: [JobType; 3] = [
        JobType::Package,
        JobType::DeltaApply,
        JobType::ProcessProjectfile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Package => "package",
            JobType::DeltaApply => "delta_apply",
            JobType::ProcessProjectfile => "process_projectfile",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "package" => Ok(JobType::Package),
            "delta_apply" => Ok(JobType::DeltaApply),
            "process_projectfile" => Ok(JobType::ProcessProjectfile),
            other => Err(Error::UnknownJobType(other.to_string())),
        }
    }
}

/// Lifecycle state of a job.
///
/// Transitions only move forward: pending -> queued -> started ->
/// finished | failed. The scheduler owns pending -> queued; the worker
/// harness owns everything after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Queued,
    Started,
    Finished,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Queued => "queued",
            JobStatus::Started => "started",
            JobStatus::Finished => "finished",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed)
    }

    /// An active job blocks every other job of the same project.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Started)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Queued)
                | (JobStatus::Queued, JobStatus::Started)
                | (JobStatus::Started, JobStatus::Finished)
                | (JobStatus::Started, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "queued" => Ok(JobStatus::Queued),
            "started" => Ok(JobStatus::Started),
            "finished" => Ok(JobStatus::Finished),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::UnknownJobStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lifecycle_is_forward_only() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Queued));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Started));
        assert!(JobStatus::Started.can_transition_to(JobStatus::Finished));
        assert!(JobStatus::Started.can_transition_to(JobStatus::Failed));

        // No skipping ahead, no going back.
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Started));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Finished));
        assert!(!JobStatus::Finished.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Queued));
    }

    #[test]
    fn test_active_statuses_block_a_project() {
        assert!(JobStatus::Queued.is_active());
        assert!(JobStatus::Started.is_active());
        assert!(!JobStatus::Pending.is_active());
        assert!(!JobStatus::Finished.is_active());
        assert!(!JobStatus::Failed.is_active());
    }

    #[test]
    fn test_type_parses_from_db_text() {
        assert_eq!("package".parse::<JobType>().unwrap(), JobType::Package);
        assert_eq!(
            "delta_apply".parse::<JobType>().unwrap(),
            JobType::DeltaApply
        );
        assert_eq!(
            "process_projectfile".parse::<JobType>().unwrap(),
            JobType::ProcessProjectfile
        );
        assert!("vacuum".parse::<JobType>().is_err());
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            JobStatus::Pending,
            JobStatus::Queued,
            JobStatus::Started,
            JobStatus::Finished,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
    }
}

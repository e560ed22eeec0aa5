use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

/// What the poller does when the status query itself cannot be run.
///
/// - `TreatAsFinished`: the job is considered to have left the queue and its
///   log is inspected right away. This matches how the cluster scripts have
///   always behaved, and conflates a scheduler outage with completion.
/// - `Retry`: the job stays pending in an "unknown" state and is resolved as
///   a failure after `query_retry_attempts` consecutive unanswered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFailurePolicy {
    TreatAsFinished,
    Retry,
}

impl Default for QueryFailurePolicy {
    fn default() -> Self {
        QueryFailurePolicy::TreatAsFinished
    }
}

impl FromStr for QueryFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "treat_as_finished" => Ok(QueryFailurePolicy::TreatAsFinished),
            "retry" => Ok(QueryFailurePolicy::Retry),
            other => Err(format!(
                "invalid query_failure: {other} (expected \"treat_as_finished\" or \"retry\")"
            )),
        }
    }
}

/// A named subdivision of the dataset (a spectral window selection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub name: String,
    /// Data-subset selector handed to the engine, e.g. `0:124~573`.
    pub spw: String,
    /// `<work_dir>/<name>`.
    pub dir: PathBuf,
}

impl Partition {
    pub fn new(name: impl Into<String>, spw: impl Into<String>, work_dir: &Path) -> Self {
        let name = name.into();
        let dir = work_dir.join(&name);
        Self {
            name,
            spw: spw.into(),
            dir,
        }
    }
}

/// Resources requested from the scheduler for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceProfile {
    pub nodes: u32,
    pub ppn: u32,
    /// `HH:MM:SS`.
    pub walltime: String,
    pub queue: String,
}

impl ResourceProfile {
    /// Number of engine processes launched inside the job.
    pub fn engine_procs(&self) -> u32 {
        self.nodes.saturating_mul(self.ppn)
    }
}

/// Why a partition did not succeed in a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The descriptor could not be written; nothing was submitted.
    DescriptorFailed(String),
    /// The scheduler refused the submission script.
    SubmissionRejected(String),
    /// The job left the queue but its log file was not found.
    LogMissing(PathBuf),
    /// The log file mentions "error".
    LogContainsError(PathBuf),
    /// The scheduler never answered a status query for this job.
    StatusUnknown,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::DescriptorFailed(e) => write!(f, "descriptor not written: {e}"),
            FailureReason::SubmissionRejected(e) => write!(f, "submission rejected: {e}"),
            FailureReason::LogMissing(p) => write!(f, "log file {} not found", p.display()),
            FailureReason::LogContainsError(p) => {
                write!(f, "log file {} reports an error", p.display())
            }
            FailureReason::StatusUnknown => write!(f, "job status unknown"),
        }
    }
}

/// Resolution of one (stage, partition) job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failure(FailureReason),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(nodes: u32, ppn: u32) -> ResourceProfile {
        ResourceProfile {
            nodes,
            ppn,
            walltime: "10:00:00".into(),
            queue: "workq".into(),
        }
    }

    #[test]
    fn engine_procs_multiplies_nodes_and_ppn() {
        assert_eq!(profile(2, 6).engine_procs(), 12);
        assert_eq!(profile(u32::MAX, 4).engine_procs(), u32::MAX);
    }
}

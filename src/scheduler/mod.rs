// src/scheduler/mod.rs

//! Batch scheduler abstraction.
//!
//! The pipeline only needs two things from the cluster: hand it a batch
//! script and get a job handle back, and ask whether a handle is still
//! queued. [`SchedulerClient`] captures exactly that so the driver can run
//! against [`pbs::PbsClient`] in production and an in-memory fake in tests.

pub mod pbs;

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use thiserror::Error;

pub use pbs::PbsClient;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opaque job identifier returned by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// The scheduler still lists the job.
    Queued,
    /// The status command exited non-zero: the job is no longer listed.
    /// This is also what a scheduler that refuses to answer looks like.
    NotListed,
    /// The status command could not be run at all.
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("submit command exited with {code:?}: {stderr}")]
    Rejected { code: Option<i32>, stderr: String },

    #[error("submit command printed no job id")]
    EmptyHandle,

    #[error("failed to run submit command: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Trait abstracting the batch scheduler.
pub trait SchedulerClient: Send + Sync {
    /// Submit a batch script; no retries.
    fn submit<'a>(&'a self, script: &'a Path) -> BoxFuture<'a, Result<JobHandle, SubmitError>>;

    /// Ask whether `handle` is still known to the scheduler.
    fn query<'a>(&'a self, handle: &'a JobHandle) -> BoxFuture<'a, JobStatus>;
}

// src/engine/events.rs

//! Domain events and the sink they are reported to.
//!
//! Every pipeline component receives an `&dyn EventSink` instead of reaching
//! for a global logger. Production code uses [`TracingSink`], which turns
//! events into structured `tracing` records; tests plug in a recording sink
//! and assert on what happened.

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::scheduler::JobHandle;
use crate::types::JobOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    DirCreated {
        path: PathBuf,
    },
    DirExists {
        path: PathBuf,
    },
    DirFailed {
        path: PathBuf,
        error: String,
    },
    StepStarted {
        step: String,
        partitions: usize,
    },
    DescriptorFailed {
        stage: String,
        partition: String,
        error: String,
    },
    JobSubmitted {
        stage: String,
        partition: String,
        handle: JobHandle,
    },
    SubmissionFailed {
        stage: String,
        partition: String,
        error: String,
    },
    QueryUnavailable {
        stage: String,
        partition: String,
        handle: JobHandle,
        attempt: u32,
        reason: String,
    },
    JobResolved {
        stage: String,
        partition: String,
        handle: JobHandle,
        outcome: JobOutcome,
    },
    StageGated {
        stage: String,
        passed: bool,
        failed: Vec<String>,
    },
    FileRemoved {
        path: PathBuf,
    },
    CleanupMissing {
        path: PathBuf,
    },
    CleanupFailed {
        path: PathBuf,
        error: String,
    },
}

/// Receiver for [`PipelineEvent`]s.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Sink that logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::DirCreated { path } => {
                info!(path = %path.display(), "directory created");
            }
            PipelineEvent::DirExists { path } => {
                warn!(path = %path.display(), "directory already exists");
            }
            PipelineEvent::DirFailed { path, error } => {
                error!(path = %path.display(), %error, "could not create directory");
            }
            PipelineEvent::StepStarted { step, partitions } => {
                info!(%step, partitions, "starting step");
            }
            PipelineEvent::DescriptorFailed {
                stage,
                partition,
                error,
            } => {
                error!(%stage, %partition, %error, "could not write job descriptor");
            }
            PipelineEvent::JobSubmitted {
                stage,
                partition,
                handle,
            } => {
                info!(%stage, %partition, job = %handle, "job submitted");
            }
            PipelineEvent::SubmissionFailed {
                stage,
                partition,
                error,
            } => {
                error!(%stage, %partition, %error, "job submission failed");
            }
            PipelineEvent::QueryUnavailable {
                stage,
                partition,
                handle,
                attempt,
                reason,
            } => {
                warn!(
                    %stage,
                    %partition,
                    job = %handle,
                    attempt,
                    %reason,
                    "status query could not be run"
                );
            }
            PipelineEvent::JobResolved {
                stage,
                partition,
                handle,
                outcome,
            } => match outcome {
                JobOutcome::Success => {
                    info!(%stage, %partition, job = %handle, "job completed successfully");
                }
                JobOutcome::Failure(reason) => {
                    error!(%stage, %partition, job = %handle, %reason, "job failed");
                }
            },
            PipelineEvent::StageGated {
                stage,
                passed,
                failed,
            } => {
                if passed {
                    info!(%stage, "all partitions succeeded");
                } else {
                    error!(%stage, failed = %failed.join(", "), "stage failed");
                }
            }
            PipelineEvent::FileRemoved { path } => {
                info!(path = %path.display(), "deleted");
            }
            PipelineEvent::CleanupMissing { path } => {
                warn!(path = %path.display(), "not found for deletion");
            }
            PipelineEvent::CleanupFailed { path, error } => {
                error!(path = %path.display(), %error, "error during cleanup");
            }
        }
    }
}

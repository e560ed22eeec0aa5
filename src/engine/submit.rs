// src/engine/submit.rs

//! Turning descriptors into job handles.

use crate::descriptor::JobDescriptor;
use crate::engine::events::{EventSink, PipelineEvent};
use crate::scheduler::{JobHandle, SchedulerClient};
use crate::types::FailureReason;

/// A submitted job waiting to leave the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJob {
    pub handle: JobHandle,
    pub partition: String,
}

/// Everything the poller and gate need to know about one stage's submissions.
#[derive(Debug, Clone, Default)]
pub struct SubmittedStage {
    pub stage: String,
    pub pending: Vec<PendingJob>,
    /// Partitions that never got a handle, with the reason. They stay in the
    /// stage's failure set.
    pub unsubmitted: Vec<(String, FailureReason)>,
}

impl SubmittedStage {
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            ..Self::default()
        }
    }
}

/// Submit one descriptor. Returns the handle (if any) alongside the
/// partition so the caller can account for it either way.
pub async fn submit_job(
    scheduler: &dyn SchedulerClient,
    sink: &dyn EventSink,
    descriptor: &JobDescriptor,
) -> (Result<JobHandle, FailureReason>, String) {
    let partition = descriptor.partition.clone();
    match scheduler.submit(&descriptor.submission_path).await {
        Ok(handle) => {
            sink.emit(PipelineEvent::JobSubmitted {
                stage: descriptor.stage.clone(),
                partition: partition.clone(),
                handle: handle.clone(),
            });
            (Ok(handle), partition)
        }
        Err(e) => {
            sink.emit(PipelineEvent::SubmissionFailed {
                stage: descriptor.stage.clone(),
                partition: partition.clone(),
                error: e.to_string(),
            });
            (Err(FailureReason::SubmissionRejected(e.to_string())), partition)
        }
    }
}

/// Submit every descriptor of a stage, in order, into `stage`.
pub async fn submit_stage(
    scheduler: &dyn SchedulerClient,
    sink: &dyn EventSink,
    descriptors: &[JobDescriptor],
    stage: &mut SubmittedStage,
) {
    for descriptor in descriptors {
        let (result, partition) = submit_job(scheduler, sink, descriptor).await;
        match result {
            Ok(handle) => stage.pending.push(PendingJob { handle, partition }),
            Err(reason) => stage.unsubmitted.push((partition, reason)),
        }
    }
}

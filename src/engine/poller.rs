// src/engine/poller.rs

//! Completion poller.
//!
//! Owns the pending `(handle, partition)` entries of one stage and sweeps
//! them with status queries until every entry has been resolved. A job that
//! has left the queue is judged by its log file alone:
//!
//! - log present, no case-insensitive `"error"` anywhere in it → success
//! - log present and mentions `"error"` → failure
//! - log absent → failure ("not found")
//!
//! This is a textual heuristic. An informational line that merely contains
//! the word counts as a failure, and an engine that dies without printing it
//! counts as a success.
//!
//! The loop sleeps the whole control flow between sweeps and has no per-job
//! timeout: a job the scheduler keeps listing forever stalls the pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::descriptor;
use crate::engine::events::{EventSink, PipelineEvent};
use crate::engine::submit::PendingJob;
use crate::fs::FileSystem;
use crate::scheduler::{JobStatus, SchedulerClient};
use crate::types::{FailureReason, JobOutcome, Partition, QueryFailurePolicy};

/// Text whose presence in a log marks the job failed.
pub const FAILURE_MARKER: &str = "error";

#[derive(Debug, Clone)]
pub struct PollerOptions {
    pub interval: Duration,
    /// Logs are looked up under `<base_output_dir>/<partition>/`.
    pub base_output_dir: PathBuf,
    pub query_failure: QueryFailurePolicy,
    /// Consecutive unavailable answers tolerated under `Retry`.
    pub query_retry_attempts: u32,
}

/// Result of polling one stage to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub all_successful: bool,
    /// Failed partitions, in the order they were resolved.
    pub failed: Vec<String>,
    /// Every resolved entry, in resolution order.
    pub outcomes: Vec<(String, JobOutcome)>,
}

impl PollReport {
    fn record(&mut self, partition: String, outcome: JobOutcome) {
        if !outcome.is_success() {
            self.failed.push(partition.clone());
        }
        self.outcomes.push((partition, outcome));
        self.all_successful = self.failed.is_empty();
    }
}

#[derive(Debug)]
struct Tracked {
    job: PendingJob,
    /// Consecutive `Unavailable` answers.
    unavailable: u32,
}

pub struct CompletionPoller<'a> {
    scheduler: &'a dyn SchedulerClient,
    fs: &'a dyn FileSystem,
    sink: &'a dyn EventSink,
    options: &'a PollerOptions,
}

impl<'a> CompletionPoller<'a> {
    pub fn new(
        scheduler: &'a dyn SchedulerClient,
        fs: &'a dyn FileSystem,
        sink: &'a dyn EventSink,
        options: &'a PollerOptions,
    ) -> Self {
        Self {
            scheduler,
            fs,
            sink,
            options,
        }
    }

    /// Poll `pending` (all belonging to `stage`) until every entry is resolved.
    ///
    /// `partitions` is used to locate each partition's submission script.
    pub async fn wait(
        &self,
        stage: &str,
        partitions: &[Partition],
        pending: Vec<PendingJob>,
    ) -> PollReport {
        let mut report = PollReport {
            all_successful: true,
            ..PollReport::default()
        };
        let mut pending: Vec<Tracked> = pending
            .into_iter()
            .map(|job| Tracked {
                job,
                unavailable: 0,
            })
            .collect();

        while !pending.is_empty() {
            tokio::time::sleep(self.options.interval).await;
            debug!(stage, pending = pending.len(), "status sweep");

            let mut still_pending = Vec::with_capacity(pending.len());
            for mut entry in pending {
                match self.scheduler.query(&entry.job.handle).await {
                    JobStatus::Queued => {
                        entry.unavailable = 0;
                        still_pending.push(entry);
                    }
                    JobStatus::NotListed => {
                        let outcome = self.inspect(stage, partitions, &entry.job);
                        self.resolve(stage, entry.job, outcome, &mut report);
                    }
                    JobStatus::Unavailable(reason) => {
                        entry.unavailable += 1;
                        self.sink.emit(PipelineEvent::QueryUnavailable {
                            stage: stage.to_string(),
                            partition: entry.job.partition.clone(),
                            handle: entry.job.handle.clone(),
                            attempt: entry.unavailable,
                            reason,
                        });

                        match self.options.query_failure {
                            QueryFailurePolicy::TreatAsFinished => {
                                let outcome = self.inspect(stage, partitions, &entry.job);
                                self.resolve(stage, entry.job, outcome, &mut report);
                            }
                            QueryFailurePolicy::Retry => {
                                if entry.unavailable >= self.options.query_retry_attempts {
                                    let outcome = JobOutcome::Failure(FailureReason::StatusUnknown);
                                    self.resolve(stage, entry.job, outcome, &mut report);
                                } else {
                                    still_pending.push(entry);
                                }
                            }
                        }
                    }
                }
            }
            pending = still_pending;
        }

        report
    }

    fn resolve(&self, stage: &str, job: PendingJob, outcome: JobOutcome, report: &mut PollReport) {
        self.sink.emit(PipelineEvent::JobResolved {
            stage: stage.to_string(),
            partition: job.partition.clone(),
            handle: job.handle,
            outcome: outcome.clone(),
        });
        report.record(job.partition, outcome);
    }

    /// Locate and classify the log of a job that has left the queue.
    fn inspect(&self, stage: &str, partitions: &[Partition], job: &PendingJob) -> JobOutcome {
        let declared = partitions
            .iter()
            .find(|p| p.name == job.partition)
            .and_then(|p| {
                descriptor::read_declared_log_path(
                    self.fs,
                    &descriptor::submission_script_path(p, stage),
                )
            });

        let log = resolve_log_path(
            &self.options.base_output_dir,
            stage,
            &job.partition,
            declared.as_deref(),
        );
        debug!(stage, partition = %job.partition, log = %log.display(), "checking log");
        classify_log(self.fs, &log)
    }
}

/// `<base_output_dir>/<partition>/<basename of declared path>`, falling back
/// to `<stage>_<partition>.log` when the script declares nothing.
pub fn resolve_log_path(
    base_output_dir: &Path,
    stage: &str,
    partition: &str,
    declared: Option<&str>,
) -> PathBuf {
    let file_name = declared
        .and_then(|d| Path::new(d).file_name())
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| descriptor::log_file_name(stage, partition).into());
    base_output_dir.join(partition).join(file_name)
}

/// Classify a job by the content of its log file.
pub fn classify_log(fs: &dyn FileSystem, log: &Path) -> JobOutcome {
    if !fs.exists(log) {
        return JobOutcome::Failure(FailureReason::LogMissing(log.to_path_buf()));
    }
    match fs.read(log) {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            if text.to_lowercase().contains(FAILURE_MARKER) {
                JobOutcome::Failure(FailureReason::LogContainsError(log.to_path_buf()))
            } else {
                JobOutcome::Success
            }
        }
        Err(e) => {
            debug!(log = %log.display(), error = %e, "log exists but cannot be read");
            JobOutcome::Failure(FailureReason::LogMissing(log.to_path_buf()))
        }
    }
}

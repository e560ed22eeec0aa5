// src/scheduler/pbs.rs

//! `qsub` / `qstat` client.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use super::{BoxFuture, JobHandle, JobStatus, SchedulerClient, SubmitError};

/// Scheduler client that shells out to the PBS command-line tools.
///
/// Both commands run with `work_dir` as their working directory, so the
/// relative `#PBS -o` paths in generated scripts resolve below it.
#[derive(Debug, Clone)]
pub struct PbsClient {
    submit_cmd: String,
    status_cmd: String,
    work_dir: PathBuf,
}

impl PbsClient {
    pub fn new(
        submit_cmd: impl Into<String>,
        status_cmd: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            submit_cmd: submit_cmd.into(),
            status_cmd: status_cmd.into(),
            work_dir: work_dir.into(),
        }
    }

    async fn submit_inner(&self, script: &Path) -> Result<JobHandle, SubmitError> {
        let arg = script.strip_prefix(&self.work_dir).unwrap_or(script);
        info!(
            cmd = %self.submit_cmd,
            script = %arg.display(),
            "submitting batch script"
        );

        let output = Command::new(&self.submit_cmd)
            .arg(arg)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(SubmitError::Rejected {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .map(str::trim)
            .find(|id| !id.is_empty())
            .map(JobHandle::new)
            .ok_or(SubmitError::EmptyHandle)
    }

    async fn query_inner(&self, handle: &JobHandle) -> JobStatus {
        let result = Command::new(&self.status_cmd)
            .arg(handle.as_str())
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => JobStatus::Queued,
            Ok(output) => {
                debug!(
                    job = %handle,
                    code = ?output.status.code(),
                    "status command exited non-zero"
                );
                JobStatus::NotListed
            }
            Err(e) => JobStatus::Unavailable(e.to_string()),
        }
    }
}

impl SchedulerClient for PbsClient {
    fn submit<'a>(&'a self, script: &'a Path) -> BoxFuture<'a, Result<JobHandle, SubmitError>> {
        Box::pin(self.submit_inner(script))
    }

    fn query<'a>(&'a self, handle: &'a JobHandle) -> BoxFuture<'a, JobStatus> {
        Box::pin(self.query_inner(handle))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_stdout_line_is_the_handle() {
        let dir = tempfile::tempdir().unwrap();
        let client = PbsClient::new("echo", "true", dir.path());

        let script = dir.path().join("spw0").join("flag_cal_spw0.pbs");
        let handle = client.submit(&script).await.unwrap();

        assert_eq!(handle.as_str(), "spw0/flag_cal_spw0.pbs");
    }

    #[tokio::test]
    async fn nonzero_submit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let client = PbsClient::new("false", "true", dir.path());

        let err = client.submit(Path::new("x.pbs")).await.unwrap_err();
        assert!(matches!(err, SubmitError::Rejected { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn silent_submit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = PbsClient::new("true", "true", dir.path());

        let err = client.submit(Path::new("x.pbs")).await.unwrap_err();
        assert!(matches!(err, SubmitError::EmptyHandle), "got {err:?}");
    }

    #[tokio::test]
    async fn missing_submit_command_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = PbsClient::new("pbspipe-no-such-qsub", "true", dir.path());

        let err = client.submit(Path::new("x.pbs")).await.unwrap_err();
        assert!(matches!(err, SubmitError::Spawn(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn query_maps_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let handle = JobHandle::new("123.server");

        let queued = PbsClient::new("true", "true", dir.path());
        assert_eq!(queued.query(&handle).await, JobStatus::Queued);

        let gone = PbsClient::new("true", "false", dir.path());
        assert_eq!(gone.query(&handle).await, JobStatus::NotListed);

        let broken = PbsClient::new("true", "pbspipe-no-such-qstat", dir.path());
        assert!(matches!(
            broken.query(&handle).await,
            JobStatus::Unavailable(_)
        ));
    }
}

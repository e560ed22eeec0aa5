use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pbspipe::descriptor;
use pbspipe::fs::FileSystem;
use pbspipe::fs::mock::MockFileSystem;
use pbspipe::scheduler::{BoxFuture, JobHandle, JobStatus, SchedulerClient, SubmitError};
use tracing::debug;

type Key = (String, String);

fn key(stage: &str, partition: &str) -> Key {
    (stage.to_string(), partition.to_string())
}

#[derive(Debug)]
struct FakeJob {
    stage: String,
    partition: String,
    queued_left: u32,
    unavailable_left: u32,
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: u64,
    rejected: HashSet<Key>,
    logs: HashMap<Key, String>,
    skip_log: HashSet<Key>,
    queued_polls: u32,
    unavailable: HashMap<Key, u32>,
    jobs: HashMap<JobHandle, FakeJob>,
    submitted: Vec<Key>,
    queries: usize,
}

/// In-memory scheduler:
/// - accepts any batch script the mock filesystem holds (unless told to
///   reject it) and hands out `<n>.fake` handles
/// - writes the job log into the mock filesystem at submission time, under
///   `<log_dir>/<partition>/<stage>_<partition>.log`
/// - keeps each job `Queued` for a configurable number of queries, then
///   reports it `NotListed`
pub struct FakeScheduler {
    fs: MockFileSystem,
    log_dir: PathBuf,
    state: Mutex<FakeState>,
}

impl FakeScheduler {
    pub fn new(fs: MockFileSystem, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            log_dir: log_dir.into(),
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Reject the submission of `stage` for `partition`.
    pub fn reject(self, stage: &str, partition: &str) -> Self {
        self.state.lock().unwrap().rejected.insert(key(stage, partition));
        self
    }

    /// Use `text` as the job log instead of a clean one.
    pub fn log_content(self, stage: &str, partition: &str, text: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .logs
            .insert(key(stage, partition), text.to_string());
        self
    }

    /// Let the job finish without leaving a log behind.
    pub fn skip_log(self, stage: &str, partition: &str) -> Self {
        self.state.lock().unwrap().skip_log.insert(key(stage, partition));
        self
    }

    /// Number of status queries every job answers `Queued` before leaving.
    pub fn queued_polls(self, n: u32) -> Self {
        self.state.lock().unwrap().queued_polls = n;
        self
    }

    /// Make the status command unavailable `n` times for this job
    /// (`u32::MAX` for a permanent outage).
    pub fn unavailable(self, stage: &str, partition: &str, n: u32) -> Self {
        self.state
            .lock()
            .unwrap()
            .unavailable
            .insert(key(stage, partition), n);
        self
    }

    /// `(stage, partition)` of every accepted submission, in order.
    pub fn submitted(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().submitted.clone()
    }

    /// Stages that had at least one accepted submission, in first-seen order.
    pub fn submitted_stages(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for (stage, _) in self.submitted() {
            if !seen.contains(&stage) {
                seen.push(stage);
            }
        }
        seen
    }

    pub fn query_count(&self) -> usize {
        self.state.lock().unwrap().queries
    }

    fn submit_now(&self, script: &Path) -> Result<JobHandle, SubmitError> {
        let (stage, partition) = parse_script_path(script).ok_or_else(|| SubmitError::Rejected {
            code: Some(2),
            stderr: format!("qsub: unrecognised script {}", script.display()),
        })?;

        if !self.fs.exists(script) {
            return Err(SubmitError::Rejected {
                code: Some(2),
                stderr: format!("qsub: script file cannot be loaded - {}", script.display()),
            });
        }

        let mut state = self.state.lock().unwrap();
        let k = key(&stage, &partition);
        if state.rejected.contains(&k) {
            return Err(SubmitError::Rejected {
                code: Some(190),
                stderr: "qsub: Unknown queue".to_string(),
            });
        }

        if !state.skip_log.contains(&k) {
            let text = state
                .logs
                .get(&k)
                .cloned()
                .unwrap_or_else(|| format!("{stage} finished for {partition}\n"));
            let log = self
                .log_dir
                .join(&partition)
                .join(descriptor::log_file_name(&stage, &partition));
            self.fs.add_file(log, text);
        }

        state.next_id += 1;
        let handle = JobHandle::new(format!("{}.fake", state.next_id));
        let job = FakeJob {
            stage: stage.clone(),
            partition: partition.clone(),
            queued_left: state.queued_polls,
            unavailable_left: state.unavailable.get(&k).copied().unwrap_or(0),
        };
        debug!(%handle, stage = %job.stage, partition = %job.partition, "fake submit");
        state.jobs.insert(handle.clone(), job);
        state.submitted.push(k);
        Ok(handle)
    }

    fn query_now(&self, handle: &JobHandle) -> JobStatus {
        let mut state = self.state.lock().unwrap();
        state.queries += 1;
        let Some(job) = state.jobs.get_mut(handle) else {
            return JobStatus::NotListed;
        };
        if job.unavailable_left > 0 {
            if job.unavailable_left != u32::MAX {
                job.unavailable_left -= 1;
            }
            return JobStatus::Unavailable("qstat: cannot connect to server".to_string());
        }
        if job.queued_left > 0 {
            job.queued_left -= 1;
            return JobStatus::Queued;
        }
        JobStatus::NotListed
    }
}

impl SchedulerClient for FakeScheduler {
    fn submit<'a>(&'a self, script: &'a Path) -> BoxFuture<'a, Result<JobHandle, SubmitError>> {
        Box::pin(async move { self.submit_now(script) })
    }

    fn query<'a>(&'a self, handle: &'a JobHandle) -> BoxFuture<'a, JobStatus> {
        Box::pin(async move { self.query_now(handle) })
    }
}

/// `<dir>/<partition>/<stage>_<partition>.pbs` → `(stage, partition)`.
fn parse_script_path(script: &Path) -> Option<(String, String)> {
    let partition = script.parent()?.file_name()?.to_str()?;
    let stem = script.file_stem()?.to_str()?;
    let stage = stem.strip_suffix(&format!("_{partition}"))?;
    Some((stage.to_string(), partition.to_string()))
}

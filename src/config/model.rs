// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{Partition, QueryFailurePolicy, ResourceProfile};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [pipeline]
/// ms_name = "rcs.ms"
/// engine_dir = "/opt/casa-6.6.4"
/// poll_interval = "60s"
///
/// [fields]
/// amp_cal = "3C286"
/// phase_cal = "1634+627"
/// source = "RXCS"
///
/// [[partition]]
/// name = "spw0"
/// spw = "0:124~573"
///
/// [resources.mstransform]
/// ppn = 1
/// walltime = "02:00:00"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub pipeline: PipelineSection,

    pub fields: FieldsSection,

    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// Ordered list of partitions from `[[partition]]`.
    #[serde(default)]
    pub partition: Vec<PartitionConfig>,

    /// `[resources.default]` and `[resources.<stage>]` overrides.
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceSection>,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// Input measurement set, relative to `work_dir` or absolute.
    pub ms_name: String,

    /// Engine installation root; the engine binary is `<engine_dir>/bin/casa`.
    pub engine_dir: String,

    /// Directory the jobs run in; partitions live directly below it.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Where job logs are looked up. Defaults to `work_dir`.
    #[serde(default)]
    pub base_output_dir: Option<PathBuf>,

    /// Delay between two status sweeps (`ms`, `s`, `m` or `h` suffix).
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    #[serde(default)]
    pub query_failure: QueryFailurePolicy,

    /// Consecutive failed status queries tolerated under `query_failure = "retry"`.
    #[serde(default = "default_query_retry_attempts")]
    pub query_retry_attempts: u32,

    /// Shell lines run in the job before the engine starts.
    #[serde(default = "default_env_setup")]
    pub env_setup: Vec<String>,

    /// Prefix of the technical log file name.
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_poll_interval() -> String {
    "60s".to_string()
}

fn default_query_retry_attempts() -> u32 {
    3
}

fn default_env_setup() -> Vec<String> {
    vec![
        "source ~/.bashrc".to_string(),
        "micromamba activate 38data".to_string(),
    ]
}

fn default_log_prefix() -> String {
    "pbspipe".to_string()
}

/// `[fields]` section: sky fields and reference antenna used by the recipes.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldsSection {
    /// Flux / bandpass calibrator.
    pub amp_cal: String,
    pub phase_cal: String,
    /// Target source.
    pub source: String,
    #[serde(default = "default_refant")]
    pub refant: String,
}

fn default_refant() -> String {
    "C02".to_string()
}

impl FieldsSection {
    /// Comma-joined calibrator field list, phase calibrator first.
    pub fn calibrators(&self) -> String {
        format!("{},{}", self.phase_cal, self.amp_cal)
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    #[serde(default = "default_submit_cmd")]
    pub submit_cmd: String,
    #[serde(default = "default_status_cmd")]
    pub status_cmd: String,
    #[serde(default = "default_queue")]
    pub queue: String,
}

fn default_submit_cmd() -> String {
    "qsub".to_string()
}

fn default_status_cmd() -> String {
    "qstat".to_string()
}

/// PBS queue used when `[scheduler].queue` is not set.
pub const DEFAULT_QUEUE: &str = "workq";

fn default_queue() -> String {
    DEFAULT_QUEUE.to_string()
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            submit_cmd: default_submit_cmd(),
            status_cmd: default_status_cmd(),
            queue: default_queue(),
        }
    }
}

/// One `[[partition]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PartitionConfig {
    pub name: String,
    /// Spectral window / channel selection, e.g. `0:124~573`.
    pub spw: String,
}

/// `[resources.<name>]` section. Unset keys fall through to
/// `[resources.default]`, then to the stage's built-in profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceSection {
    #[serde(default)]
    pub nodes: Option<u32>,
    #[serde(default)]
    pub ppn: Option<u32>,
    #[serde(default)]
    pub walltime: Option<String>,
}

/// Built-in resource request of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDefaults {
    pub nodes: u32,
    pub ppn: u32,
    pub walltime: &'static str,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// code holding a `ConfigFile` can rely on the checks done there.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub pipeline: PipelineSection,
    pub fields: FieldsSection,
    pub scheduler: SchedulerSection,
    pub partitions: Vec<Partition>,
    pub poll_interval: Duration,
    resources: BTreeMap<String, ResourceSection>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        raw: RawConfigFile,
        partitions: Vec<Partition>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            pipeline: raw.pipeline,
            fields: raw.fields,
            scheduler: raw.scheduler,
            partitions,
            poll_interval,
            resources: raw.resources,
        }
    }

    /// Directory in which job logs are looked up.
    pub fn base_output_dir(&self) -> PathBuf {
        self.pipeline
            .base_output_dir
            .clone()
            .unwrap_or_else(|| self.pipeline.work_dir.clone())
    }

    /// Resolve the resource request for `stage`.
    pub fn resource_profile(&self, stage: &str, defaults: ResourceDefaults) -> ResourceProfile {
        let specific = self.resources.get(stage);
        let global = self.resources.get("default");

        let nodes = specific
            .and_then(|r| r.nodes)
            .or_else(|| global.and_then(|r| r.nodes))
            .unwrap_or(defaults.nodes);
        let ppn = specific
            .and_then(|r| r.ppn)
            .or_else(|| global.and_then(|r| r.ppn))
            .unwrap_or(defaults.ppn);
        let walltime = specific
            .and_then(|r| r.walltime.clone())
            .or_else(|| global.and_then(|r| r.walltime.clone()))
            .unwrap_or_else(|| defaults.walltime.to_string());

        ResourceProfile {
            nodes,
            ppn,
            walltime,
            queue: self.scheduler.queue.clone(),
        }
    }
}

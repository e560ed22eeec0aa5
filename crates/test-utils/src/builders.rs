#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use pbspipe::config::{
    ConfigFile, FieldsSection, PartitionConfig, PipelineSection, RawConfigFile, ResourceSection,
    SchedulerSection,
};
use pbspipe::types::QueryFailurePolicy;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from a small but complete config rooted at `/work` with a 1ms poll
/// interval and no partitions.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                pipeline: PipelineSection {
                    ms_name: "rcs.ms".to_string(),
                    engine_dir: "/opt/casa".to_string(),
                    work_dir: PathBuf::from("/work"),
                    base_output_dir: None,
                    poll_interval: "1ms".to_string(),
                    query_failure: QueryFailurePolicy::TreatAsFinished,
                    query_retry_attempts: 3,
                    env_setup: vec!["source ~/.bashrc".to_string()],
                    log_prefix: "pbspipe".to_string(),
                },
                fields: FieldsSection {
                    amp_cal: "3C286".to_string(),
                    phase_cal: "1634+627".to_string(),
                    source: "RXCS".to_string(),
                    refant: "C02".to_string(),
                },
                scheduler: SchedulerSection::default(),
                partition: Vec::new(),
                resources: BTreeMap::new(),
            },
        }
    }

    /// `spw0`..`spw3`, the usual four-window split.
    pub fn standard() -> Self {
        Self::new()
            .with_partition("spw0", "0:124~573")
            .with_partition("spw1", "1:0~500")
            .with_partition("spw2", "2:0~500")
            .with_partition("spw3", "3:0~400")
    }

    pub fn with_partition(mut self, name: &str, spw: &str) -> Self {
        self.config.partition.push(PartitionConfig {
            name: name.to_string(),
            spw: spw.to_string(),
        });
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pipeline.work_dir = dir.into();
        self
    }

    pub fn base_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pipeline.base_output_dir = Some(dir.into());
        self
    }

    pub fn poll_interval(mut self, interval: &str) -> Self {
        self.config.pipeline.poll_interval = interval.to_string();
        self
    }

    pub fn query_failure(mut self, policy: QueryFailurePolicy, attempts: u32) -> Self {
        self.config.pipeline.query_failure = policy;
        self.config.pipeline.query_retry_attempts = attempts;
        self
    }

    pub fn resources(mut self, name: &str, section: ResourceSection) -> Self {
        self.config.resources.insert(name.to_string(), section);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> anyhow::Result<ConfigFile> {
        Ok(ConfigFile::try_from(self.config)?)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

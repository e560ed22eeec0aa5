// src/descriptor/mod.rs

//! Job descriptor generation.
//!
//! A descriptor is the pair of files the cluster needs to run one stage for
//! one partition:
//!
//! - `<partition>/run_<stage>_<partition>.py`, the engine script, and
//! - `<partition>/<stage>_<partition>.pbs`, the batch script that requests
//!   resources and points the merged job output at
//!   `<partition>/<stage>_<partition>.log`.
//!
//! [`generate`] is pure: the same stage, partition, parameters and resources
//! always yield byte-identical text. [`JobDescriptor::write`] overwrites
//! whatever a previous attempt left behind.

pub mod recipes;
pub mod template;

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::model::{ConfigFile, FieldsSection};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::stages::StageSpec;
use crate::types::{Partition, ResourceProfile};

pub use template::{render, ScriptParams};

/// Pipeline-wide inputs shared by every descriptor.
#[derive(Debug, Clone)]
pub struct PipelineParams {
    pub ms_name: String,
    pub engine_dir: String,
    pub work_dir: PathBuf,
    pub env_setup: Vec<String>,
    pub fields: FieldsSection,
}

impl PipelineParams {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            ms_name: cfg.pipeline.ms_name.clone(),
            engine_dir: cfg.pipeline.engine_dir.clone(),
            work_dir: cfg.pipeline.work_dir.clone(),
            env_setup: cfg.pipeline.env_setup.clone(),
            fields: cfg.fields.clone(),
        }
    }
}

/// Generated scripts for one (stage, partition).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub stage: String,
    pub partition: String,
    pub processing_path: PathBuf,
    pub processing_text: String,
    pub submission_path: PathBuf,
    pub submission_text: String,
    /// Log path as declared in the batch script, relative to the work dir.
    pub log_path: String,
    pub resources: ResourceProfile,
}

impl JobDescriptor {
    /// Write both scripts, replacing earlier versions.
    pub fn write(&self, fs: &dyn FileSystem) -> anyhow::Result<()> {
        fs.write(&self.processing_path, self.processing_text.as_bytes())
            .with_context(|| format!("writing processing script for {}", self.partition))?;
        fs.write(&self.submission_path, self.submission_text.as_bytes())
            .with_context(|| format!("writing submission script for {}", self.partition))?;
        Ok(())
    }
}

pub fn processing_script_name(stage: &str, partition: &str) -> String {
    format!("run_{stage}_{partition}.py")
}

pub fn submission_script_name(stage: &str, partition: &str) -> String {
    format!("{stage}_{partition}.pbs")
}

pub fn log_file_name(stage: &str, partition: &str) -> String {
    format!("{stage}_{partition}.log")
}

/// `<partition>/<stage>_<partition>.log`
pub fn declared_log_path(stage: &str, partition: &str) -> String {
    format!("{partition}/{}", log_file_name(stage, partition))
}

pub fn processing_script_path(partition: &Partition, stage: &str) -> PathBuf {
    partition
        .dir
        .join(processing_script_name(stage, &partition.name))
}

pub fn submission_script_path(partition: &Partition, stage: &str) -> PathBuf {
    partition
        .dir
        .join(submission_script_name(stage, &partition.name))
}

/// Render both scripts for `spec` on `partition`.
pub fn generate(
    spec: &StageSpec,
    partition: &Partition,
    params: &PipelineParams,
    resources: &ResourceProfile,
) -> Result<JobDescriptor> {
    let name = partition.name.as_str();
    let script = format!("{name}/{}", processing_script_name(spec.name, name));
    let log_path = declared_log_path(spec.name, name);

    let script_params = ScriptParams {
        stage: spec.name.to_string(),
        partition: name.to_string(),
        spw: partition.spw.clone(),
        ms_name: params.ms_name.clone(),
        cal_ms: format!("{name}/cal.ms"),
        src_ms: format!("{name}/src.ms"),
        caltable_prefix: format!("{name}/caltables/cal"),
        amp_cal: params.fields.amp_cal.clone(),
        phase_cal: params.fields.phase_cal.clone(),
        calibrators: params.fields.calibrators(),
        source: params.fields.source.clone(),
        refant: params.fields.refant.clone(),
        work_dir: params.work_dir.display().to_string(),
        engine_dir: params.engine_dir.clone(),
        env_setup: params.env_setup.clone(),
        script,
        log_path: log_path.clone(),
        nodes: resources.nodes,
        ppn: resources.ppn,
        walltime: resources.walltime.clone(),
        queue: resources.queue.clone(),
        engine_procs: resources.engine_procs(),
    };

    let processing_text = render(spec.recipe, &script_params)?;
    let submission_text = render(recipes::SUBMISSION, &script_params)?;

    Ok(JobDescriptor {
        stage: spec.name.to_string(),
        partition: name.to_string(),
        processing_path: processing_script_path(partition, spec.name),
        processing_text,
        submission_path: submission_script_path(partition, spec.name),
        submission_text,
        log_path,
        resources: resources.clone(),
    })
}

/// Log path declared by the first `#PBS -o` line of a batch script.
pub fn extract_log_path(submission_text: &str) -> Option<String> {
    submission_text
        .lines()
        .find(|line| line.starts_with("#PBS -o"))
        .and_then(|line| line.split_whitespace().nth(2))
        .map(str::to_string)
}

/// Read a batch script from disk and extract its declared log path.
pub fn read_declared_log_path(fs: &dyn FileSystem, submission_path: &Path) -> Option<String> {
    match fs.read_to_string(submission_path) {
        Ok(text) => extract_log_path(&text),
        Err(e) => {
            tracing::debug!(
                path = %submission_path.display(),
                error = %e,
                "could not read submission script"
            );
            None
        }
    }
}

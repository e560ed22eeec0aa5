// src/engine/driver.rs

//! Pipeline driver.
//!
//! Runs a plan step by step. Each step goes through the same sequence for
//! every stage it contains:
//!
//! 1. generate and write a descriptor per partition
//! 2. submit every descriptor (all stages of a parallel step are submitted
//!    before any of them is polled)
//! 3. poll each stage until its pending set is empty
//! 4. gate each stage
//! 5. if every stage of the step passed, clean up its descriptors
//!
//! A failed gate ends the run with [`PipelineError::StageFailed`] before
//! anything of the next step is generated or submitted.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::model::{ConfigFile, DEFAULT_QUEUE};
use crate::descriptor::{self, JobDescriptor, PipelineParams};
use crate::engine::cleanup::cleanup_stage;
use crate::engine::events::{EventSink, PipelineEvent};
use crate::engine::gate::{gate, step_passed, StageResult};
use crate::engine::poller::{CompletionPoller, PollerOptions};
use crate::engine::submit::{submit_stage, SubmittedStage};
use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::scheduler::SchedulerClient;
use crate::stages::{PlanStep, StageSpec};
use crate::types::{FailureReason, Partition, ResourceProfile};

/// Everything the driver needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub partitions: Vec<Partition>,
    pub params: PipelineParams,
    pub poller: PollerOptions,
    /// Resolved resource request per stage name.
    pub resources: HashMap<String, ResourceProfile>,
}

impl DriverSettings {
    pub fn from_config(cfg: &ConfigFile, plan: &[PlanStep]) -> Self {
        let resources = plan
            .iter()
            .flat_map(|step| step.stages().iter())
            .map(|spec| {
                (
                    spec.name.to_string(),
                    cfg.resource_profile(spec.name, spec.resources),
                )
            })
            .collect();

        Self {
            partitions: cfg.partitions.clone(),
            params: PipelineParams::from_config(cfg),
            poller: PollerOptions {
                interval: cfg.poll_interval,
                base_output_dir: cfg.base_output_dir(),
                query_failure: cfg.pipeline.query_failure,
                query_retry_attempts: cfg.pipeline.query_retry_attempts,
            },
            resources,
        }
    }

    fn resources_for(&self, spec: &StageSpec) -> ResourceProfile {
        self.resources.get(spec.name).cloned().unwrap_or_else(|| ResourceProfile {
            nodes: spec.resources.nodes,
            ppn: spec.resources.ppn,
            walltime: spec.resources.walltime.to_string(),
            queue: DEFAULT_QUEUE.to_string(),
        })
    }
}

pub struct PipelineDriver<'a> {
    scheduler: &'a dyn SchedulerClient,
    fs: &'a dyn FileSystem,
    sink: &'a dyn EventSink,
    settings: DriverSettings,
}

impl<'a> PipelineDriver<'a> {
    pub fn new(
        scheduler: &'a dyn SchedulerClient,
        fs: &'a dyn FileSystem,
        sink: &'a dyn EventSink,
        settings: DriverSettings,
    ) -> Self {
        Self {
            scheduler,
            fs,
            sink,
            settings,
        }
    }

    /// Run every step of `plan`, stopping at the first failed gate.
    ///
    /// Returns the stage results of all steps on success.
    pub async fn run(&self, plan: &[PlanStep]) -> Result<Vec<StageResult>> {
        let mut all = Vec::new();
        for step in plan {
            let results = self.run_step(step).await;
            if !step_passed(&results) {
                return Err(step_failure(step, &results));
            }
            info!(step = %step.label(), "step passed; proceeding");
            all.extend(results);
        }
        info!("all steps completed successfully");
        Ok(all)
    }

    /// Run one step through generate → submit → poll → gate → cleanup.
    pub async fn run_step(&self, step: &PlanStep) -> Vec<StageResult> {
        let partitions = &self.settings.partitions;
        self.sink.emit(PipelineEvent::StepStarted {
            step: step.label(),
            partitions: partitions.len(),
        });

        let mut submitted = Vec::with_capacity(step.stages().len());
        for spec in step.stages() {
            let (descriptors, mut stage) = self.prepare_stage(spec);
            submit_stage(self.scheduler, self.sink, &descriptors, &mut stage).await;
            submitted.push(stage);
        }

        let poller = CompletionPoller::new(
            self.scheduler,
            self.fs,
            self.sink,
            &self.settings.poller,
        );
        let mut results = Vec::with_capacity(submitted.len());
        for stage in submitted {
            let report = poller.wait(&stage.stage, partitions, stage.pending).await;
            let result = gate(&stage.stage, partitions, &stage.unsubmitted, &report);
            self.sink.emit(PipelineEvent::StageGated {
                stage: result.stage.clone(),
                passed: result.success,
                failed: result.failed.clone(),
            });
            results.push(result);
        }

        if step_passed(&results) {
            for spec in step.stages() {
                cleanup_stage(self.fs, self.sink, partitions, spec.name);
            }
        } else {
            debug!(step = %step.label(), "step failed; keeping descriptors on disk");
        }

        results
    }

    /// Generate descriptors for every partition without touching disk.
    pub fn describe(&self, spec: &StageSpec) -> Result<Vec<JobDescriptor>> {
        let resources = self.settings.resources_for(spec);
        self.settings
            .partitions
            .iter()
            .map(|p| descriptor::generate(spec, p, &self.settings.params, &resources))
            .collect()
    }

    /// Generate and write descriptors; partitions whose descriptor could not
    /// be produced go straight to the stage's unsubmitted list.
    fn prepare_stage(&self, spec: &StageSpec) -> (Vec<JobDescriptor>, SubmittedStage) {
        let resources = self.settings.resources_for(spec);
        let mut stage = SubmittedStage::new(spec.name);
        let mut descriptors = Vec::with_capacity(self.settings.partitions.len());

        for partition in &self.settings.partitions {
            let written = descriptor::generate(spec, partition, &self.settings.params, &resources)
                .map_err(|e| e.to_string())
                .and_then(|d| d.write(self.fs).map(|()| d).map_err(|e| format!("{e:#}")));

            match written {
                Ok(d) => descriptors.push(d),
                Err(error) => {
                    self.sink.emit(PipelineEvent::DescriptorFailed {
                        stage: spec.name.to_string(),
                        partition: partition.name.clone(),
                        error: error.clone(),
                    });
                    stage
                        .unsubmitted
                        .push((partition.name.clone(), FailureReason::DescriptorFailed(error)));
                }
            }
        }

        (descriptors, stage)
    }
}

fn step_failure(step: &PlanStep, results: &[StageResult]) -> PipelineError {
    let qualify = step.stages().len() > 1;
    let failed = results
        .iter()
        .flat_map(|r| {
            r.failed.iter().map(move |p| {
                if qualify {
                    format!("{}:{}", r.stage, p)
                } else {
                    p.clone()
                }
            })
        })
        .collect();

    PipelineError::StageFailed {
        stage: step.label(),
        failed,
    }
}

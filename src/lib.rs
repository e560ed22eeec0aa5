// src/lib.rs

pub mod cli;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod scheduler;
pub mod stages;
pub mod types;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::model::ConfigFile;
use crate::engine::scaffold::prepare_partition_dirs;
use crate::engine::{DriverSettings, PipelineDriver, StageResult, TracingSink};
use crate::errors::Result;
use crate::fs::RealFileSystem;
use crate::scheduler::pbs::PbsClient;
use crate::stages::{plan_from, standard_plan, PlanStep};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the stage plan (optionally resumed with `--from-stage`)
/// - partition directories
/// - the PBS client and the real filesystem
/// - the driver
pub async fn run(args: &CliArgs, cfg: &ConfigFile) -> Result<Vec<StageResult>> {
    let plan = select_plan(args.from_stage.as_deref())?;
    let settings = DriverSettings::from_config(cfg, &plan);

    let fs = RealFileSystem;
    let sink = TracingSink;
    let scheduler = PbsClient::new(
        cfg.scheduler.submit_cmd.as_str(),
        cfg.scheduler.status_cmd.as_str(),
        cfg.pipeline.work_dir.clone(),
    );
    let driver = PipelineDriver::new(&scheduler, &fs, &sink, settings);

    if args.dry_run {
        print_dry_run(cfg, &plan, &driver)?;
        return Ok(Vec::new());
    }

    info!(
        partitions = cfg.partitions.len(),
        steps = plan.len(),
        work_dir = %cfg.pipeline.work_dir.display(),
        "starting pipeline"
    );
    prepare_partition_dirs(&fs, &sink, &cfg.partitions);
    driver.run(&plan).await
}

/// The standard plan, optionally cut to start at `from_stage`.
pub fn select_plan(from_stage: Option<&str>) -> Result<Vec<PlanStep>> {
    let plan = standard_plan();
    match from_stage {
        Some(stage) => plan_from(plan, stage),
        None => Ok(plan),
    }
}

/// Print the plan, resolved resources and every generated script.
fn print_dry_run(cfg: &ConfigFile, plan: &[PlanStep], driver: &PipelineDriver<'_>) -> Result<()> {
    println!("pbspipe dry-run");
    println!("  ms_name = {}", cfg.pipeline.ms_name);
    println!("  work_dir = {}", cfg.pipeline.work_dir.display());
    println!("  logs under = {}", cfg.base_output_dir().display());
    println!("  poll_interval = {:?}", cfg.poll_interval);
    println!("  query_failure = {:?}", cfg.pipeline.query_failure);
    println!();

    println!("partitions ({}):", cfg.partitions.len());
    for p in &cfg.partitions {
        println!("  - {} (spw {})", p.name, p.spw);
    }
    println!();

    for (i, step) in plan.iter().enumerate() {
        println!("step {}: {}", i + 1, step.label());
        for spec in step.stages() {
            for d in driver.describe(spec)? {
                println!(
                    "  [{}/{}] nodes={} ppn={} walltime={} queue={}",
                    d.stage,
                    d.partition,
                    d.resources.nodes,
                    d.resources.ppn,
                    d.resources.walltime,
                    d.resources.queue
                );
                println!("  --- {}", d.submission_path.display());
                println!("{}", d.submission_text);
                println!("  --- {}", d.processing_path.display());
                println!("{}", d.processing_text);
            }
        }
    }

    debug!("dry-run complete (nothing written or submitted)");
    Ok(())
}

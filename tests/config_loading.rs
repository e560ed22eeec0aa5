// tests/config_loading.rs

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;
use pbspipe::config::load_and_validate;
use pbspipe::descriptor::{self, PipelineParams};
use pbspipe::errors::PipelineError;
use pbspipe::stages;
use pbspipe::types::QueryFailurePolicy;

const MINIMAL: &str = r#"
[pipeline]
ms_name = "rcs.ms"
engine_dir = "/opt/casa-6.6.4"

[fields]
amp_cal = "3C286"
phase_cal = "1634+627"
source = "RXCS"

[[partition]]
name = "spw0"
spw = "0:124~573"

[[partition]]
name = "spw1"
spw = "1:0~500"
"#;

fn config_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{text}").unwrap();
    file
}

fn config_error(text: &str) -> String {
    let file = config_file(text);
    match load_and_validate(file.path()) {
        Err(PipelineError::ConfigError(msg)) => msg,
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn minimal_config_gets_defaults() {
    let file = config_file(MINIMAL);
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.poll_interval, Duration::from_secs(60));
    assert_eq!(cfg.pipeline.query_failure, QueryFailurePolicy::TreatAsFinished);
    assert_eq!(cfg.fields.refant, "C02");
    assert_eq!(cfg.scheduler.submit_cmd, "qsub");
    assert_eq!(cfg.scheduler.status_cmd, "qstat");
    assert!(cfg.pipeline.work_dir.is_absolute());
    assert_eq!(cfg.base_output_dir(), cfg.pipeline.work_dir);

    let names: Vec<&str> = cfg.partitions.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["spw0", "spw1"]);
    assert_eq!(cfg.partitions[0].dir, cfg.pipeline.work_dir.join("spw0"));
}

#[test]
fn default_work_dir_renders_as_absolute_cd() {
    let file = config_file(MINIMAL);
    let cfg = load_and_validate(file.path()).unwrap();
    let resources = cfg.resource_profile(stages::SPLIT.name, stages::SPLIT.resources);

    let d = descriptor::generate(
        &stages::SPLIT,
        &cfg.partitions[0],
        &PipelineParams::from_config(&cfg),
        &resources,
    )
    .unwrap();

    assert!(!d.submission_text.contains("\ncd .\n"));
    let cd = d
        .submission_text
        .lines()
        .find_map(|line| line.strip_prefix("cd "))
        .expect("submission script changes directory");
    assert!(Path::new(cd).is_absolute(), "{cd}");
    assert_eq!(Path::new(cd), cfg.pipeline.work_dir.as_path());
}

#[test]
fn relative_base_output_dir_is_made_absolute() {
    let text = MINIMAL.replace(
        "engine_dir = \"/opt/casa-6.6.4\"",
        "engine_dir = \"/opt/casa-6.6.4\"\nbase_output_dir = \"logs\"",
    );
    let file = config_file(&text);
    let cfg = load_and_validate(file.path()).unwrap();
    assert!(cfg.base_output_dir().is_absolute());
    assert!(cfg.base_output_dir().ends_with("logs"));
}

#[test]
fn resource_overrides_fall_through_in_order() {
    let text = format!(
        "{MINIMAL}\n[scheduler]\nqueue = \"long\"\n\n[resources.default]\nppn = 8\n\n[resources.apply_cal]\nwalltime = \"20:00:00\"\n"
    );
    let file = config_file(&text);
    let cfg = load_and_validate(file.path()).unwrap();

    let apply = cfg.resource_profile("apply_cal", stages::APPLY_CAL.resources);
    assert_eq!(apply.walltime, "20:00:00");
    assert_eq!(apply.ppn, 8);
    assert_eq!(apply.nodes, 1);
    assert_eq!(apply.queue, "long");

    let split = cfg.resource_profile("mstransform", stages::SPLIT.resources);
    assert_eq!(split.ppn, 8);
    assert_eq!(split.walltime, stages::SPLIT.resources.walltime);
}

#[test]
fn retry_policy_is_parsed() {
    let text = MINIMAL.replace(
        "engine_dir = \"/opt/casa-6.6.4\"",
        "engine_dir = \"/opt/casa-6.6.4\"\nquery_failure = \"retry\"\nquery_retry_attempts = 5\npoll_interval = \"2m\"",
    );
    let file = config_file(&text);
    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.pipeline.query_failure, QueryFailurePolicy::Retry);
    assert_eq!(cfg.pipeline.query_retry_attempts, 5);
    assert_eq!(cfg.poll_interval, Duration::from_secs(120));
}

#[test]
fn no_partitions_is_rejected() {
    let text: String = MINIMAL.split("[[partition]]").next().unwrap().to_string();
    assert!(config_error(&text).contains("at least one"));
}

#[test]
fn duplicate_partition_is_rejected() {
    let text = format!("{MINIMAL}\n[[partition]]\nname = \"spw1\"\nspw = \"1:0~10\"\n");
    assert!(config_error(&text).contains("duplicate partition 'spw1'"));
}

#[test]
fn padded_or_relative_partition_names_are_rejected() {
    for bad in [" spw0", "spw0 ", ".", "..", "a/b", ""] {
        let text = MINIMAL.replace("name = \"spw0\"", &format!("name = \"{bad}\""));
        assert!(
            config_error(&text).contains("invalid partition name"),
            "{bad:?} was accepted"
        );
    }
}

#[test]
fn oversized_poll_interval_is_a_config_error() {
    let text = MINIMAL.replace(
        "engine_dir = \"/opt/casa-6.6.4\"",
        "engine_dir = \"/opt/casa-6.6.4\"\npoll_interval = \"6000000000000000h\"",
    );
    assert!(config_error(&text).contains("too large"));
}

#[test]
fn zero_poll_interval_is_rejected() {
    let text = MINIMAL.replace(
        "engine_dir = \"/opt/casa-6.6.4\"",
        "engine_dir = \"/opt/casa-6.6.4\"\npoll_interval = \"0s\"",
    );
    assert!(config_error(&text).contains("poll_interval"));
}

#[test]
fn malformed_walltime_is_rejected() {
    let text = format!("{MINIMAL}\n[resources.flag_cal]\nwalltime = \"10h\"\n");
    assert!(config_error(&text).contains("HH:MM:SS"));
}

#[test]
fn unknown_stage_in_resources_is_rejected() {
    let text = format!("{MINIMAL}\n[resources.selfcal]\nppn = 2\n");
    assert!(config_error(&text).contains("selfcal"));
}

#[test]
fn unknown_query_policy_is_a_toml_error() {
    let text = MINIMAL.replace(
        "engine_dir = \"/opt/casa-6.6.4\"",
        "engine_dir = \"/opt/casa-6.6.4\"\nquery_failure = \"ignore\"",
    );
    let file = config_file(&text);
    assert!(matches!(
        load_and_validate(file.path()),
        Err(PipelineError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("Pipeline.toml"));
    assert!(matches!(result, Err(PipelineError::IoError(_))));
}

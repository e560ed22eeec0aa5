// src/config/validate.rs

use std::collections::HashSet;
use std::time::Duration;

use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipelineError, Result};
use crate::stages::STAGE_NAMES;
use crate::types::Partition;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PipelineError;

    fn try_from(mut raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        // Jobs start in the submitter's home directory, so every path the
        // scripts see must be absolute.
        raw.pipeline.work_dir = std::path::absolute(&raw.pipeline.work_dir)?;
        raw.pipeline.base_output_dir = raw
            .pipeline
            .base_output_dir
            .as_deref()
            .map(std::path::absolute)
            .transpose()?;
        let poll_interval = parse_duration(&raw.pipeline.poll_interval)
            .map_err(|e| PipelineError::ConfigError(format!("[pipeline].poll_interval: {e}")))?;
        let partitions = raw
            .partition
            .iter()
            .map(|p| Partition::new(&p.name, &p.spw, &raw.pipeline.work_dir))
            .collect();
        Ok(ConfigFile::new_unchecked(raw, partitions, poll_interval))
    }
}

/// Run every semantic check on a freshly parsed config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_pipeline(cfg)?;
    validate_partitions(cfg)?;
    validate_resources(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> PipelineError {
    PipelineError::ConfigError(msg.into())
}

fn validate_pipeline(cfg: &RawConfigFile) -> Result<()> {
    let interval = parse_duration(&cfg.pipeline.poll_interval)
        .map_err(|e| config_error(format!("[pipeline].poll_interval: {e}")))?;
    if interval.is_zero() {
        return Err(config_error("[pipeline].poll_interval must be > 0"));
    }

    if cfg.pipeline.query_retry_attempts == 0 {
        return Err(config_error(
            "[pipeline].query_retry_attempts must be >= 1 (got 0)",
        ));
    }

    for (key, value) in [
        ("ms_name", &cfg.pipeline.ms_name),
        ("engine_dir", &cfg.pipeline.engine_dir),
    ] {
        if value.trim().is_empty() {
            return Err(config_error(format!("[pipeline].{key} must not be empty")));
        }
    }

    for (key, value) in [
        ("submit_cmd", &cfg.scheduler.submit_cmd),
        ("status_cmd", &cfg.scheduler.status_cmd),
    ] {
        if value.trim().is_empty() {
            return Err(config_error(format!("[scheduler].{key} must not be empty")));
        }
    }

    Ok(())
}

fn validate_partitions(cfg: &RawConfigFile) -> Result<()> {
    if cfg.partition.is_empty() {
        return Err(config_error(
            "config must contain at least one [[partition]] entry",
        ));
    }

    let mut seen = HashSet::new();
    for p in &cfg.partition {
        let name = p.name.as_str();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains(char::is_whitespace)
        {
            return Err(config_error(format!(
                "invalid partition name '{}': must be a single path component other than . or .., without whitespace",
                p.name
            )));
        }
        if !seen.insert(name) {
            return Err(config_error(format!("duplicate partition '{}'", p.name)));
        }
    }
    Ok(())
}

fn validate_resources(cfg: &RawConfigFile) -> Result<()> {
    let walltime = Regex::new(r"^\d{1,3}:[0-5]\d:[0-5]\d$").map_err(anyhow::Error::from)?;

    for (name, section) in &cfg.resources {
        if name != "default" && !STAGE_NAMES.contains(&name.as_str()) {
            return Err(config_error(format!(
                "[resources.{name}] does not name a stage (expected one of: default, {})",
                STAGE_NAMES.join(", ")
            )));
        }
        if section.nodes == Some(0) || section.ppn == Some(0) {
            return Err(config_error(format!(
                "[resources.{name}]: nodes and ppn must be >= 1"
            )));
        }
        if let Some(ref w) = section.walltime {
            if !walltime.is_match(w) {
                return Err(config_error(format!(
                    "[resources.{name}].walltime '{w}' is not HH:MM:SS"
                )));
            }
        }
    }
    Ok(())
}

/// Parse `"60s"`, `"500ms"`, `"2m"`, `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let seconds_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    value
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}

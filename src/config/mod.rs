// src/config/mod.rs

//! Configuration loading and validation for pbspipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate partitions, timings and resource overrides (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ConfigFile, FieldsSection, PartitionConfig, PipelineSection, RawConfigFile, ResourceSection,
    SchedulerSection,
};
pub use validate::validate_config;

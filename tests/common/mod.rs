#![allow(dead_code)]

pub use pbspipe_test_utils::{
    init_tracing, with_timeout, ConfigFileBuilder, FakeScheduler, RecordingSink,
};

use pbspipe::config::ConfigFile;
use pbspipe::engine::DriverSettings;
use pbspipe::fs::mock::MockFileSystem;
use pbspipe::stages::PlanStep;

/// Four-partition config rooted at `/work`, plus a mock filesystem that
/// already holds the work dir.
pub fn standard_setup() -> (ConfigFile, MockFileSystem) {
    let cfg = ConfigFileBuilder::standard().build();
    let fs = MockFileSystem::new();
    fs.add_dir("/work");
    (cfg, fs)
}

pub fn settings(cfg: &ConfigFile, plan: &[PlanStep]) -> DriverSettings {
    DriverSettings::from_config(cfg, plan)
}

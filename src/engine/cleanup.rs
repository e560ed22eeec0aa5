// src/engine/cleanup.rs

//! Removal of generated descriptors after a stage has passed its gate.
//!
//! Nothing here can fail the pipeline: a missing file is a warning and a
//! failed deletion is reported and skipped.

use std::path::Path;

use crate::descriptor;
use crate::engine::events::{EventSink, PipelineEvent};
use crate::fs::FileSystem;
use crate::types::Partition;

/// Delete both generated scripts of `stage` for one partition.
pub fn cleanup_partition(
    fs: &dyn FileSystem,
    sink: &dyn EventSink,
    partition: &Partition,
    stage: &str,
) {
    remove(fs, sink, &descriptor::processing_script_path(partition, stage));
    remove(fs, sink, &descriptor::submission_script_path(partition, stage));
}

/// Delete the generated scripts of `stage` for every partition.
pub fn cleanup_stage(
    fs: &dyn FileSystem,
    sink: &dyn EventSink,
    partitions: &[Partition],
    stage: &str,
) {
    for partition in partitions {
        cleanup_partition(fs, sink, partition, stage);
    }
}

fn remove(fs: &dyn FileSystem, sink: &dyn EventSink, path: &Path) {
    if !fs.exists(path) {
        sink.emit(PipelineEvent::CleanupMissing {
            path: path.to_path_buf(),
        });
        return;
    }
    match fs.remove_file(path) {
        Ok(()) => sink.emit(PipelineEvent::FileRemoved {
            path: path.to_path_buf(),
        }),
        Err(e) => sink.emit(PipelineEvent::CleanupFailed {
            path: path.to_path_buf(),
            error: format!("{e:#}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<PipelineEvent>>);

    impl EventSink for Recorder {
        fn emit(&self, event: PipelineEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn spw0() -> Partition {
        Partition::new("spw0", "0:124~573", Path::new("/w"))
    }

    #[test]
    fn removes_both_scripts() {
        let fs = MockFileSystem::new();
        fs.add_file("/w/spw0/run_flag_cal_spw0.py", "x");
        fs.add_file("/w/spw0/flag_cal_spw0.pbs", "y");
        fs.add_file("/w/spw0/flag_cal_spw0.log", "done");
        let sink = Recorder::default();

        cleanup_partition(&fs, &sink, &spw0(), "flag_cal");

        assert_eq!(
            fs.files(),
            vec![std::path::PathBuf::from("/w/spw0/flag_cal_spw0.log")]
        );
        let events = sink.0.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| matches!(e, PipelineEvent::FileRemoved { .. })));
    }

    #[test]
    fn missing_file_is_only_a_warning() {
        let fs = MockFileSystem::new();
        fs.add_file("/w/spw0/flag_cal_spw0.pbs", "y");
        let sink = Recorder::default();

        cleanup_partition(&fs, &sink, &spw0(), "flag_cal");

        let events = sink.0.lock().unwrap();
        assert!(matches!(events[0], PipelineEvent::CleanupMissing { .. }));
        assert!(matches!(events[1], PipelineEvent::FileRemoved { .. }));
    }

    #[test]
    fn failed_deletion_does_not_stop_the_rest() {
        let fs = MockFileSystem::new();
        fs.add_file("/w/spw0/run_flag_cal_spw0.py", "x");
        fs.add_file("/w/spw0/flag_cal_spw0.pbs", "y");
        fs.lock_file("/w/spw0/run_flag_cal_spw0.py");
        let sink = Recorder::default();

        cleanup_partition(&fs, &sink, &spw0(), "flag_cal");

        let events = sink.0.lock().unwrap();
        assert!(matches!(events[0], PipelineEvent::CleanupFailed { .. }));
        assert!(matches!(events[1], PipelineEvent::FileRemoved { .. }));
        assert!(!fs.exists(Path::new("/w/spw0/flag_cal_spw0.pbs")));
    }
}

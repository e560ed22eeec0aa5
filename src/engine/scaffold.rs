// src/engine/scaffold.rs

//! Per-partition directory layout.
//!
//! ```text
//! <work_dir>/<partition>/
//!     caltables/
//!     skepticals/
//! ```
//!
//! Existing directories are fine (a rerun finds them in place); any other
//! problem is reported and the pipeline carries on, leaving the failure to
//! surface as a stage failure later.

use crate::engine::events::{EventSink, PipelineEvent};
use crate::fs::{DirStatus, FileSystem};
use crate::types::Partition;

/// Sub-directories created inside every partition directory.
pub const PARTITION_SUBDIRS: [&str; 2] = ["caltables", "skepticals"];

pub fn prepare_partition_dirs(fs: &dyn FileSystem, sink: &dyn EventSink, partitions: &[Partition]) {
    for partition in partitions {
        let mut dirs = vec![partition.dir.clone()];
        dirs.extend(PARTITION_SUBDIRS.iter().map(|sub| partition.dir.join(sub)));

        for path in dirs {
            let event = match fs.create_dir(&path) {
                Ok(DirStatus::Created) => PipelineEvent::DirCreated { path },
                Ok(DirStatus::AlreadyExists) => PipelineEvent::DirExists { path },
                Err(e) => PipelineEvent::DirFailed {
                    path,
                    error: format!("{e:#}"),
                },
            };
            sink.emit(event);
        }
    }
}

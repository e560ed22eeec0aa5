// src/engine/mod.rs

//! Orchestration engine.
//!
//! - [`submit`] turns descriptors into job handles.
//! - [`poller`] waits for a stage's jobs to leave the queue and classifies
//!   them by their logs.
//! - [`gate`] folds per-partition outcomes into a stage verdict.
//! - [`cleanup`] removes descriptors of a stage that passed.
//! - [`scaffold`] lays out the partition directories.
//! - [`driver`] sequences all of the above over the stage plan.
//! - [`events`] is the explicit reporting channel every component writes to.

pub mod cleanup;
pub mod driver;
pub mod events;
pub mod gate;
pub mod poller;
pub mod scaffold;
pub mod submit;

pub use driver::{DriverSettings, PipelineDriver};
pub use events::{EventSink, PipelineEvent, TracingSink};
pub use gate::StageResult;
pub use poller::{CompletionPoller, PollReport, PollerOptions};
pub use submit::{PendingJob, SubmittedStage};

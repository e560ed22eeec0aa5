use std::sync::Mutex;

use pbspipe::engine::{EventSink, PipelineEvent};
use pbspipe::types::JobOutcome;

/// Event sink that keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    /// `(stage, partition, outcome)` of every resolved job, in order.
    pub fn resolved(&self) -> Vec<(String, String, JobOutcome)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::JobResolved {
                    stage,
                    partition,
                    outcome,
                    ..
                } => Some((stage.clone(), partition.clone(), outcome.clone())),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: PipelineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

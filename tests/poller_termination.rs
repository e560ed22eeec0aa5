// tests/poller_termination.rs

mod common;
use crate::common::{settings, ConfigFileBuilder, FakeScheduler, RecordingSink};

use std::collections::BTreeSet;

use pbspipe::engine::PipelineDriver;
use pbspipe::fs::mock::MockFileSystem;
use pbspipe::stages::{self, PlanStep};
use proptest::prelude::*;

fn run_split(partitions: usize, queued_polls: u32, bad: &BTreeSet<usize>) -> (RecordingSink, Vec<String>) {
    let mut builder = ConfigFileBuilder::new();
    for i in 0..partitions {
        builder = builder.with_partition(&format!("spw{i}"), &format!("{i}:0~100"));
    }
    let cfg = builder.build();
    let fs = MockFileSystem::new();
    let mut scheduler = FakeScheduler::new(fs.clone(), "/work").queued_polls(queued_polls);
    for i in bad {
        scheduler = scheduler.log_content("mstransform", &format!("spw{i}"), "Error: bad data");
    }
    let sink = RecordingSink::new();
    let plan = vec![PlanStep::Serial(stages::SPLIT)];

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let failed = rt.block_on(async {
        let driver = PipelineDriver::new(&scheduler, &fs, &sink, settings(&cfg, &plan));
        let results = driver.run_step(&plan[0]).await;
        results[0].failed.clone()
    });
    (sink, failed)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_pending_entry_resolves_exactly_once(
        partitions in 1usize..7,
        queued_polls in 0u32..4,
        bad in proptest::collection::btree_set(0usize..7, 0..3),
    ) {
        let bad: BTreeSet<usize> = bad.into_iter().filter(|i| *i < partitions).collect();
        let (sink, failed) = run_split(partitions, queued_polls, &bad);

        let resolved = sink.resolved();
        prop_assert_eq!(resolved.len(), partitions);
        let names: BTreeSet<String> = resolved.iter().map(|(_, p, _)| p.clone()).collect();
        prop_assert_eq!(names.len(), partitions);

        let expected: Vec<String> = bad.iter().map(|i| format!("spw{i}")).collect();
        prop_assert_eq!(failed, expected);
    }
}

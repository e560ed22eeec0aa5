// src/engine/gate.rs

//! Stage gate: per-partition outcomes in, one go/no-go out.

use crate::engine::poller::PollReport;
use crate::types::{FailureReason, JobOutcome, Partition};

/// Aggregate outcome of one stage over every partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub stage: String,
    /// One entry per partition, in partition order.
    pub outcomes: Vec<(String, JobOutcome)>,
    pub success: bool,
    pub failed: Vec<String>,
}

impl StageResult {
    pub fn outcome(&self, partition: &str) -> Option<&JobOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == partition)
            .map(|(_, outcome)| outcome)
    }
}

/// Combine submission failures and polled outcomes into a [`StageResult`].
///
/// Every partition gets exactly one entry. A partition with neither a
/// submission failure nor a polled outcome is counted as failed.
pub fn gate(
    stage: &str,
    partitions: &[Partition],
    unsubmitted: &[(String, FailureReason)],
    polled: &PollReport,
) -> StageResult {
    let outcomes: Vec<(String, JobOutcome)> = partitions
        .iter()
        .map(|p| {
            let outcome = unsubmitted
                .iter()
                .find(|(name, _)| *name == p.name)
                .map(|(_, reason)| JobOutcome::Failure(reason.clone()))
                .or_else(|| {
                    polled
                        .outcomes
                        .iter()
                        .find(|(name, _)| *name == p.name)
                        .map(|(_, outcome)| outcome.clone())
                })
                .unwrap_or(JobOutcome::Failure(FailureReason::StatusUnknown));
            (p.name.clone(), outcome)
        })
        .collect();

    let failed: Vec<String> = outcomes
        .iter()
        .filter(|(_, outcome)| !outcome.is_success())
        .map(|(name, _)| name.clone())
        .collect();

    StageResult {
        stage: stage.to_string(),
        success: failed.is_empty(),
        failed,
        outcomes,
    }
}

/// A step passes only if every stage in it passed.
pub fn step_passed(results: &[StageResult]) -> bool {
    results.iter().all(|r| r.success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    fn partitions() -> Vec<Partition> {
        ["spw0", "spw1", "spw2", "spw3"]
            .iter()
            .map(|n| Partition::new(*n, "0:0~1", Path::new(".")))
            .collect()
    }

    fn polled(entries: &[(&str, JobOutcome)]) -> PollReport {
        let outcomes: Vec<(String, JobOutcome)> = entries
            .iter()
            .map(|(n, o)| (n.to_string(), o.clone()))
            .collect();
        let failed: Vec<String> = outcomes
            .iter()
            .filter(|(_, o)| !o.is_success())
            .map(|(n, _)| n.clone())
            .collect();
        PollReport {
            all_successful: failed.is_empty(),
            failed,
            outcomes,
        }
    }

    #[test]
    fn all_success_passes() {
        let report = polled(&[
            ("spw3", JobOutcome::Success),
            ("spw0", JobOutcome::Success),
            ("spw2", JobOutcome::Success),
            ("spw1", JobOutcome::Success),
        ]);
        let result = gate("mstransform", &partitions(), &[], &report);
        assert!(result.success);
        assert!(result.failed.is_empty());
        let names: Vec<&str> = result.outcomes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["spw0", "spw1", "spw2", "spw3"]);
    }

    #[test]
    fn unsubmitted_partition_is_counted_failed() {
        let report = polled(&[
            ("spw0", JobOutcome::Success),
            ("spw1", JobOutcome::Success),
            ("spw3", JobOutcome::Success),
        ]);
        let unsubmitted = vec![(
            "spw2".to_string(),
            FailureReason::SubmissionRejected("qsub: bad queue".into()),
        )];
        let result = gate("flag_cal", &partitions(), &unsubmitted, &report);
        assert!(!result.success);
        assert_eq!(result.failed, vec!["spw2"]);
        assert!(matches!(
            result.outcome("spw2"),
            Some(JobOutcome::Failure(FailureReason::SubmissionRejected(_)))
        ));
    }

    #[test]
    fn partition_without_any_outcome_is_not_dropped() {
        let report = polled(&[("spw0", JobOutcome::Success)]);
        let result = gate("apply_cal", &partitions(), &[], &report);
        assert_eq!(result.failed, vec!["spw1", "spw2", "spw3"]);
    }

    #[test]
    fn parallel_step_needs_every_stage() {
        let ok = gate(
            "flag_cal",
            &partitions(),
            &[],
            &polled(&[
                ("spw0", JobOutcome::Success),
                ("spw1", JobOutcome::Success),
                ("spw2", JobOutcome::Success),
                ("spw3", JobOutcome::Success),
            ]),
        );
        let bad = gate(
            "flag_src",
            &partitions(),
            &[],
            &polled(&[
                ("spw0", JobOutcome::Success),
                (
                    "spw1",
                    JobOutcome::Failure(FailureReason::LogMissing(PathBuf::from("x"))),
                ),
                ("spw2", JobOutcome::Success),
                ("spw3", JobOutcome::Success),
            ]),
        );
        assert!(step_passed(std::slice::from_ref(&ok)));
        assert!(!step_passed(&[ok, bad]));
    }
}

// src/stages.rs

//! The fixed stage plan.
//!
//! Each [`StageSpec`] carries what the driver needs to run one stage over
//! every partition: its name (which also names the generated files and the
//! log), the recipe rendered into the processing script, and the built-in
//! resource request. [`PlanStep`] says whether a stage runs alone or is
//! submitted together with its siblings.

use crate::config::model::ResourceDefaults;
use crate::descriptor::recipes;
use crate::errors::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSpec {
    pub name: &'static str,
    pub recipe: &'static str,
    pub resources: ResourceDefaults,
}

impl StageSpec {
    pub const fn new(name: &'static str, recipe: &'static str, resources: ResourceDefaults) -> Self {
        Self {
            name,
            recipe,
            resources,
        }
    }
}

/// One barrier-delimited step of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    Serial(StageSpec),
    /// Sub-stages submitted back to back and polled independently; the step
    /// passes only if every one of them passes.
    Parallel(Vec<StageSpec>),
}

impl PlanStep {
    pub fn stages(&self) -> &[StageSpec] {
        match self {
            PlanStep::Serial(spec) => std::slice::from_ref(spec),
            PlanStep::Parallel(specs) => specs,
        }
    }

    /// Human-readable name, e.g. `flag_cal+flag_src`.
    pub fn label(&self) -> String {
        self.stages()
            .iter()
            .map(|s| s.name)
            .collect::<Vec<_>>()
            .join("+")
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.stages().iter().any(|s| s.name == stage)
    }
}

const LIGHT: ResourceDefaults = ResourceDefaults {
    nodes: 1,
    ppn: 1,
    walltime: "02:00:00",
};

const HEAVY: ResourceDefaults = ResourceDefaults {
    nodes: 1,
    ppn: 6,
    walltime: "10:00:00",
};

pub const SPLIT: StageSpec = StageSpec::new("mstransform", recipes::SPLIT, LIGHT);
pub const FLAG_CAL: StageSpec = StageSpec::new("flag_cal", recipes::FLAG_CAL, HEAVY);
pub const FLAG_SRC: StageSpec = StageSpec::new("flag_src", recipes::FLAG_SRC, HEAVY);
pub const APPLY_CAL: StageSpec = StageSpec::new("apply_cal", recipes::APPLY_CAL, HEAVY);
pub const FLAG_AFTER_CAL: StageSpec =
    StageSpec::new("flag_after_cal", recipes::FLAG_AFTER_CAL, HEAVY);

/// Every stage name, in plan order.
pub const STAGE_NAMES: [&str; 5] = [
    SPLIT.name,
    FLAG_CAL.name,
    FLAG_SRC.name,
    APPLY_CAL.name,
    FLAG_AFTER_CAL.name,
];

/// split → {flag_cal, flag_src} → apply_cal → flag_after_cal
pub fn standard_plan() -> Vec<PlanStep> {
    vec![
        PlanStep::Serial(SPLIT),
        PlanStep::Parallel(vec![FLAG_CAL, FLAG_SRC]),
        PlanStep::Serial(APPLY_CAL),
        PlanStep::Serial(FLAG_AFTER_CAL),
    ]
}

/// Drop every step before the one containing `stage`.
///
/// Resuming inside a parallel group restarts the whole group.
pub fn plan_from(plan: Vec<PlanStep>, stage: &str) -> Result<Vec<PlanStep>> {
    let start = plan
        .iter()
        .position(|step| step.contains(stage))
        .ok_or_else(|| PipelineError::UnknownStage(stage.to_string()))?;
    Ok(plan.into_iter().skip(start).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_plan_order() {
        let labels: Vec<String> = standard_plan().iter().map(PlanStep::label).collect();
        assert_eq!(
            labels,
            vec!["mstransform", "flag_cal+flag_src", "apply_cal", "flag_after_cal"]
        );
    }

    #[test]
    fn plan_from_inside_parallel_group_keeps_group() {
        let plan = plan_from(standard_plan(), "flag_src").unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].label(), "flag_cal+flag_src");
    }

    #[test]
    fn plan_from_unknown_stage() {
        match plan_from(standard_plan(), "imaging") {
            Err(PipelineError::UnknownStage(s)) => assert_eq!(s, "imaging"),
            other => panic!("expected UnknownStage, got {other:?}"),
        }
    }
}
